use crate::maven::version::VersionComparator;
use crate::model::DependencyRecord;
use crate::repository::{Coordinate, RepositoryClient, VulnerabilitySource};
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

pub const DEFAULT_CONCURRENCY: usize = 10;

/// Caller-owned bound on concurrent lookups.
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl TaskScheduler {
    pub fn bounded(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// One lookup at a time.
    pub fn single() -> Self {
        Self::bounded(1)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).acquire_owned().await.ok()
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::bounded(DEFAULT_CONCURRENCY)
    }
}

/// Outcome of one enrichment round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub round: u64,
    pub total: usize,
    /// Records whose state this round wrote.
    pub applied: usize,
    /// Records a newer round took over before this one finished with them.
    pub superseded: usize,
    /// Lookups that failed and were recorded as absent.
    pub failed: usize,
}

enum TaskOutcome {
    Applied { failed: bool },
    Superseded,
}

/// Fills in latest-version and vulnerability state on scanned records.
///
/// Every call starts a new round. Records are claimed by the round when it
/// starts; a round's late results are dropped for any record a newer round
/// has claimed since, so the newest round always wins.
pub struct Enricher {
    versions: Arc<dyn RepositoryClient>,
    vulnerabilities: Option<Arc<dyn VulnerabilitySource>>,
    scheduler: TaskScheduler,
    version_round: AtomicU64,
    vulnerability_round: AtomicU64,
}

impl Enricher {
    pub fn new(versions: Arc<dyn RepositoryClient>, scheduler: TaskScheduler) -> Self {
        Self {
            versions,
            vulnerabilities: None,
            scheduler,
            version_round: AtomicU64::new(0),
            vulnerability_round: AtomicU64::new(0),
        }
    }

    pub fn with_vulnerability_source(mut self, source: Arc<dyn VulnerabilitySource>) -> Self {
        self.vulnerabilities = Some(source);
        self
    }

    /// Look up the latest stable version of every record, in parallel up to the
    /// scheduler's limit. `progress(done, total)` is called as lookups finish,
    /// in completion order.
    pub async fn fetch_versions<F>(
        &self,
        records: &[Arc<DependencyRecord>],
        progress: F,
    ) -> RoundSummary
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        let round = self.version_round.fetch_add(1, Ordering::SeqCst) + 1;
        let total = records.len();
        debug!(
            "Version round {round}: {total} lookups, {} at a time",
            self.scheduler.limit()
        );
        let mut summary = RoundSummary {
            round,
            total,
            ..RoundSummary::default()
        };

        for record in records {
            record.begin_version_fetch(round);
        }

        let completed = Arc::new(AtomicUsize::new(0));
        let progress = Arc::new(progress);
        let mut tasks = JoinSet::new();

        for record in records {
            let record = Arc::clone(record);
            let client = Arc::clone(&self.versions);
            let scheduler = self.scheduler.clone();
            let completed = Arc::clone(&completed);
            let progress = Arc::clone(&progress);

            tasks.spawn(async move {
                let outcome = {
                    let _permit = scheduler.acquire().await;
                    fetch_one(&record, client.as_ref(), round).await
                };
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress(done, total);
                outcome
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(TaskOutcome::Applied { failed }) => {
                    summary.applied += 1;
                    if failed {
                        summary.failed += 1;
                    }
                }
                Ok(TaskOutcome::Superseded) => summary.superseded += 1,
                Err(e) => warn!("Version lookup task failed: {e}"),
            }
        }

        debug!(
            "Version round {round}: {} applied, {} superseded, {} failed",
            summary.applied, summary.superseded, summary.failed
        );
        summary
    }

    /// Scan every record for known vulnerabilities with one batched query.
    /// A failed query marks the records scanned with no findings and is
    /// reported through [`RoundSummary::failed`].
    pub async fn scan_vulnerabilities(&self, records: &[Arc<DependencyRecord>]) -> RoundSummary {
        let round = self.vulnerability_round.fetch_add(1, Ordering::SeqCst) + 1;
        let mut summary = RoundSummary {
            round,
            total: records.len(),
            ..RoundSummary::default()
        };

        let Some(source) = &self.vulnerabilities else {
            warn!("No vulnerability source configured");
            return summary;
        };

        for record in records {
            record.begin_vulnerability_scan(round);
        }

        let mut seen = HashSet::new();
        let components: Vec<(Coordinate, String)> = records
            .iter()
            .map(|r| (r.coordinate().clone(), r.current_version().to_string()))
            .filter(|component| seen.insert(component.clone()))
            .collect();

        let found = {
            let _permit = self.scheduler.acquire().await;
            source.fetch_vulnerabilities(&components).await
        };

        let found = match found {
            Ok(found) => found,
            Err(e) => {
                warn!("Vulnerability scan failed: {e}");
                summary.failed = records.len();
                Default::default()
            }
        };

        for record in records {
            let list = found.get(&record.key()).cloned().unwrap_or_default();
            if record.complete_vulnerability_scan(round, list) {
                summary.applied += 1;
            } else {
                summary.superseded += 1;
            }
        }

        summary
    }

    /// Stable versions of `coordinate`, newest first. Empty on failure.
    pub async fn candidate_versions(&self, coordinate: &Coordinate) -> Vec<String> {
        let _permit = self.scheduler.acquire().await;
        match self.versions.fetch_available_versions(coordinate).await {
            Ok(versions) => VersionComparator::filter_stable_descending(&versions),
            Err(e) => {
                warn!("Failed to fetch versions for {coordinate}: {e}");
                Vec::new()
            }
        }
    }
}

async fn fetch_one(
    record: &DependencyRecord,
    client: &dyn RepositoryClient,
    round: u64,
) -> TaskOutcome {
    // Claimed by a newer round while queued: skip the lookup entirely.
    if record.version_round() != round {
        return TaskOutcome::Superseded;
    }

    let (latest, failed) = match client.fetch_latest_stable(record.coordinate()).await {
        Ok(latest) => (latest, false),
        Err(e) => {
            warn!("Failed to fetch latest version for {}: {e}", record.key());
            (None, true)
        }
    };

    if record.complete_version_fetch(round, latest) {
        TaskOutcome::Applied { failed }
    } else {
        TaskOutcome::Superseded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PomupError, Result};
    use crate::maven::UpdateKind;
    use crate::model::{Severity, VersionState, VulnerabilityRecord};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    struct FixedClient {
        latest: HashMap<String, String>,
    }

    #[async_trait]
    impl RepositoryClient for FixedClient {
        async fn fetch_available_versions(&self, coordinate: &Coordinate) -> Result<Vec<String>> {
            match self.latest.get(&coordinate.key()) {
                Some(v) => Ok(vec!["0.1.0".to_string(), v.clone(), format!("{v}-SNAPSHOT")]),
                None => Err(PomupError::Network("unreachable".to_string())),
            }
        }

        async fn fetch_latest_stable(&self, coordinate: &Coordinate) -> Result<Option<String>> {
            if coordinate.artifact == "broken" {
                return Err(PomupError::Network("timeout".to_string()));
            }
            Ok(self.latest.get(&coordinate.key()).cloned())
        }
    }

    /// Answers slowly with an old version for the first `slow_calls` calls,
    /// then immediately with a new one.
    struct SlowThenFast {
        calls: AtomicUsize,
        slow_calls: usize,
    }

    #[async_trait]
    impl RepositoryClient for SlowThenFast {
        async fn fetch_available_versions(&self, _: &Coordinate) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn fetch_latest_stable(&self, _: &Coordinate) -> Result<Option<String>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.slow_calls {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok(Some("1.5.0".to_string()))
            } else {
                Ok(Some("2.0.0".to_string()))
            }
        }
    }

    struct StaticVulnerabilities;

    #[async_trait]
    impl VulnerabilitySource for StaticVulnerabilities {
        async fn fetch_vulnerabilities(
            &self,
            components: &[(Coordinate, String)],
        ) -> Result<HashMap<String, Vec<VulnerabilityRecord>>> {
            Ok(components
                .iter()
                .filter(|(c, _)| c.artifact == "log4j-core")
                .map(|(c, _)| {
                    (
                        c.key(),
                        vec![VulnerabilityRecord {
                            id: "CVE-2021-44228".to_string(),
                            title: "Log4Shell".to_string(),
                            description: String::new(),
                            cvss_score: 10.0,
                            severity: Severity::Critical,
                        }],
                    )
                })
                .collect())
        }
    }

    struct FailingVulnerabilities;

    #[async_trait]
    impl VulnerabilitySource for FailingVulnerabilities {
        async fn fetch_vulnerabilities(
            &self,
            _: &[(Coordinate, String)],
        ) -> Result<HashMap<String, Vec<VulnerabilityRecord>>> {
            Err(PomupError::Network("401 Unauthorized".to_string()))
        }
    }

    fn record(artifact: &str, version: &str) -> Arc<DependencyRecord> {
        Arc::new(DependencyRecord::new(
            Coordinate::new("org.example", artifact),
            version,
            version,
            None,
            "pom.xml",
        ))
    }

    fn fixed(entries: &[(&str, &str)]) -> Arc<dyn RepositoryClient> {
        Arc::new(FixedClient {
            latest: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    #[tokio::test]
    async fn fetch_versions_classifies_each_record() {
        let client = fixed(&[("org.example:a", "1.2.4"), ("org.example:b", "3.0.0")]);
        let enricher = Enricher::new(client, TaskScheduler::single());
        let records = vec![
            record("a", "1.2.3"),
            record("b", "2.9.0"),
            record("missing", "1.0.0"),
            record("broken", "1.0.0"),
        ];

        let progress_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&progress_calls);
        let summary = enricher
            .fetch_versions(&records, move |_, total| {
                assert_eq!(total, 4);
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(summary.total, 4);
        assert_eq!(summary.applied, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(progress_calls.load(Ordering::SeqCst), 4);

        assert_eq!(records[0].update_kind(), UpdateKind::Patch);
        assert_eq!(records[1].update_kind(), UpdateKind::Major);
        assert_eq!(records[2].version_state(), VersionState::Absent);
        assert_eq!(records[3].version_state(), VersionState::Absent);
        assert!(records.iter().all(|r| r.version_fetched()));
    }

    #[tokio::test]
    async fn newer_round_wins_over_late_results() {
        let records: Vec<Arc<DependencyRecord>> =
            (0..4).map(|i| record(&format!("lib{i}"), "1.0.0")).collect();
        let client: Arc<dyn RepositoryClient> = Arc::new(SlowThenFast {
            calls: AtomicUsize::new(0),
            slow_calls: records.len(),
        });
        let enricher = Arc::new(Enricher::new(client, TaskScheduler::bounded(10)));

        let first = {
            let enricher = Arc::clone(&enricher);
            let records = records.clone();
            tokio::spawn(async move { enricher.fetch_versions(&records, |_, _| {}).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = enricher.fetch_versions(&records, |_, _| {}).await;
        assert_eq!(second.round, 2);
        assert_eq!(second.applied, records.len());

        let first = first.await.unwrap();
        assert_eq!(first.round, 1);
        assert_eq!(first.superseded, records.len());

        for r in &records {
            assert_eq!(r.latest_version().as_deref(), Some("2.0.0"));
            assert_eq!(r.update_kind(), UpdateKind::Major);
        }
    }

    #[tokio::test]
    async fn scan_vulnerabilities_marks_clean_and_affected() {
        let enricher = Enricher::new(fixed(&[]), TaskScheduler::default())
            .with_vulnerability_source(Arc::new(StaticVulnerabilities));
        let records = vec![record("log4j-core", "2.14.1"), record("slf4j-api", "2.0.9")];

        let summary = enricher.scan_vulnerabilities(&records).await;
        assert_eq!(summary.applied, 2);

        assert!(records[0].has_vulnerability());
        assert_eq!(records[0].max_severity(), Some(Severity::Critical));
        assert!(records[1].vulnerabilities_scanned());
        assert!(!records[1].has_vulnerability());
    }

    #[tokio::test]
    async fn failed_vulnerability_scan_is_reported() {
        let enricher = Enricher::new(fixed(&[]), TaskScheduler::default())
            .with_vulnerability_source(Arc::new(FailingVulnerabilities));
        let records = vec![record("a", "1.0")];

        let summary = enricher.scan_vulnerabilities(&records).await;
        assert_eq!(summary.failed, 1);
        assert!(records[0].vulnerabilities_scanned());
        assert!(!records[0].is_vulnerability_loading());
    }

    #[tokio::test]
    async fn scan_without_source_leaves_records_untouched() {
        let enricher = Enricher::new(fixed(&[]), TaskScheduler::default());
        let records = vec![record("a", "1.0")];
        enricher.scan_vulnerabilities(&records).await;
        assert!(!records[0].vulnerabilities_scanned());
    }

    #[tokio::test]
    async fn candidate_versions_are_stable_and_descending() {
        let enricher = Enricher::new(fixed(&[("org.example:a", "1.4.0")]), TaskScheduler::single());
        let versions = enricher
            .candidate_versions(&Coordinate::new("org.example", "a"))
            .await;
        assert_eq!(versions, vec!["1.4.0", "0.1.0"]);

        let none = enricher
            .candidate_versions(&Coordinate::new("org.example", "missing"))
            .await;
        assert!(none.is_empty());
    }
}
