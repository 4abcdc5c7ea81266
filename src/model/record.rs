use crate::maven::version::{UpdateKind, VersionComparator};
use crate::model::vulnerability::{Severity, VulnerabilityRecord, worst_severity};
use crate::repository::Coordinate;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DEFAULT_SCOPE: &str = "compile";

/// Name inside a `${name}` reference, or `None` for anything else.
pub fn property_reference(expression: &str) -> Option<&str> {
    expression
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|name| !name.is_empty())
}

/// Version track: `NotFetched -> Fetching -> Found | Absent`.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionState {
    NotFetched,
    Fetching,
    Found { latest: String, kind: UpdateKind },
    /// The lookup ran and produced nothing (unknown artifact or fetch failure).
    Absent,
}

/// Vulnerability track: `NotScanned -> Scanning -> Scanned`.
/// `Scanned` with an empty list means scanned and clean.
#[derive(Debug, Clone, PartialEq)]
pub enum VulnerabilityState {
    NotScanned,
    Scanning,
    Scanned(Vec<VulnerabilityRecord>),
}

/// State owned by the most recent enrichment round that claimed it.
#[derive(Debug)]
struct Tracked<S> {
    round: u64,
    state: S,
}

impl<S> Tracked<S> {
    fn new(state: S) -> Self {
        Self { round: 0, state }
    }

    /// Claim the track for `round`. Fails if a newer round already owns it.
    fn begin(&mut self, round: u64, state: S) -> bool {
        if round < self.round {
            return false;
        }
        self.round = round;
        self.state = state;
        true
    }

    /// Store a result, unless `round` has been superseded.
    fn complete(&mut self, round: u64, state: S) -> bool {
        if round != self.round {
            return false;
        }
        self.state = state;
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One declared dependency in one declaring file.
///
/// Identity is `(group, artifact, declaring_file)`: the same coordinate declared
/// in two modules yields two records. The declaration fields are fixed at scan
/// time; the version and vulnerability tracks are mutated in place by
/// enrichment rounds, so holders of a shared reference always see the latest
/// state.
#[derive(Debug)]
pub struct DependencyRecord {
    coordinate: Coordinate,
    current_version: String,
    version_expression: String,
    scope: String,
    declaring_file: PathBuf,
    version: Mutex<Tracked<VersionState>>,
    vulnerability: Mutex<Tracked<VulnerabilityState>>,
}

impl DependencyRecord {
    pub fn new(
        coordinate: Coordinate,
        current_version: impl Into<String>,
        version_expression: impl Into<String>,
        scope: Option<&str>,
        declaring_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            coordinate,
            current_version: current_version.into(),
            version_expression: version_expression.into(),
            scope: scope
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(DEFAULT_SCOPE)
                .to_string(),
            declaring_file: declaring_file.into(),
            version: Mutex::new(Tracked::new(VersionState::NotFetched)),
            vulnerability: Mutex::new(Tracked::new(VulnerabilityState::NotScanned)),
        }
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub fn group(&self) -> &str {
        &self.coordinate.group
    }

    pub fn artifact(&self) -> &str {
        &self.coordinate.artifact
    }

    /// `group:artifact`
    pub fn key(&self) -> String {
        self.coordinate.key()
    }

    /// Fully resolved version, never a `${...}` reference.
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// The version text as declared.
    pub fn version_expression(&self) -> &str {
        &self.version_expression
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn declaring_file(&self) -> &Path {
        &self.declaring_file
    }

    pub fn is_property_version(&self) -> bool {
        self.property_name().is_some()
    }

    pub fn property_name(&self) -> Option<&str> {
        property_reference(&self.version_expression)
    }

    pub fn version_state(&self) -> VersionState {
        lock(&self.version).state.clone()
    }

    pub fn latest_version(&self) -> Option<String> {
        match &lock(&self.version).state {
            VersionState::Found { latest, .. } => Some(latest.clone()),
            _ => None,
        }
    }

    /// `Unknown` until a lookup has found a latest version.
    pub fn update_kind(&self) -> UpdateKind {
        match &lock(&self.version).state {
            VersionState::Found { kind, .. } => *kind,
            _ => UpdateKind::Unknown,
        }
    }

    pub fn has_update(&self) -> bool {
        self.update_kind().is_upgrade()
    }

    pub fn is_version_loading(&self) -> bool {
        matches!(lock(&self.version).state, VersionState::Fetching)
    }

    pub fn version_fetched(&self) -> bool {
        matches!(
            lock(&self.version).state,
            VersionState::Found { .. } | VersionState::Absent
        )
    }

    /// The newest round that has claimed the version track (0 before any).
    pub fn version_round(&self) -> u64 {
        lock(&self.version).round
    }

    /// Mark a version lookup for `round` as in flight.
    pub fn begin_version_fetch(&self, round: u64) -> bool {
        lock(&self.version).begin(round, VersionState::Fetching)
    }

    /// Record the outcome of `round`'s lookup. Returns `false` and leaves the
    /// record untouched when a newer round has started since.
    pub fn complete_version_fetch(&self, round: u64, latest: Option<String>) -> bool {
        let state = match latest {
            Some(latest) => {
                let kind = VersionComparator::classify(&self.current_version, &latest);
                VersionState::Found { latest, kind }
            }
            None => VersionState::Absent,
        };
        lock(&self.version).complete(round, state)
    }

    pub fn vulnerability_state(&self) -> VulnerabilityState {
        lock(&self.vulnerability).state.clone()
    }

    pub fn vulnerabilities(&self) -> Vec<VulnerabilityRecord> {
        match &lock(&self.vulnerability).state {
            VulnerabilityState::Scanned(list) => list.clone(),
            _ => Vec::new(),
        }
    }

    pub fn has_vulnerability(&self) -> bool {
        matches!(&lock(&self.vulnerability).state, VulnerabilityState::Scanned(list) if !list.is_empty())
    }

    pub fn max_severity(&self) -> Option<Severity> {
        match &lock(&self.vulnerability).state {
            VulnerabilityState::Scanned(list) => worst_severity(list),
            _ => None,
        }
    }

    pub fn is_vulnerability_loading(&self) -> bool {
        matches!(lock(&self.vulnerability).state, VulnerabilityState::Scanning)
    }

    pub fn vulnerabilities_scanned(&self) -> bool {
        matches!(lock(&self.vulnerability).state, VulnerabilityState::Scanned(_))
    }

    pub fn begin_vulnerability_scan(&self, round: u64) -> bool {
        lock(&self.vulnerability).begin(round, VulnerabilityState::Scanning)
    }

    pub fn complete_vulnerability_scan(
        &self,
        round: u64,
        vulnerabilities: Vec<VulnerabilityRecord>,
    ) -> bool {
        lock(&self.vulnerability).complete(round, VulnerabilityState::Scanned(vulnerabilities))
    }
}

impl PartialEq for DependencyRecord {
    fn eq(&self, other: &Self) -> bool {
        self.coordinate == other.coordinate && self.declaring_file == other.declaring_file
    }
}

impl Eq for DependencyRecord {}

impl Hash for DependencyRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coordinate.hash(state);
        self.declaring_file.hash(state);
    }
}

impl fmt::Display for DependencyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.coordinate, self.current_version)
    }
}
