use crate::error::{PomupError, Result};
use crate::model::{Severity, VulnerabilityRecord};
use crate::repository::{Coordinate, VulnerabilitySource};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

const OSS_INDEX_REPORT_URL: &str = "https://ossindex.sonatype.org/api/v3/component-report";
/// Upper bound on coordinates per component-report request.
const BATCH_SIZE: usize = 128;

const USER_ENV: &str = "POMUP_OSSINDEX_USER";
const TOKEN_ENV: &str = "POMUP_OSSINDEX_TOKEN";

/// Sonatype OSS Index client
pub struct OssIndexClient {
    client: Client,
    endpoint: String,
    credentials: Option<(String, String)>,
}

impl OssIndexClient {
    pub fn new(credentials: Option<(String, String)>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pomup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PomupError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: OSS_INDEX_REPORT_URL.to_string(),
            credentials,
        })
    }

    /// Credentials are read from `POMUP_OSSINDEX_USER` / `POMUP_OSSINDEX_TOKEN` when both are set.
    pub fn from_env() -> Result<Self> {
        let credentials = match (std::env::var(USER_ENV), std::env::var(TOKEN_ENV)) {
            (Ok(user), Ok(token)) if !user.is_empty() && !token.is_empty() => Some((user, token)),
            _ => None,
        };
        Self::new(credentials)
    }

    async fn fetch_batch(
        &self,
        components: &[(Coordinate, String)],
    ) -> Result<HashMap<String, Vec<VulnerabilityRecord>>> {
        let request = ComponentReportRequest {
            coordinates: components
                .iter()
                .map(|(coordinate, version)| package_url(coordinate, version))
                .collect(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some((user, token)) = &self.credentials {
            builder = builder.basic_auth(user, Some(token));
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(PomupError::Network(format!(
                "OSS Index request failed with status: {}",
                response.status()
            )));
        }

        let reports: Vec<ComponentReport> = response.json().await?;
        Ok(collect_reports(reports))
    }
}

#[async_trait]
impl VulnerabilitySource for OssIndexClient {
    async fn fetch_vulnerabilities(
        &self,
        components: &[(Coordinate, String)],
    ) -> Result<HashMap<String, Vec<VulnerabilityRecord>>> {
        let mut result = HashMap::new();
        for chunk in components.chunks(BATCH_SIZE) {
            debug!("Querying OSS Index for {} components", chunk.len());
            match self.fetch_batch(chunk).await {
                Ok(found) => result.extend(found),
                Err(e) => {
                    warn!("Vulnerability lookup failed: {e}");
                    return Err(e);
                }
            }
        }
        Ok(result)
    }
}

fn package_url(coordinate: &Coordinate, version: &str) -> String {
    format!(
        "pkg:maven/{}/{}@{}",
        coordinate.group, coordinate.artifact, version
    )
}

/// `pkg:maven/g/a@v` back to the `g:a` key.
fn key_from_package_url(purl: &str) -> Option<String> {
    let rest = purl.strip_prefix("pkg:maven/")?;
    let rest = rest.split(['@', '?']).next()?;
    let (group, artifact) = rest.split_once('/')?;
    Some(Coordinate::new(group, artifact).key())
}

fn collect_reports(reports: Vec<ComponentReport>) -> HashMap<String, Vec<VulnerabilityRecord>> {
    let mut result: HashMap<String, Vec<VulnerabilityRecord>> = HashMap::new();
    for report in reports {
        let Some(key) = key_from_package_url(&report.coordinates) else {
            debug!("Ignoring unrecognised component {}", report.coordinates);
            continue;
        };

        let entry = result.entry(key).or_default();
        for vuln in report.vulnerabilities {
            let cvss_score = vuln.cvss_score.unwrap_or(0.0).max(0.0);
            entry.push(VulnerabilityRecord {
                title: vuln.title.unwrap_or_else(|| vuln.id.clone()),
                id: vuln.id,
                description: vuln.description.unwrap_or_default(),
                cvss_score,
                severity: Severity::from_cvss(cvss_score),
            });
        }
    }
    result
}

#[derive(Debug, Serialize)]
struct ComponentReportRequest {
    coordinates: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ComponentReport {
    coordinates: String,
    #[serde(default)]
    vulnerabilities: Vec<ComponentVulnerability>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComponentVulnerability {
    id: String,
    title: Option<String>,
    description: Option<String>,
    cvss_score: Option<f32>,
}
