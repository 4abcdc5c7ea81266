use crate::error::{PomupError, Result};
use crate::maven::version::VersionComparator;
use crate::repository::{Coordinate, RepositoryClient};
use async_trait::async_trait;
use log::debug;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

const DEFAULT_MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";
const MAX_METADATA_BYTES: usize = 10 * 1024 * 1024;

/// A remote Maven repository declared in a POM (or the built-in default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn maven_central() -> Self {
        Self::new("central", DEFAULT_MAVEN_CENTRAL)
    }
}

/// Maven repository client
pub struct MavenRepository {
    client: Client,
    repositories: Vec<RemoteRepository>,
}

impl MavenRepository {
    pub fn new() -> Result<Self> {
        Self::with_repositories(Vec::new())
    }

    /// Maven Central is always consulted last, after the given repositories.
    pub fn with_repositories(repositories: Vec<RemoteRepository>) -> Result<Self> {
        let client = Self::build_client()?;
        let repositories = Self::ensure_valid_repositories(with_central(repositories))?;

        Ok(Self {
            client,
            repositories,
        })
    }

    /// Fetch all published versions of a dependency.
    /// Stops at the first repository that has the artifact to avoid excessive requests.
    pub async fn fetch_all_versions(&self, group: &str, artifact: &str) -> Result<Vec<String>> {
        for repo in &self.repositories {
            match self
                .fetch_all_versions_from_repository(&repo.url, group, artifact)
                .await
            {
                Ok(Some(versions)) if !versions.is_empty() => return Ok(versions),
                Ok(_) => continue,
                Err(e) => {
                    debug!("{group}:{artifact} lookup in {} failed: {e}", repo.id);
                }
            }
        }

        Ok(Vec::new())
    }

    async fn fetch_all_versions_from_repository(
        &self,
        repo_url: &str,
        group: &str,
        artifact: &str,
    ) -> Result<Option<Vec<String>>> {
        let metadata_url = metadata_url(repo_url, group, artifact);
        debug!("Fetching: {metadata_url}");

        let response = match self.client.get(&metadata_url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!("Request failed: {e}");
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            debug!("HTTP {}: {metadata_url}", response.status());
            return Ok(None);
        }

        let text = response.text().await?;
        if text.len() > MAX_METADATA_BYTES {
            return Err(PomupError::Network(
                "Maven metadata response exceeded 10MB limit".to_string(),
            ));
        }

        parse_metadata_versions(&text).map(Some)
    }

    fn build_client() -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("pomup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PomupError::Network(format!("Failed to build HTTP client: {e}")))
    }

    fn ensure_valid_repositories(
        repositories: Vec<RemoteRepository>,
    ) -> Result<Vec<RemoteRepository>> {
        for repo in &repositories {
            validate_repository_url(&repo.url)?;
        }
        Ok(repositories)
    }
}

#[async_trait]
impl RepositoryClient for MavenRepository {
    async fn fetch_available_versions(&self, coordinate: &Coordinate) -> Result<Vec<String>> {
        self.fetch_all_versions(&coordinate.group, &coordinate.artifact)
            .await
    }

    async fn fetch_latest_stable(&self, coordinate: &Coordinate) -> Result<Option<String>> {
        let versions = self
            .fetch_all_versions(&coordinate.group, &coordinate.artifact)
            .await?;
        Ok(VersionComparator::latest_stable(&versions))
    }
}

/// The lookup order: the given repositories, then Maven Central unless it is
/// already among them.
pub fn with_central(mut repositories: Vec<RemoteRepository>) -> Vec<RemoteRepository> {
    let central = RemoteRepository::maven_central();
    if !repositories.iter().any(|r| r.url == central.url) {
        repositories.push(central);
    }
    repositories
}

fn metadata_url(repo_url: &str, group: &str, artifact: &str) -> String {
    let group_path = group.replace('.', "/");
    format!(
        "{}/{}/{}/maven-metadata.xml",
        repo_url.trim_end_matches('/'),
        group_path,
        artifact
    )
}

fn parse_metadata_versions(text: &str) -> Result<Vec<String>> {
    let metadata: MavenMetadata = from_str(text)
        .map_err(|e| PomupError::PomParsing(format!("Failed to parse Maven metadata: {e}")))?;

    Ok(metadata
        .versioning
        .and_then(|v| v.versions)
        .map(|v| v.version)
        .unwrap_or_default())
}

pub(crate) fn validate_repository_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url)
        .map_err(|_| PomupError::ProjectValidation(format!("Invalid repository URL: {url}")))?;

    match parsed.scheme() {
        "https" | "http" => {}
        scheme => {
            return Err(PomupError::ProjectValidation(format!(
                "Unsupported repository scheme: {scheme}"
            )));
        }
    }

    if let Some(host) = parsed.host_str() {
        if is_private_host(host) {
            return Err(PomupError::ProjectValidation(format!(
                "Repository host '{host}' is not allowed"
            )));
        }
    }

    Ok(())
}

fn is_private_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        match ip {
            IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
            IpAddr::V6(v6) => v6.is_loopback() || v6.is_unique_local(),
        }
    } else {
        false
    }
}

#[derive(Debug, Deserialize)]
struct MavenMetadata {
    versioning: Option<Versioning>,
}

#[derive(Debug, Deserialize)]
struct Versioning {
    versions: Option<Versions>,
}

#[derive(Debug, Deserialize)]
struct Versions {
    #[serde(default)]
    version: Vec<String>,
}
