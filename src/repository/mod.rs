use crate::error::Result;
use crate::model::VulnerabilityRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

pub mod factory;
pub use factory::RepositoryFactory;

/// A `groupId:artifactId` pair identifying a library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
}

impl Coordinate {
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
        }
    }

    /// Parse `group:artifact`, tolerating a trailing `:version`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split(':');
        let group = parts.next().filter(|g| !g.is_empty())?;
        let artifact = parts.next().filter(|a| !a.is_empty())?;
        if parts.count() > 1 {
            return None;
        }
        Some(Self::new(group, artifact))
    }

    /// Lookup key, `group:artifact`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

/// Source of published versions for a coordinate.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Raw, unfiltered version list. Empty when the artifact is unknown.
    async fn fetch_available_versions(&self, coordinate: &Coordinate) -> Result<Vec<String>>;

    /// Single best stable version, if any.
    async fn fetch_latest_stable(&self, coordinate: &Coordinate) -> Result<Option<String>>;
}

/// Source of known vulnerabilities, queried in batch.
#[async_trait]
pub trait VulnerabilitySource: Send + Sync {
    /// Each entry pairs a coordinate with the version in use. The result is keyed
    /// by [`Coordinate::key`]; coordinates without findings may be absent.
    async fn fetch_vulnerabilities(
        &self,
        components: &[(Coordinate, String)],
    ) -> Result<HashMap<String, Vec<VulnerabilityRecord>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinates() {
        let c = Coordinate::parse("org.slf4j:slf4j-api").unwrap();
        assert_eq!(c.key(), "org.slf4j:slf4j-api");
        assert_eq!(
            Coordinate::parse("org.slf4j:slf4j-api:2.0.9"),
            Some(Coordinate::new("org.slf4j", "slf4j-api"))
        );
        assert_eq!(Coordinate::parse("org.slf4j"), None);
        assert_eq!(Coordinate::parse(":slf4j-api"), None);
        assert_eq!(Coordinate::parse("a:b:c:d"), None);
    }
}
