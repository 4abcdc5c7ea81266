use crate::error::Result;
use crate::maven::{MavenRepository, OssIndexClient, RemoteRepository};
use crate::repository::{RepositoryClient, VulnerabilitySource};
use std::sync::Arc;

pub struct RepositoryFactory;

impl RepositoryFactory {
    pub fn create_maven(repositories: Vec<RemoteRepository>) -> Result<Arc<dyn RepositoryClient>> {
        let client = if repositories.is_empty() {
            MavenRepository::new()?
        } else {
            MavenRepository::with_repositories(repositories)?
        };
        Ok(Arc::new(client))
    }

    pub fn create_vulnerability_source() -> Result<Arc<dyn VulnerabilitySource>> {
        let client = OssIndexClient::from_env()?;
        Ok(Arc::new(client))
    }
}
