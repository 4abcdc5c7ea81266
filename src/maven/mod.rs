pub mod oss_index;
pub mod repository;
pub mod version;

pub use oss_index::OssIndexClient;
pub use repository::{MavenRepository, RemoteRepository, with_central};
pub use version::{UpdateKind, VersionComparator};
