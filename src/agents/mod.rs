pub mod dependency_scanner;
pub mod enricher;
pub mod maven_execution;
pub mod project_scanner;
pub mod upgrade_planner;
pub mod version_resolver;

pub mod update;
pub use update::{UpgradeInteraction, UpgradeReport};

pub use dependency_scanner::{DependencyScanner, ScanResult};
pub use enricher::{Enricher, RoundSummary, TaskScheduler};
pub use maven_execution::MavenExecutionAgent;
pub use project_scanner::{ProjectInfo, ProjectScannerAgent};
pub use upgrade_planner::{Selection, UpgradePlan, UpgradePlanner};
pub use version_resolver::VersionResolver;
