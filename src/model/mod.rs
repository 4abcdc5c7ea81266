pub mod record;
pub mod vulnerability;

pub use record::{
    DEFAULT_SCOPE, DependencyRecord, VersionState, VulnerabilityState, property_reference,
};
pub use vulnerability::{Severity, VulnerabilityRecord, worst_severity};
