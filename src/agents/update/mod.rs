// Upgrade support around the planner.
//
// - UpgradeInteraction: y/n/a/q prompts for interactive upgrades
// - UpgradeReport: what a run changed, skipped, or failed to write
pub mod interaction;
pub mod report;

pub use interaction::UpgradeInteraction;
pub use report::UpgradeReport;
