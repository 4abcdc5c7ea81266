use crate::agents::enricher::DEFAULT_CONCURRENCY;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pomup",
    about = "Check, audit and upgrade Maven dependency versions",
    version,
    author
)]
pub struct Cli {
    /// Path to the project directory (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    pub path: String,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Maximum number of concurrent repository lookups
    #[arg(
        long,
        default_value_t = DEFAULT_CONCURRENCY as u16,
        value_parser = clap::value_parser!(u16).range(1..),
        global = true
    )]
    pub concurrency: u16,

    /// Ask Maven for effective versions (`mvn dependency:list`) in addition to
    /// the versions managed inside the project
    #[arg(long, global = true)]
    pub resolve_with_maven: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show each dependency with its latest stable version
    Check {
        /// Only show dependencies that have an update
        #[arg(short = 'u', long)]
        only_updates: bool,

        /// Filter dependencies by `group:artifact` using glob syntax (e.g. "*jackson*")
        #[arg(long, value_name = "GLOB")]
        filter: Option<String>,

        /// Also scan for known vulnerabilities
        #[arg(long)]
        vulns: bool,
    },

    /// List declared dependencies without contacting any repository
    List,

    /// Show the stable versions published for a coordinate, newest first
    Versions {
        /// Coordinate as group:artifact
        #[arg(value_name = "COORDINATE")]
        coordinate: String,
    },

    /// Scan dependencies for known vulnerabilities
    Audit,

    /// Upgrade dependencies to their latest stable versions
    Upgrade {
        /// Only upgrade dependencies matching this glob
        #[arg(long, value_name = "GLOB")]
        filter: Option<String>,

        /// Print the planned edits without writing any file
        #[arg(long)]
        dry_run: bool,

        /// Confirm each upgrade individually
        #[arg(short, long)]
        interactive: bool,

        /// Apply the plan without the final confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upgrade_flags() {
        let cli = Cli::parse_from([
            "pomup",
            "upgrade",
            "--filter",
            "jackson",
            "--dry-run",
            "--path",
            "demo",
        ]);
        assert_eq!(cli.path, "demo");
        assert_eq!(usize::from(cli.concurrency), DEFAULT_CONCURRENCY);
        match cli.command {
            Commands::Upgrade {
                filter,
                dry_run,
                interactive,
                yes,
            } => {
                assert_eq!(filter.as_deref(), Some("jackson"));
                assert!(dry_run);
                assert!(!interactive);
                assert!(!yes);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_concurrency() {
        assert!(Cli::try_parse_from(["pomup", "--concurrency", "0", "list"]).is_err());
    }
}
