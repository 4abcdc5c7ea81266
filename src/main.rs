use clap::Parser;
use colored::Colorize;
use pomup::cli::{Cli, Commands};
use pomup::workflow::{self, RunOptions};
use std::process;

fn initialize_logger(verbose: bool) {
    let filter = if verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Warn
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("pomup")
        .build();

    if let Err(e) = simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    let options = RunOptions {
        concurrency: usize::from(cli.concurrency),
        resolve_with_maven: cli.resolve_with_maven,
    };

    let result = match cli.command {
        Commands::Check {
            only_updates,
            filter,
            vulns,
        } => workflow::execute_check(&cli.path, &options, only_updates, filter, vulns).await,
        Commands::List => workflow::execute_list(&cli.path, &options).await,
        Commands::Versions { coordinate } => {
            workflow::execute_versions(&cli.path, &options, &coordinate).await
        }
        Commands::Audit => workflow::execute_audit(&cli.path, &options).await,
        Commands::Upgrade {
            filter,
            dry_run,
            interactive,
            yes,
        } => {
            workflow::execute_upgrade(&cli.path, &options, filter, dry_run, interactive, yes)
                .await
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
