use crate::agents::update::interaction::kind_label;
use crate::agents::upgrade_planner::{Selection, UpgradePlan, UpgradePlanner};
use crate::agents::{
    DependencyScanner, Enricher, MavenExecutionAgent, ProjectInfo, ProjectScannerAgent,
    RoundSummary, ScanResult, TaskScheduler, UpgradeInteraction, UpgradeReport,
};
use crate::error::{PomupError, Result};
use crate::maven::{UpdateKind, with_central};
use crate::model::{DependencyRecord, Severity, VersionState, VulnerabilityState};
use crate::pom::PomEditor;
use crate::repository::{Coordinate, RepositoryFactory};
use crate::utils::PatternMatcher;
use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DESCRIPTION_LIMIT: usize = 300;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub concurrency: usize,
    pub resolve_with_maven: bool,
}

struct Project {
    info: ProjectInfo,
    scan: ScanResult,
}

/// Execute the check workflow (read-only)
pub async fn execute_check<P: AsRef<Path>>(
    project_path: P,
    options: &RunOptions,
    only_updates: bool,
    filter: Option<String>,
    vulns: bool,
) -> Result<()> {
    println!("{}", "Checking for dependency updates...".cyan().bold());
    let matcher = filter.as_deref().map(PatternMatcher::new).transpose()?;

    let project = load_project(project_path.as_ref(), options).await?;
    let records = filter_records(&project.scan.records, matcher.as_ref());
    if records.is_empty() {
        println!("\n{}", "No dependencies to check".yellow());
        return Ok(());
    }

    println!("\n{}", "3. Fetching latest stable versions...".yellow());
    let mut enricher = build_enricher(&project.scan, options)?;
    if vulns {
        enricher = enricher.with_vulnerability_source(RepositoryFactory::create_vulnerability_source()?);
    }
    let summary = fetch_latest(&enricher, &records).await;
    print_round_status(&summary, "version lookup(s)");

    if vulns {
        println!("\n{}", "4. Scanning for known vulnerabilities...".yellow());
        let summary = scan_vulnerabilities(&enricher, &records).await;
        print_round_status(&summary, "vulnerability lookup(s)");
    }

    println!("{}", "✓ Check completed".green());
    print_dependency_table(&project.info.project_path, &records, only_updates);

    let updates = records.iter().filter(|r| r.has_update()).count();
    if updates > 0 {
        println!(
            "\n{}",
            format!("Found {updates} update(s). To apply them, run:").dimmed()
        );
        println!("  {}", "pomup upgrade".cyan());
    }

    Ok(())
}

/// Execute the list workflow - declarations only, no network
pub async fn execute_list<P: AsRef<Path>>(project_path: P, options: &RunOptions) -> Result<()> {
    println!("{}", "Listing declared dependencies...".cyan().bold());
    let project = load_project(project_path.as_ref(), options).await?;
    print_declarations(&project.info.project_path, &project.scan.records);
    Ok(())
}

/// Show the stable versions published for one coordinate
pub async fn execute_versions<P: AsRef<Path>>(
    project_path: P,
    options: &RunOptions,
    coordinate: &str,
) -> Result<()> {
    let coordinate = Coordinate::parse(coordinate).ok_or_else(|| {
        PomupError::ProjectValidation(format!(
            "Invalid coordinate '{coordinate}'. Example: pomup versions org.slf4j:slf4j-api"
        ))
    })?;
    println!(
        "{}",
        format!("Looking up versions of {coordinate}...").cyan().bold()
    );

    // Outside a Maven project only Maven Central is consulted.
    let scanner = ProjectScannerAgent::new(project_path.as_ref());
    let scan = match scanner.validate() {
        Ok(info) => scan_project(&scanner, &info, options).await?,
        Err(e) => {
            debug!("No project context: {e}");
            ScanResult::default()
        }
    };

    let enricher = build_enricher(&scan, options)?;
    let versions = enricher.candidate_versions(&coordinate).await;
    if versions.is_empty() {
        println!("\n{}", "No stable versions found".yellow());
        return Ok(());
    }

    let in_use: HashSet<&str> = scan
        .records
        .iter()
        .filter(|r| *r.coordinate() == coordinate)
        .map(|r| r.current_version())
        .collect();

    println!("\n{}", "📦 Stable versions (newest first):".cyan().bold());
    for version in &versions {
        if in_use.contains(version.as_str()) {
            println!("  • {} {}", version.green().bold(), "(in use)".dimmed());
        } else {
            println!("  • {version}");
        }
    }

    Ok(())
}

/// Execute the audit workflow - vulnerability details per dependency
pub async fn execute_audit<P: AsRef<Path>>(project_path: P, options: &RunOptions) -> Result<()> {
    println!("{}", "Auditing dependencies for known vulnerabilities...".cyan().bold());
    let project = load_project(project_path.as_ref(), options).await?;
    if project.scan.records.is_empty() {
        println!("\n{}", "No dependencies to audit".yellow());
        return Ok(());
    }

    println!("\n{}", "3. Scanning for known vulnerabilities...".yellow());
    let enricher = build_enricher(&project.scan, options)?
        .with_vulnerability_source(RepositoryFactory::create_vulnerability_source()?);
    let summary = scan_vulnerabilities(&enricher, &project.scan.records).await;
    print_round_status(&summary, "vulnerability lookup(s)");

    print_vulnerabilities(&project.info.project_path, &project.scan.records, &summary);
    Ok(())
}

/// Execute the upgrade workflow
pub async fn execute_upgrade<P: AsRef<Path>>(
    project_path: P,
    options: &RunOptions,
    filter: Option<String>,
    dry_run: bool,
    interactive: bool,
    yes: bool,
) -> Result<()> {
    println!("{}", "Starting dependency upgrade...".cyan().bold());
    let matcher = filter.as_deref().map(PatternMatcher::new).transpose()?;

    let project = load_project(project_path.as_ref(), options).await?;
    let root = project.info.project_path.clone();

    println!("\n{}", "3. Fetching latest stable versions...".yellow());
    let enricher = build_enricher(&project.scan, options)?;
    let summary = fetch_latest(&enricher, &project.scan.records).await;
    print_round_status(&summary, "version lookup(s)");

    let candidates: Vec<Arc<DependencyRecord>> =
        filter_records(&project.scan.records, matcher.as_ref())
            .into_iter()
            .filter(|r| r.has_update())
            .collect();
    if candidates.is_empty() {
        println!("\n{}", "✨ All dependencies are up to date!".green().bold());
        return Ok(());
    }

    println!("\n{}", "4. Planning upgrades...".yellow());
    let mut interaction = UpgradeInteraction::new(interactive);
    let selections = match select_upgrades(&candidates, &mut interaction) {
        Ok(selections) => selections,
        Err(PomupError::UserCancelled) => {
            println!("\n{}", "Upgrade cancelled by user.".yellow());
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    if selections.is_empty() {
        println!("\n{}", "No upgrades selected".yellow());
        return Ok(());
    }

    let plan = UpgradePlanner::new(&project.scan.index).plan(&selections);
    print_plan(&root, &plan);

    if plan.is_empty() {
        println!("\n{}", "Nothing to apply".yellow());
        return Ok(());
    }
    if dry_run {
        println!("\n{}", "Dry run: no files were changed.".dimmed());
        return Ok(());
    }
    if !yes && !interactive && !interaction.confirm_plan(plan.total_edits(), plan.by_file().len())? {
        println!("{}", "No files were changed.".yellow());
        return Ok(());
    }

    println!("\n{}", "5. Writing POM files...".yellow());
    let applied = PomEditor::new(&root).apply_plan(&plan);
    let report = UpgradeReport::from_outcome(&selections, &plan, applied);
    print_upgrade_report(&root, &report);

    if report.files_written() == 0 {
        return Ok(());
    }

    println!("\n{}", "6. Re-checking upgraded dependencies...".yellow());
    let scanner = ProjectScannerAgent::new(&root);
    let rescan = scan_project(&scanner, &project.info, options).await?;
    let upgraded: Vec<Arc<DependencyRecord>> = rescan
        .records
        .iter()
        .filter(|r| report.dependency_updates.contains_key(&r.key()))
        .cloned()
        .collect();
    let enricher = build_enricher(&rescan, options)?;
    fetch_latest(&enricher, &upgraded).await;
    print_dependency_table(&root, &upgraded, false);

    if report.failed.is_empty() {
        println!("\n{}", "✨ Upgrade completed successfully!".green().bold());
    } else {
        println!(
            "\n{}",
            "⚠ Upgrade completed with errors; failed files were left untouched.".yellow()
        );
    }
    Ok(())
}

async fn load_project(project_path: &Path, options: &RunOptions) -> Result<Project> {
    println!("\n{}", "1. Validating project structure...".yellow());
    let scanner = ProjectScannerAgent::new(project_path);
    let info = scanner.validate()?;
    println!("{}", "✓ Project structure is valid".green());

    println!("\n{}", "2. Reading POM files...".yellow());
    let scan = scan_project(&scanner, &info, options).await?;
    println!(
        "   Found {} module(s) declaring {} dependencies",
        scan.module_count,
        scan.records.len()
    );
    if !scan.unresolved.is_empty() {
        println!(
            "   {}",
            format!(
                "⚠ Skipped {} declaration(s) without a resolvable version",
                scan.unresolved.len()
            )
            .yellow()
        );
    }
    if scan.degraded > 0 {
        println!(
            "   {}",
            format!(
                "⚠ {} version(s) reference undefined properties",
                scan.degraded
            )
            .yellow()
        );
    }

    println!("   Repositories:");
    for repo in with_central(scan.repositories.clone()) {
        println!("   • {} ({})", repo.id.bright_cyan(), repo.url.dimmed());
    }

    Ok(Project { info, scan })
}

async fn scan_project(
    scanner: &ProjectScannerAgent,
    info: &ProjectInfo,
    options: &RunOptions,
) -> Result<ScanResult> {
    let mut modules = scanner.discover_modules(info)?;
    let mut dependency_scanner = DependencyScanner::new(&info.project_path);

    if options.resolve_with_maven {
        if info.has_maven_wrapper() {
            println!("   Resolving effective versions with the Maven wrapper");
        } else {
            println!("   Resolving effective versions with mvn");
        }
        let agent = MavenExecutionAgent::new(&info.project_path, info.maven_wrapper.as_deref());
        let (returned, resolved) = tokio::task::spawn_blocking(move || {
            let resolved = agent.resolve_effective_versions(&modules);
            (modules, resolved)
        })
        .await
        .map_err(|e| PomupError::MavenExecution(format!("Maven task failed: {e}")))?;
        modules = returned;

        match resolved {
            Ok(versions) => dependency_scanner = dependency_scanner.with_maven_versions(versions),
            Err(e) => println!(
                "   {}",
                format!("⚠ {e}; using versions managed in the project only").yellow()
            ),
        }
    }

    Ok(dependency_scanner.scan(modules))
}

fn build_enricher(scan: &ScanResult, options: &RunOptions) -> Result<Enricher> {
    let client = RepositoryFactory::create_maven(scan.repositories.clone())?;
    Ok(Enricher::new(client, TaskScheduler::bounded(options.concurrency)))
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  [{bar:40}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

async fn fetch_latest(enricher: &Enricher, records: &[Arc<DependencyRecord>]) -> RoundSummary {
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(progress_style());
    pb.set_message("Fetching latest versions");

    let bar = pb.clone();
    let summary = enricher
        .fetch_versions(records, move |done, _total| bar.set_position(done as u64))
        .await;

    pb.finish_and_clear();
    summary
}

async fn scan_vulnerabilities(enricher: &Enricher, records: &[Arc<DependencyRecord>]) -> RoundSummary {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Querying {} component(s)", records.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let summary = enricher.scan_vulnerabilities(records).await;

    spinner.finish_and_clear();
    summary
}

fn print_round_status(summary: &RoundSummary, what: &str) {
    if summary.failed > 0 {
        println!(
            "{}",
            format!("⚠ {} of {} {what} failed", summary.failed, summary.total).yellow()
        );
    }
}

fn filter_records(
    records: &[Arc<DependencyRecord>],
    matcher: Option<&PatternMatcher>,
) -> Vec<Arc<DependencyRecord>> {
    records
        .iter()
        .filter(|r| matcher.is_none_or(|m| m.matches(&r.key())))
        .cloned()
        .collect()
}

fn select_upgrades(
    candidates: &[Arc<DependencyRecord>],
    interaction: &mut UpgradeInteraction,
) -> Result<Vec<Selection>> {
    let mut selections = Vec::new();
    for record in candidates {
        let Some(selection) = Selection::to_latest(record) else {
            continue;
        };
        if interaction.confirm(
            &record.key(),
            record.update_kind(),
            record.current_version(),
            &selection.new_version,
        )? {
            selections.push(selection);
        }
    }
    Ok(selections)
}

fn relative_file(root: &Path, file: &Path) -> String {
    file.strip_prefix(root).unwrap_or(file).display().to_string()
}

fn latest_cell(state: &VersionState) -> String {
    match state {
        VersionState::NotFetched => "-".to_string(),
        VersionState::Fetching => "loading…".to_string(),
        VersionState::Found { latest, .. } => latest.clone(),
        VersionState::Absent => "lookup failed".to_string(),
    }
}

fn vulnerability_cell(state: &VulnerabilityState) -> String {
    match state {
        VulnerabilityState::NotScanned => "-".to_string(),
        VulnerabilityState::Scanning => "…".to_string(),
        VulnerabilityState::Scanned(list) if list.is_empty() => "✓".to_string(),
        VulnerabilityState::Scanned(list) => {
            let worst = list
                .iter()
                .map(|v| v.severity)
                .max()
                .unwrap_or(Severity::Low);
            format!("{} ({})", list.len(), worst.as_str().to_uppercase())
        }
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    let label = severity.as_str().to_uppercase();
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::High => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.dimmed(),
    }
}

fn truncate(text: &str, limit: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push('…');
    cut
}

struct TableRow {
    dependency: String,
    current: String,
    latest: String,
    kind: UpdateKind,
    vulns: String,
    vulnerable: bool,
    file: String,
}

fn print_dependency_table(root: &Path, records: &[Arc<DependencyRecord>], only_updates: bool) {
    let mut rows: Vec<TableRow> = records
        .iter()
        .filter(|r| !only_updates || r.has_update())
        .map(|r| TableRow {
            dependency: r.key(),
            current: r.current_version().to_string(),
            latest: latest_cell(&r.version_state()),
            kind: r.update_kind(),
            vulns: vulnerability_cell(&r.vulnerability_state()),
            vulnerable: r.has_vulnerability(),
            file: relative_file(root, r.declaring_file()),
        })
        .collect();

    if rows.is_empty() {
        println!("\n{}", "✨ All dependencies are up to date!".green().bold());
        return;
    }
    rows.sort_by_key(|row| row.kind.sort_rank());

    let dep_w = column_width("DEPENDENCY", rows.iter().map(|r| r.dependency.as_str()));
    let cur_w = column_width("CURRENT", rows.iter().map(|r| r.current.as_str()));
    let lat_w = column_width("LATEST", rows.iter().map(|r| r.latest.as_str()));
    let vul_w = column_width("VULNS", rows.iter().map(|r| r.vulns.as_str()));
    let kind_w = "[UP TO DATE]".len();

    println!("\n{}", "📦 Dependencies:".cyan().bold());
    println!(
        "  {}",
        format!(
            "{:<dep_w$}  {:<cur_w$}  {:<lat_w$}  {:<kind_w$}  {:<vul_w$}  FILE",
            "DEPENDENCY", "CURRENT", "LATEST", "UPDATE", "VULNS"
        )
        .bold()
    );

    for row in &rows {
        let latest = format!("{:<lat_w$}", row.latest);
        let latest = if row.kind.is_upgrade() {
            latest.green().bold()
        } else {
            latest.normal()
        };
        let kind_text = format!("[{}]", row.kind.to_string().to_uppercase());
        let padding = " ".repeat(kind_w.saturating_sub(kind_text.chars().count()));
        let vulns = format!("{:<vul_w$}", row.vulns);
        let vulns = if row.vulnerable { vulns.red().bold() } else { vulns.normal() };

        println!(
            "  {}  {}  {}  {}{}  {}  {}",
            format!("{:<dep_w$}", row.dependency).white().bold(),
            format!("{:<cur_w$}", row.current),
            latest,
            kind_label(row.kind),
            padding,
            vulns,
            row.file.dimmed()
        );
    }
}

fn column_width<'a>(header: &str, cells: impl Iterator<Item = &'a str>) -> usize {
    cells
        .map(|cell| cell.chars().count())
        .chain([header.len()])
        .max()
        .unwrap_or(0)
}

fn print_declarations(root: &Path, records: &[Arc<DependencyRecord>]) {
    if records.is_empty() {
        println!("\n{}", "No dependencies declared".yellow());
        return;
    }

    println!("\n{}", "📦 Dependencies:".cyan().bold());
    let mut current_file = None;
    for record in records_by_file(records) {
        let file = relative_file(root, record.declaring_file());
        if current_file.as_ref() != Some(&file) {
            println!("\n{}", format!("{file}:").yellow().bold());
            current_file = Some(file);
        }

        let declared = match record.property_name() {
            Some(_) => format!(" ({})", record.version_expression()).dimmed().to_string(),
            None => String::new(),
        };
        let scope = if record.scope() == crate::model::DEFAULT_SCOPE {
            String::new()
        } else {
            format!(" [{}]", record.scope()).dimmed().to_string()
        };
        println!(
            "  • {}:{}{}{}",
            record.key().white().bold(),
            record.current_version().green(),
            declared,
            scope
        );
    }
}

fn records_by_file(records: &[Arc<DependencyRecord>]) -> Vec<&Arc<DependencyRecord>> {
    let mut sorted: Vec<&Arc<DependencyRecord>> = records.iter().collect();
    sorted.sort_by(|a, b| a.declaring_file().cmp(b.declaring_file()));
    sorted
}

fn print_vulnerabilities(root: &Path, records: &[Arc<DependencyRecord>], summary: &RoundSummary) {
    let mut vulnerable: Vec<&Arc<DependencyRecord>> =
        records.iter().filter(|r| r.has_vulnerability()).collect();

    if vulnerable.is_empty() {
        if summary.failed == 0 {
            println!("\n{}", "✨ No known vulnerabilities found!".green().bold());
        }
        return;
    }
    vulnerable.sort_by(|a, b| b.max_severity().cmp(&a.max_severity()));

    println!(
        "\n{}",
        format!("🛡 {} vulnerable dependenc(ies):", vulnerable.len())
            .red()
            .bold()
    );

    for record in vulnerable {
        println!(
            "\n{} {}",
            record.to_string().white().bold(),
            relative_file(root, record.declaring_file()).dimmed()
        );
        for vulnerability in record.vulnerabilities() {
            println!(
                "  • [{}] {} (CVSS {:.1})",
                severity_label(vulnerability.severity),
                vulnerability.id.bold(),
                vulnerability.cvss_score
            );
            if vulnerability.title != vulnerability.id {
                println!("    {}", vulnerability.title);
            }
            if !vulnerability.description.trim().is_empty() {
                println!(
                    "    {}",
                    truncate(&vulnerability.description, DESCRIPTION_LIMIT).dimmed()
                );
            }
        }
    }
}

fn print_plan(root: &Path, plan: &UpgradePlan) {
    if !plan.is_empty() {
        println!("\n{}", "📝 Planned edits:".cyan().bold());
        for (file, edits) in plan.by_file() {
            println!("  {}", relative_file(root, file).yellow().bold());
            for edit in edits {
                println!(
                    "    • {} {} → {}",
                    edit.site.to_string().dimmed(),
                    edit.target.white().bold(),
                    edit.new_value.green().bold()
                );
            }
        }
    }

    if !plan.skipped.is_empty() {
        println!("\n{}", "Skipped:".yellow().bold());
        for skipped in &plan.skipped {
            println!(
                "  • {} ({}): {}",
                skipped.key.white(),
                relative_file(root, &skipped.declaring_file).dimmed(),
                skipped.reason
            );
        }
    }
}

fn print_upgrade_report(root: &Path, report: &UpgradeReport) {
    if !report.dependency_updates.is_empty() {
        println!("\n{}:", "Dependency upgrades".cyan().bold());
        for (name, (old, new)) in &report.dependency_updates {
            println!(
                "  • {} {} → {}",
                name.white().bold(),
                old.red(),
                new.green().bold()
            );
        }
    }

    if !report.property_updates.is_empty() {
        println!("\n{}:", "Property updates".cyan().bold());
        for (name, value) in &report.property_updates {
            println!("  • {} → {}", name.white().bold(), value.green().bold());
        }
    }

    for (file, error) in &report.failed {
        println!(
            "{}",
            format!("✗ {}: {error}", relative_file(root, file)).red()
        );
    }

    if report.is_empty() {
        println!("{}", "No upgrades were applied".yellow());
        return;
    }

    println!(
        "{}",
        format!(
            "✓ {} file(s) updated, {} upgrade(s) applied",
            report.files_written(),
            report.total_updates()
        )
        .green()
    );
}
