mod common;

use common::{FakeRepository, TempProject, relative};
use pomup::agents::upgrade_planner::{EditSite, SkipReason};
use pomup::agents::{
    DependencyScanner, Enricher, ProjectScannerAgent, ScanResult, Selection, TaskScheduler,
    UpgradePlanner, UpgradeReport,
};
use pomup::maven::UpdateKind;
use pomup::model::{DependencyRecord, VersionState};
use pomup::pom::PomEditor;
use std::path::Path;
use std::sync::Arc;

fn scan(root: &Path) -> ScanResult {
    let scanner = ProjectScannerAgent::new(root);
    let info = scanner.validate().unwrap();
    let modules = scanner.discover_modules(&info).unwrap();
    DependencyScanner::new(&info.project_path).scan(modules)
}

fn find<'a>(
    records: &'a [Arc<DependencyRecord>],
    key: &str,
    file: &str,
    root: &Path,
) -> &'a Arc<DependencyRecord> {
    records
        .iter()
        .find(|r| r.key() == key && relative(root, r.declaring_file()) == file)
        .unwrap_or_else(|| panic!("no record for {key} in {file}"))
}

async fn enrich(records: &[Arc<DependencyRecord>]) {
    let enricher = Enricher::new(
        Arc::new(FakeRepository::for_sample_project()),
        TaskScheduler::default(),
    );
    let summary = enricher.fetch_versions(records, |_, _| {}).await;
    assert_eq!(summary.applied, records.len());
    assert_eq!(summary.failed, 0);
}

#[test]
fn scan_resolves_every_module() {
    let project = TempProject::multi_module();
    let root = project.path();
    let result = scan(&root);

    assert_eq!(result.module_count, 3);
    assert_eq!(result.records.len(), 7);
    assert!(result.unresolved.is_empty());

    let databind = find(
        &result.records,
        "com.fasterxml.jackson.core:jackson-databind",
        "core/pom.xml",
        &root,
    );
    assert_eq!(databind.current_version(), "2.15.2");
    assert_eq!(databind.property_name(), Some("jackson.version"));

    let slf4j = find(&result.records, "org.slf4j:slf4j-api", "core/pom.xml", &root);
    assert_eq!(slf4j.current_version(), "2.0.9");

    let core = find(&result.records, "com.acme:core", "app/pom.xml", &root);
    assert_eq!(core.current_version(), "1.0.0");

    let junit = find(&result.records, "junit:junit", "pom.xml", &root);
    assert_eq!(junit.scope(), "test");

    let keys: Vec<String> = result.records.iter().map(|r| r.key()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[tokio::test]
async fn enrichment_classifies_updates() {
    let project = TempProject::multi_module();
    let root = project.path();
    let result = scan(&root);
    enrich(&result.records).await;

    let databind = find(
        &result.records,
        "com.fasterxml.jackson.core:jackson-databind",
        "core/pom.xml",
        &root,
    );
    assert_eq!(databind.latest_version().as_deref(), Some("2.17.1"));
    assert_eq!(databind.update_kind(), UpdateKind::Minor);

    let slf4j = find(&result.records, "org.slf4j:slf4j-api", "core/pom.xml", &root);
    assert_eq!(slf4j.update_kind(), UpdateKind::Patch);

    let junit = find(&result.records, "junit:junit", "pom.xml", &root);
    assert_eq!(junit.update_kind(), UpdateKind::UpToDate);
    assert!(!junit.has_update());

    let core = find(&result.records, "com.acme:core", "app/pom.xml", &root);
    assert_eq!(core.version_state(), VersionState::Absent);
    assert_eq!(core.update_kind(), UpdateKind::Unknown);
}

#[tokio::test]
async fn plan_apply_and_rescan() {
    let project = TempProject::multi_module();
    let root = project.path();
    let result = scan(&root);
    enrich(&result.records).await;

    let selections: Vec<Selection> = result
        .records
        .iter()
        .filter(|r| r.has_update())
        .filter_map(Selection::to_latest)
        .collect();
    assert_eq!(selections.len(), 5);

    let plan = UpgradePlanner::new(&result.index).plan(&selections);

    // Both jackson artifacts share one property edit in the parent.
    let root_edits = &plan.by_file()[&project.file_path("pom.xml")];
    assert_eq!(root_edits.len(), 1);
    assert_eq!(root_edits[0].site, EditSite::PropertyValue);
    assert_eq!(root_edits[0].target, "jackson.version");
    assert_eq!(root_edits[0].new_value, "2.17.1");

    for module in ["core/pom.xml", "app/pom.xml"] {
        let edits = &plan.by_file()[&project.file_path(module)];
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].site, EditSite::DirectVersionTag);
        assert_eq!(edits[0].target, "org.apache.commons:commons-lang3");
    }
    assert_eq!(plan.total_edits(), 3);

    // slf4j's version lives in the parent's dependencyManagement, not in core.
    assert_eq!(plan.skipped.len(), 1);
    assert_eq!(plan.skipped[0].key, "org.slf4j:slf4j-api");
    assert_eq!(plan.skipped[0].reason, SkipReason::InheritedVersion);

    let applied = PomEditor::new(&root).apply_plan(&plan);
    assert!(applied.is_success());
    assert_eq!(applied.applied_edits(), 3);

    let report = UpgradeReport::from_outcome(&selections, &plan, applied);
    assert_eq!(report.files_written(), 3);
    assert_eq!(report.property_updates["jackson.version"], "2.17.1");

    assert!(project
        .read_file("pom.xml")
        .contains("<jackson.version>2.17.1</jackson.version>"));
    assert!(project
        .read_file("core/pom.xml")
        .contains("<version>${jackson.version}</version>"));

    let rescanned = scan(&root);
    enrich(&rescanned.records).await;

    for (key, file) in [
        ("com.fasterxml.jackson.core:jackson-databind", "core/pom.xml"),
        ("com.fasterxml.jackson.core:jackson-annotations", "app/pom.xml"),
        ("org.apache.commons:commons-lang3", "core/pom.xml"),
        ("org.apache.commons:commons-lang3", "app/pom.xml"),
    ] {
        let record = find(&rescanned.records, key, file, &root);
        assert_eq!(record.update_kind(), UpdateKind::UpToDate, "{key} in {file}");
    }

    let slf4j = find(&rescanned.records, "org.slf4j:slf4j-api", "core/pom.xml", &root);
    assert_eq!(slf4j.current_version(), "2.0.9");
}

#[test]
fn built_in_properties_are_never_edited() {
    let project = TempProject::multi_module();
    let root = project.path();
    let result = scan(&root);

    let core = find(&result.records, "com.acme:core", "app/pom.xml", &root);
    let plan = UpgradePlanner::new(&result.index).plan(&[Selection::new(Arc::clone(core), "1.1.0")]);

    assert!(plan.is_empty());
    assert_eq!(
        plan.skipped[0].reason,
        SkipReason::BuiltInProperty("project.version".to_string())
    );
}

#[test]
fn managed_literal_in_declaring_file_is_edited() {
    let project = TempProject::new();
    project.create_file(
        "pom.xml",
        r#"<project>
  <groupId>com.acme</groupId>
  <artifactId>single</artifactId>
  <version>1.0.0</version>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.slf4j</groupId>
        <artifactId>slf4j-api</artifactId>
        <version>2.0.9</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency>
      <groupId>org.slf4j</groupId>
      <artifactId>slf4j-api</artifactId>
    </dependency>
  </dependencies>
</project>
"#,
    );
    let root = project.path();
    let result = scan(&root);
    assert_eq!(result.records.len(), 1);

    let plan = UpgradePlanner::new(&result.index)
        .plan(&[Selection::new(Arc::clone(&result.records[0]), "2.0.13")]);
    let edits = plan.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].site, EditSite::ManagedVersionTag);

    PomEditor::new(&root)
        .apply(&project.file_path("pom.xml"), &edits)
        .unwrap();
    let rescanned = scan(&root);
    assert_eq!(rescanned.records[0].current_version(), "2.0.13");
}

#[test]
fn child_property_override_is_not_edited_in_the_parent() {
    let project = TempProject::new();
    project.create_file(
        "pom.xml",
        r#"<project>
  <groupId>com.acme</groupId>
  <artifactId>acme-parent</artifactId>
  <version>1.0.0</version>
  <modules><module>lib</module></modules>
  <properties>
    <lib.version>1.0.0</lib.version>
    <base.version>1.0.0</base.version>
  </properties>
</project>
"#,
    );
    project.create_file(
        "lib/pom.xml",
        r#"<project>
  <parent>
    <groupId>com.acme</groupId>
    <artifactId>acme-parent</artifactId>
    <version>1.0.0</version>
  </parent>
  <artifactId>lib</artifactId>
  <properties>
    <lib.version>${base.version}</lib.version>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>widget</artifactId>
      <version>${lib.version}</version>
    </dependency>
  </dependencies>
</project>
"#,
    );
    let root = project.path();
    let result = scan(&root);
    let widget = find(&result.records, "org.example:widget", "lib/pom.xml", &root);
    assert_eq!(widget.current_version(), "1.0.0");

    let plan = UpgradePlanner::new(&result.index).plan(&[Selection::new(Arc::clone(widget), "2.0.0")]);

    assert!(plan.is_empty());
    assert_eq!(
        plan.skipped[0].reason,
        SkipReason::IndirectProperty("lib.version".to_string())
    );
    assert!(project
        .read_file("pom.xml")
        .contains("<lib.version>1.0.0</lib.version>"));
}
