use crate::agents::upgrade_planner::{EditSite, Selection, SkippedSelection, UpgradePlan};
use crate::pom::ApplyReport;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Tracks what an upgrade run changed
#[derive(Debug, Clone, Default)]
pub struct UpgradeReport {
    /// `group:artifact` -> (old version, new version)
    pub dependency_updates: BTreeMap<String, (String, String)>,
    /// Property name -> new value
    pub property_updates: BTreeMap<String, String>,
    /// Files written and the number of edits in each
    pub files: Vec<(PathBuf, usize)>,
    pub skipped: Vec<SkippedSelection>,
    /// Files left untouched because an edit could not be applied
    pub failed: Vec<(PathBuf, String)>,
}

impl UpgradeReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combines the selections, the plan built from them, and the outcome of
    /// writing it.
    pub fn from_outcome(selections: &[Selection], plan: &UpgradePlan, applied: ApplyReport) -> Self {
        let failed_files: HashSet<&PathBuf> = applied.failed.iter().map(|(file, _)| file).collect();
        let skipped: HashSet<(&str, &PathBuf)> = plan
            .skipped
            .iter()
            .map(|s| (s.key.as_str(), &s.declaring_file))
            .collect();

        let mut report = Self::new();

        for selection in selections {
            let record = &selection.record;
            let key = record.key();
            let file = record.declaring_file().to_path_buf();
            if skipped.contains(&(key.as_str(), &file)) {
                continue;
            }
            let target_file = match record.property_name() {
                Some(name) => plan
                    .by_file()
                    .iter()
                    .find(|(_, edits)| {
                        edits
                            .iter()
                            .any(|e| e.site == EditSite::PropertyValue && e.target == name)
                    })
                    .map(|(path, _)| path),
                None => Some(&file),
            };
            if target_file.is_some_and(|path| failed_files.contains(path)) {
                continue;
            }
            report.dependency_updates.insert(
                key,
                (
                    record.current_version().to_string(),
                    selection.new_version.clone(),
                ),
            );
        }

        for (file, edits) in plan.by_file() {
            if failed_files.contains(file) {
                continue;
            }
            for edit in edits.iter().filter(|e| e.site == EditSite::PropertyValue) {
                report
                    .property_updates
                    .insert(edit.target.clone(), edit.new_value.clone());
            }
        }

        report.files = applied.applied;
        report.failed = applied.failed;
        report.skipped = plan.skipped.clone();
        report
    }

    pub fn is_empty(&self) -> bool {
        self.dependency_updates.is_empty() && self.property_updates.is_empty()
    }

    pub fn total_updates(&self) -> usize {
        self.dependency_updates.len()
    }

    pub fn files_written(&self) -> usize {
        self.files.iter().filter(|(_, count)| *count > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::upgrade_planner::{DeclarationIndex, FileDeclarations, UpgradePlanner};
    use crate::model::DependencyRecord;
    use crate::repository::Coordinate;
    use std::sync::Arc;

    fn record(artifact: &str, version: &str, file: &str) -> Arc<DependencyRecord> {
        Arc::new(DependencyRecord::new(
            Coordinate::new("g", artifact),
            version,
            version,
            None,
            file,
        ))
    }

    #[test]
    fn report_excludes_skipped_and_failed_files() {
        let mut index = DeclarationIndex::new();
        for file in ["a/pom.xml", "b/pom.xml"] {
            let mut declarations = FileDeclarations::default();
            declarations.direct_versioned.insert(Coordinate::new("g", "x"));
            declarations.direct_versioned.insert(Coordinate::new("g", "y"));
            index.insert(file, declarations);
        }

        let selections = vec![
            Selection::new(record("x", "1.0", "a/pom.xml"), "1.1"),
            Selection::new(record("y", "2.0", "b/pom.xml"), "2.1"),
            Selection::new(record("x", "1.0", "b/pom.xml"), "1.0"),
        ];
        let plan = UpgradePlanner::new(&index).plan(&selections);
        assert_eq!(plan.skipped.len(), 1);

        let applied = ApplyReport {
            applied: vec![(PathBuf::from("a/pom.xml"), 1)],
            failed: vec![(PathBuf::from("b/pom.xml"), "boom".to_string())],
        };
        let report = UpgradeReport::from_outcome(&selections, &plan, applied);

        assert_eq!(report.total_updates(), 1);
        assert_eq!(
            report.dependency_updates["g:x"],
            ("1.0".to_string(), "1.1".to_string())
        );
        assert_eq!(report.files_written(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.skipped.len(), 1);
    }
}
