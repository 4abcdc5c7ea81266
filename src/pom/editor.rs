use crate::agents::upgrade_planner::{EditSite, UpgradeEdit, UpgradePlan};
use crate::error::{PomupError, Result};
use crate::model::property_reference;
use crate::pom::parser::{PomDeclaration, PomFile};
use crate::utils::PathValidator;
use log::{debug, info};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Outcome of applying a plan, one entry per file.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: Vec<(PathBuf, usize)>,
    pub failed: Vec<(PathBuf, String)>,
}

impl ApplyReport {
    pub fn applied_edits(&self) -> usize {
        self.applied.iter().map(|(_, count)| count).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes planned version edits back into `pom.xml` files.
///
/// Only the text between the targeted tags changes; everything else in the
/// file is preserved byte for byte.
pub struct PomEditor {
    project_root: PathBuf,
}

impl PomEditor {
    pub fn new<P: AsRef<Path>>(project_root: P) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    /// Applies every file's edits. A failing file does not stop the others.
    pub fn apply_plan(&self, plan: &UpgradePlan) -> ApplyReport {
        let mut report = ApplyReport::default();
        for (file, edits) in plan.by_file() {
            match self.apply(file, edits) {
                Ok(count) => report.applied.push((file.clone(), count)),
                Err(e) => report.failed.push((file.clone(), e.to_string())),
            }
        }
        report
    }

    /// Applies all `edits` to `file`, or none of them.
    pub fn apply(&self, file: &Path, edits: &[UpgradeEdit]) -> Result<usize> {
        let file = PathValidator::validate_file_path(file, &self.project_root)?;
        let content = fs::read_to_string(&file)?;
        let updated = rewrite(&file, &content, edits)?;

        if updated == content {
            debug!("{}: nothing to change", file.display());
            return Ok(0);
        }

        write_atomically(&file, &updated)?;
        info!("Updated {} ({} edit(s))", file.display(), edits.len());
        Ok(edits.len())
    }
}

/// Returns `content` with every edit applied. Fails without partial output if
/// any edit's site cannot be found.
pub fn rewrite(path: &Path, content: &str, edits: &[UpgradeEdit]) -> Result<String> {
    let pom = PomFile::parse(path, content)?;
    let mut replacements: Vec<(Range<usize>, &str)> = Vec::new();

    for edit in edits {
        let ranges = locate(&pom, edit);
        if ranges.is_empty() {
            return Err(PomupError::Edit(format!(
                "{}: {} '{}' not found",
                path.display(),
                edit.site,
                edit.target
            )));
        }
        replacements.extend(ranges.into_iter().map(|r| (r, edit.new_value.as_str())));
    }

    replacements.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    replacements.dedup_by(|a, b| a.0 == b.0);

    let mut output = content.to_string();
    for (range, value) in replacements {
        output.replace_range(range, value);
    }
    Ok(output)
}

fn locate(pom: &PomFile, edit: &UpgradeEdit) -> Vec<Range<usize>> {
    match edit.site {
        EditSite::DirectVersionTag => literal_version_ranges(&pom.dependencies, &edit.target),
        EditSite::ManagedVersionTag => literal_version_ranges(&pom.managed, &edit.target),
        EditSite::PropertyValue => pom
            .properties
            .iter()
            .filter(|(name, _)| *name == edit.target)
            .map(|(_, span)| span.range.clone())
            .collect(),
    }
}

fn literal_version_ranges(declarations: &[PomDeclaration], key: &str) -> Vec<Range<usize>> {
    declarations
        .iter()
        .filter(|d| d.coordinate.key() == key)
        .filter(|d| d.raw_version().is_some_and(|v| property_reference(v).is_none()))
        .filter_map(|d| d.version.as_ref().map(|span| span.range.clone()))
        .collect()
}

fn write_atomically(file: &Path, content: &str) -> Result<()> {
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pom.xml".to_string());
    let temp = file.with_file_name(format!(".{file_name}.pomup-tmp"));

    fs::write(&temp, content)?;
    if let Err(e) = fs::rename(&temp, file) {
        let _ = fs::remove_file(&temp);
        return Err(PomupError::Edit(format!(
            "Failed to replace {}: {e}",
            file.display()
        )));
    }
    Ok(())
}
