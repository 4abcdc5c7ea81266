use crate::maven::version::{UpdateKind, VersionComparator};
use crate::model::DependencyRecord;
use crate::repository::Coordinate;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where in a project descriptor a version is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EditSite {
    /// `<version>` of a `<dependencies>` entry.
    DirectVersionTag,
    /// `<version>` of a `<dependencyManagement>` entry.
    ManagedVersionTag,
    /// An entry under `<properties>`.
    PropertyValue,
}

impl fmt::Display for EditSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EditSite::DirectVersionTag => "dependency",
            EditSite::ManagedVersionTag => "managed dependency",
            EditSite::PropertyValue => "property",
        };
        f.write_str(label)
    }
}

/// A declarative instruction for the file-editing collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeEdit {
    pub declaring_file: PathBuf,
    pub site: EditSite,
    /// `group:artifact` for tag edits, the property name for property edits.
    pub target: String,
    pub new_value: String,
}

/// How a descriptor defines a `<properties>` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyDefinition {
    /// A plain value that can be overwritten.
    Literal,
    /// Empty, or built from other properties.
    Indirect,
}

/// Declaration sites found in one descriptor.
#[derive(Debug, Clone, Default)]
pub struct FileDeclarations {
    /// Direct dependencies carrying a `<version>` tag.
    pub direct_versioned: HashSet<Coordinate>,
    /// Managed dependencies whose `<version>` is a literal.
    pub managed_literal: HashSet<Coordinate>,
    /// Names this file defines under `<properties>`.
    pub properties: HashMap<String, PropertyDefinition>,
    /// The in-project parent descriptor, if any.
    pub parent: Option<PathBuf>,
}

/// Per-file declaration sites for the whole project.
#[derive(Debug, Clone, Default)]
pub struct DeclarationIndex {
    files: HashMap<PathBuf, FileDeclarations>,
}

impl DeclarationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: impl Into<PathBuf>, declarations: FileDeclarations) {
        self.files.insert(file.into(), declarations);
    }

    pub fn get(&self, file: &Path) -> Option<&FileDeclarations> {
        self.files.get(file)
    }

    /// The nearest file, walking up the in-project parent chain from `file`,
    /// that defines property `name`, with how it defines it. A child's
    /// definition shadows every ancestor's.
    pub fn property_owner(&self, file: &Path, name: &str) -> Option<(&Path, PropertyDefinition)> {
        let mut current = Some(file);
        let mut seen = HashSet::new();
        while let Some(path) = current {
            if !seen.insert(path.to_path_buf()) {
                break;
            }
            let (key, declarations) = self.files.get_key_value(path)?;
            if let Some(definition) = declarations.properties.get(name) {
                return Some((key.as_path(), *definition));
            }
            current = declarations.parent.as_deref();
        }
        None
    }
}

/// A user-chosen upgrade.
#[derive(Debug, Clone)]
pub struct Selection {
    pub record: Arc<DependencyRecord>,
    pub new_version: String,
}

impl Selection {
    pub fn new(record: Arc<DependencyRecord>, new_version: impl Into<String>) -> Self {
        Self {
            record,
            new_version: new_version.into(),
        }
    }

    /// Select the record's fetched latest version, if there is one.
    pub fn to_latest(record: &Arc<DependencyRecord>) -> Option<Self> {
        let latest = record.latest_version()?;
        Some(Self::new(Arc::clone(record), latest))
    }
}

/// Why a selection produced no edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The chosen version is not newer than the current one.
    NotNewer,
    /// `${project.*}`-style built-ins have no `<properties>` entry to rewrite.
    BuiltInProperty(String),
    /// No file in the in-project parent chain defines the property.
    PropertyNotDefined(String),
    /// The nearest definition of the property is not a plain value.
    IndirectProperty(String),
    /// The version is inherited from a descriptor other than the declaring one.
    InheritedVersion,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotNewer => f.write_str("already up to date"),
            SkipReason::BuiltInProperty(name) => write!(f, "built-in property ${{{name}}}"),
            SkipReason::PropertyNotDefined(name) => {
                write!(f, "property '{name}' is not defined in the project")
            }
            SkipReason::IndirectProperty(name) => {
                write!(f, "property '{name}' is not a literal value")
            }
            SkipReason::InheritedVersion => f.write_str("version is inherited from a parent"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedSelection {
    pub key: String,
    pub declaring_file: PathBuf,
    pub reason: SkipReason,
}

/// Edits grouped by the file they apply to.
#[derive(Debug, Clone, Default)]
pub struct UpgradePlan {
    by_file: BTreeMap<PathBuf, Vec<UpgradeEdit>>,
    pub skipped: Vec<SkippedSelection>,
}

impl UpgradePlan {
    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }

    pub fn by_file(&self) -> &BTreeMap<PathBuf, Vec<UpgradeEdit>> {
        &self.by_file
    }

    pub fn edits(&self) -> Vec<UpgradeEdit> {
        self.by_file.values().flatten().cloned().collect()
    }

    pub fn total_edits(&self) -> usize {
        self.by_file.values().map(Vec::len).sum()
    }

    /// Add an edit, merging with an existing edit of the same site. When two
    /// selections disagree on a shared site the newer version wins.
    fn push(&mut self, edit: UpgradeEdit) {
        let edits = self.by_file.entry(edit.declaring_file.clone()).or_default();
        match edits
            .iter_mut()
            .find(|e| e.site == edit.site && e.target == edit.target)
        {
            Some(existing) if existing.new_value == edit.new_value => {}
            Some(existing) => {
                warn!(
                    "Conflicting upgrades for {} '{}': {} vs {}",
                    edit.site, edit.target, existing.new_value, edit.new_value
                );
                if VersionComparator::is_newer(&edit.new_value, &existing.new_value) {
                    existing.new_value = edit.new_value;
                }
            }
            None => edits.push(edit),
        }
    }
}

fn is_built_in_property(name: &str) -> bool {
    name.starts_with("project.") || name.starts_with("pom.")
}

/// Turns chosen upgrades into declaration-site edits. Pure: no I/O.
pub struct UpgradePlanner<'a> {
    index: &'a DeclarationIndex,
}

impl<'a> UpgradePlanner<'a> {
    pub fn new(index: &'a DeclarationIndex) -> Self {
        Self { index }
    }

    pub fn plan(&self, selections: &[Selection]) -> UpgradePlan {
        let mut plan = UpgradePlan::default();

        for selection in selections {
            let record = &selection.record;
            match self.plan_selection(record, &selection.new_version) {
                Ok(edits) => edits.into_iter().for_each(|edit| plan.push(edit)),
                Err(reason) => {
                    debug!("Skipping {record}: {reason}");
                    plan.skipped.push(SkippedSelection {
                        key: record.key(),
                        declaring_file: record.declaring_file().to_path_buf(),
                        reason,
                    });
                }
            }
        }

        plan
    }

    fn plan_selection(
        &self,
        record: &DependencyRecord,
        new_version: &str,
    ) -> Result<Vec<UpgradeEdit>, SkipReason> {
        if VersionComparator::classify(record.current_version(), new_version)
            == UpdateKind::UpToDate
        {
            return Err(SkipReason::NotNewer);
        }

        let file = record.declaring_file();

        // A property-backed version moves through its property only; the tag
        // keeps pointing at the property.
        if let Some(name) = record.property_name() {
            if is_built_in_property(name) {
                return Err(SkipReason::BuiltInProperty(name.to_string()));
            }
            let (owner, definition) = self
                .index
                .property_owner(file, name)
                .ok_or_else(|| SkipReason::PropertyNotDefined(name.to_string()))?;
            if definition == PropertyDefinition::Indirect {
                return Err(SkipReason::IndirectProperty(name.to_string()));
            }
            return Ok(vec![UpgradeEdit {
                declaring_file: owner.to_path_buf(),
                site: EditSite::PropertyValue,
                target: name.to_string(),
                new_value: new_version.to_string(),
            }]);
        }

        let mut edits = Vec::new();
        if let Some(declarations) = self.index.get(file) {
            let coordinate = record.coordinate();
            if declarations.direct_versioned.contains(coordinate) {
                edits.push(UpgradeEdit {
                    declaring_file: file.to_path_buf(),
                    site: EditSite::DirectVersionTag,
                    target: coordinate.key(),
                    new_value: new_version.to_string(),
                });
            }
            if declarations.managed_literal.contains(coordinate) {
                edits.push(UpgradeEdit {
                    declaring_file: file.to_path_buf(),
                    site: EditSite::ManagedVersionTag,
                    target: coordinate.key(),
                    new_value: new_version.to_string(),
                });
            }
        }

        if edits.is_empty() {
            return Err(SkipReason::InheritedVersion);
        }
        Ok(edits)
    }
}
