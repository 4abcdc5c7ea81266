use crate::agents::maven_execution::EffectiveVersions;
use crate::agents::upgrade_planner::{DeclarationIndex, FileDeclarations, PropertyDefinition};
use crate::agents::version_resolver::VersionResolver;
use crate::maven::RemoteRepository;
use crate::maven::repository::validate_repository_url;
use crate::model::{DependencyRecord, property_reference};
use crate::pom::PomFile;
use crate::utils::PathValidator;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

static PROPERTY_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid property pattern"));

const MAX_INTERPOLATION_DEPTH: usize = 10;
const DEFAULT_PARENT_PATH: &str = "../pom.xml";

/// A declaration that could not be turned into a record.
#[derive(Debug, Clone)]
pub struct UnresolvedDeclaration {
    pub key: String,
    pub declaring_file: PathBuf,
}

/// Everything a scan produces.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Sorted by group, artifact, then declaring file.
    pub records: Vec<Arc<DependencyRecord>>,
    pub index: DeclarationIndex,
    /// Repositories declared across the project, validated and deduplicated.
    pub repositories: Vec<RemoteRepository>,
    pub unresolved: Vec<UnresolvedDeclaration>,
    /// Records whose property reference could not be resolved.
    pub degraded: usize,
    pub module_count: usize,
}

/// Turns the project's POM files into dependency records.
pub struct DependencyScanner {
    project_path: PathBuf,
    maven_versions: EffectiveVersions,
}

impl DependencyScanner {
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            maven_versions: EffectiveVersions::new(),
        }
    }

    /// Versions reported by Maven take precedence over the locally computed
    /// managed versions.
    pub fn with_maven_versions(mut self, versions: EffectiveVersions) -> Self {
        self.maven_versions = versions;
        self
    }

    pub fn scan(&self, modules: Vec<PomFile>) -> ScanResult {
        let reactor: Vec<PathBuf> = modules.iter().map(|pom| pom.path.clone()).collect();
        let model = ProjectModel::build(&self.project_path, modules);

        let mut result = ScanResult {
            module_count: reactor.len(),
            ..ScanResult::default()
        };
        let mut seen = HashSet::new();

        for path in &reactor {
            let Some(pom) = model.poms.get(path) else {
                continue;
            };
            let symbols = model.symbols(path);
            let mut effective = model.managed_versions(path, &symbols);
            if let Some(reported) = self.maven_versions.get(path) {
                effective.extend(reported.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            let resolver = VersionResolver::new(&symbols, &effective);

            for declaration in &pom.dependencies {
                let key = declaration.coordinate.key();
                if !seen.insert((key.clone(), path.clone())) {
                    debug!("{key} declared twice in {}, keeping the first", path.display());
                    continue;
                }

                let Some(resolved) =
                    resolver.resolve(&declaration.coordinate, declaration.raw_version())
                else {
                    warn!("Skipping {key} in {}: no resolvable version", path.display());
                    result.unresolved.push(UnresolvedDeclaration {
                        key,
                        declaring_file: path.clone(),
                    });
                    continue;
                };

                if resolved.is_degraded() {
                    result.degraded += 1;
                }

                result.records.push(Arc::new(DependencyRecord::new(
                    declaration.coordinate.clone(),
                    resolved.version,
                    resolved.expression,
                    declaration.scope.as_deref(),
                    path.clone(),
                )));
            }
        }

        result.records.sort_by(|a, b| {
            (a.group(), a.artifact(), a.declaring_file())
                .cmp(&(b.group(), b.artifact(), b.declaring_file()))
        });
        result.index = model.declaration_index();
        result.repositories = model.repositories(&reactor);

        info!(
            "Scanned {} module(s): {} dependencies, {} unresolved",
            result.module_count,
            result.records.len(),
            result.unresolved.len()
        );
        result
    }
}

/// Loaded POMs plus their in-project parent links.
struct ProjectModel {
    poms: HashMap<PathBuf, PomFile>,
    parents: HashMap<PathBuf, PathBuf>,
}

impl ProjectModel {
    /// Links every POM to its parent, loading parents that live inside the
    /// project but outside the reactor.
    fn build(project_path: &Path, modules: Vec<PomFile>) -> Self {
        let mut poms: HashMap<PathBuf, PomFile> =
            modules.into_iter().map(|pom| (pom.path.clone(), pom)).collect();
        let mut parents = HashMap::new();
        let mut pending: Vec<PathBuf> = poms.keys().cloned().collect();

        while let Some(path) = pending.pop() {
            let Some(pom) = poms.get(&path) else {
                continue;
            };
            let Some(parent_path) = local_parent_path(project_path, pom) else {
                continue;
            };

            if !poms.contains_key(&parent_path) {
                match PomFile::load(&parent_path) {
                    Ok(parent) => {
                        poms.insert(parent_path.clone(), parent);
                        pending.push(parent_path.clone());
                    }
                    Err(e) => {
                        warn!("Ignoring parent of {}: {e}", path.display());
                        continue;
                    }
                }
            }

            if is_declared_parent(&poms[&path], &poms[&parent_path]) {
                parents.insert(path, parent_path);
            } else {
                debug!(
                    "{} does not match the parent declared by {}",
                    parent_path.display(),
                    path.display()
                );
            }
        }

        Self { poms, parents }
    }

    /// `path` and its ancestors, root-most first.
    fn chain(&self, path: &Path) -> Vec<&PomFile> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(path);
        while let Some(p) = current {
            if !seen.insert(p) {
                break;
            }
            let Some(pom) = self.poms.get(p) else {
                break;
            };
            chain.push(pom);
            current = self.parents.get(p).map(PathBuf::as_path);
        }
        chain.reverse();
        chain
    }

    /// Inherited `<properties>` plus `project.*` built-ins, interpolated.
    fn symbols(&self, path: &Path) -> HashMap<String, String> {
        let mut symbols = HashMap::new();
        for pom in self.chain(path) {
            symbols.extend(pom.property_map());
        }

        if let Some(pom) = self.poms.get(path) {
            let mut built_ins = Vec::new();
            if let Some(group) = pom.effective_group_id() {
                built_ins.push(("groupId", group.to_string()));
            }
            if let Some(artifact) = &pom.artifact_id {
                built_ins.push(("artifactId", artifact.clone()));
            }
            if let Some(version) = pom.effective_version() {
                built_ins.push(("version", version.to_string()));
            }
            if let Some(parent) = &pom.parent {
                if let Some(version) = &parent.version {
                    built_ins.push(("parent.version", version.clone()));
                }
                if let Some(group) = &parent.group_id {
                    built_ins.push(("parent.groupId", group.clone()));
                }
            }
            for (name, value) in built_ins {
                symbols.insert(format!("project.{name}"), value.clone());
                symbols.insert(format!("pom.{name}"), value);
            }
        }

        let raw = symbols.clone();
        for value in symbols.values_mut() {
            *value = interpolate(value, &raw);
        }
        symbols
    }

    /// Managed versions inherited along the chain, keyed by `group:artifact`.
    /// Only versions that interpolate to plain text are kept.
    fn managed_versions(
        &self,
        path: &Path,
        symbols: &HashMap<String, String>,
    ) -> HashMap<String, String> {
        let mut managed = HashMap::new();
        for pom in self.chain(path) {
            for declaration in &pom.managed {
                let Some(raw) = declaration.raw_version() else {
                    continue;
                };
                let version = interpolate(raw, symbols);
                if !version.contains("${") {
                    managed.insert(declaration.coordinate.key(), version);
                }
            }
        }
        managed
    }

    fn declaration_index(&self) -> DeclarationIndex {
        let mut index = DeclarationIndex::new();
        for (path, pom) in &self.poms {
            let declarations = FileDeclarations {
                direct_versioned: pom
                    .dependencies
                    .iter()
                    .filter(|d| d.raw_version().is_some())
                    .map(|d| d.coordinate.clone())
                    .collect(),
                managed_literal: pom
                    .managed
                    .iter()
                    .filter(|d| d.raw_version().is_some_and(|v| property_reference(v).is_none()))
                    .map(|d| d.coordinate.clone())
                    .collect(),
                properties: pom
                    .properties
                    .iter()
                    .map(|(name, span)| {
                        let definition = if span.text.is_empty() || span.text.contains("${") {
                            PropertyDefinition::Indirect
                        } else {
                            PropertyDefinition::Literal
                        };
                        (name.clone(), definition)
                    })
                    .collect(),
                parent: self.parents.get(path).cloned(),
            };
            index.insert(path.clone(), declarations);
        }
        index
    }

    /// Repositories in reactor order, first declaration wins.
    fn repositories(&self, reactor: &[PathBuf]) -> Vec<RemoteRepository> {
        let mut repositories: Vec<RemoteRepository> = Vec::new();
        for pom in reactor.iter().filter_map(|path| self.poms.get(path)) {
            for repository in &pom.repositories {
                if repositories.iter().any(|r| r.url == repository.url) {
                    continue;
                }
                match validate_repository_url(&repository.url) {
                    Ok(()) => repositories.push(repository.clone()),
                    Err(e) => warn!("Ignoring repository '{}': {e}", repository.id),
                }
            }
        }
        repositories
    }
}

/// The parent's path when it lives inside the project, per `<relativePath>`
/// (default `../pom.xml`). An empty `<relativePath>` disables the lookup.
fn local_parent_path(project_path: &Path, pom: &PomFile) -> Option<PathBuf> {
    let parent = pom.parent.as_ref()?;
    let relative = parent.relative_path.as_deref().unwrap_or(DEFAULT_PARENT_PATH);
    if relative.trim().is_empty() {
        return None;
    }
    let candidate = PathValidator::resolve_pom_reference(pom.directory(), relative);
    PathValidator::validate_file_path(&candidate, project_path).ok()
}

fn is_declared_parent(child: &PomFile, candidate: &PomFile) -> bool {
    let Some(declared) = &child.parent else {
        return false;
    };
    let artifact_matches = declared.artifact_id.is_none()
        || declared.artifact_id.as_deref() == candidate.artifact_id.as_deref();
    let group_matches = match (declared.group_id.as_deref(), candidate.effective_group_id()) {
        (Some(declared), Some(actual)) => declared == actual,
        _ => true,
    };
    artifact_matches && group_matches
}

/// Replaces `${name}` references found in `symbols`, repeatedly, leaving
/// unknown references in place.
pub fn interpolate(text: &str, symbols: &HashMap<String, String>) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_INTERPOLATION_DEPTH {
        if !current.contains("${") {
            break;
        }
        let next = PROPERTY_REF
            .replace_all(&current, |caps: &regex::Captures| {
                symbols
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}
