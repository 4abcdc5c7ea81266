use crate::error::{PomupError, Result};
use crate::pom::PomFile;
use crate::utils::PathValidator;
use log::{debug, warn};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// ProjectScannerAgent validates the project layout and discovers the reactor.
pub struct ProjectScannerAgent {
    project_path: PathBuf,
}

impl ProjectScannerAgent {
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    /// Checks for a root `pom.xml` and a Maven wrapper.
    pub fn validate(&self) -> Result<ProjectInfo> {
        let project_path = PathValidator::validate_project_path(&self.project_path)?;

        let root_pom = project_path.join("pom.xml");
        if !root_pom.is_file() {
            return Err(PomupError::ProjectValidation(format!(
                "pom.xml not found in {}",
                project_path.display()
            )));
        }

        let wrapper = if cfg!(target_os = "windows") {
            project_path.join("mvnw.cmd")
        } else {
            project_path.join("mvnw")
        };

        Ok(ProjectInfo {
            root_pom,
            maven_wrapper: wrapper.is_file().then_some(wrapper),
            project_path,
        })
    }

    /// Loads the root POM and every module reachable through `<modules>`,
    /// root first. Modules that are missing, malformed or outside the project
    /// are skipped with a warning; cycles are ignored.
    pub fn discover_modules(&self, info: &ProjectInfo) -> Result<Vec<PomFile>> {
        let mut queue = VecDeque::from([info.root_pom.clone()]);
        let mut seen = HashSet::new();
        let mut poms = Vec::new();

        while let Some(path) = queue.pop_front() {
            let path = match PathValidator::validate_file_path(&path, &info.project_path) {
                Ok(path) => path,
                Err(e) if poms.is_empty() => return Err(e),
                Err(e) => {
                    warn!("Skipping module {}: {e}", path.display());
                    continue;
                }
            };

            if !seen.insert(path.clone()) {
                continue;
            }

            let pom = match PomFile::load(&path) {
                Ok(pom) => pom,
                Err(e) if poms.is_empty() => return Err(e),
                Err(e) => {
                    warn!("Skipping module {}: {e}", path.display());
                    continue;
                }
            };
            debug!(
                "Loaded {} ({}) with {} dependencies, {} modules",
                pom.display_name(),
                path.display(),
                pom.dependencies.len(),
                pom.modules.len()
            );

            for module in &pom.modules {
                queue.push_back(PathValidator::resolve_pom_reference(pom.directory(), module));
            }
            poms.push(pom);
        }

        Ok(poms)
    }
}

#[derive(Debug, Clone)]
pub struct ProjectInfo {
    pub project_path: PathBuf,
    pub root_pom: PathBuf,
    pub maven_wrapper: Option<PathBuf>,
}

impl ProjectInfo {
    pub fn has_maven_wrapper(&self) -> bool {
        self.maven_wrapper.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn module_pom(artifact: &str, modules: &[&str]) -> String {
        let modules: String = modules
            .iter()
            .map(|m| format!("<module>{m}</module>"))
            .collect();
        format!(
            "<project><groupId>g</groupId><artifactId>{artifact}</artifactId><modules>{modules}</modules></project>"
        )
    }

    #[test]
    fn validate_requires_root_pom() {
        let dir = tempdir().unwrap();
        let err = ProjectScannerAgent::new(dir.path()).validate().unwrap_err();
        assert!(matches!(err, PomupError::ProjectValidation(_)));

        fs::write(dir.path().join("pom.xml"), module_pom("root", &[])).unwrap();
        let info = ProjectScannerAgent::new(dir.path()).validate().unwrap();
        assert!(info.root_pom.ends_with("pom.xml"));
        assert!(!info.has_maven_wrapper());
    }

    #[test]
    fn discovers_nested_modules_and_ignores_cycles() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("pom.xml"), module_pom("root", &["core", "app", "missing"])).unwrap();
        fs::create_dir_all(root.join("core")).unwrap();
        fs::write(root.join("core/pom.xml"), module_pom("core", &[".."])).unwrap();
        fs::create_dir_all(root.join("app/web")).unwrap();
        fs::write(root.join("app/pom.xml"), module_pom("app", &["web"])).unwrap();
        fs::write(root.join("app/web/pom.xml"), module_pom("web", &[])).unwrap();

        let scanner = ProjectScannerAgent::new(root);
        let info = scanner.validate().unwrap();
        let poms = scanner.discover_modules(&info).unwrap();

        let names: Vec<_> = poms
            .iter()
            .map(|p| p.artifact_id.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["root", "core", "app", "web"]);
    }

    #[test]
    fn malformed_module_is_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("pom.xml"), module_pom("root", &["good", "bad"])).unwrap();
        fs::create_dir_all(root.join("good")).unwrap();
        fs::write(root.join("good/pom.xml"), module_pom("good", &[])).unwrap();
        fs::create_dir_all(root.join("bad")).unwrap();
        fs::write(
            root.join("bad/pom.xml"),
            "<project><artifactId>bad</artifactId><dependencies></project>",
        )
        .unwrap();

        let scanner = ProjectScannerAgent::new(root);
        let info = scanner.validate().unwrap();
        let poms = scanner.discover_modules(&info).unwrap();

        let names: Vec<_> = poms
            .iter()
            .map(|p| p.artifact_id.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["root", "good"]);
    }

    #[test]
    fn malformed_root_pom_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("pom.xml"), "<project><modules></project>").unwrap();

        let scanner = ProjectScannerAgent::new(dir.path());
        let info = scanner.validate().unwrap();
        assert!(scanner.discover_modules(&info).is_err());
    }

    #[test]
    fn modules_outside_the_project_are_skipped() {
        let outer = tempdir().unwrap();
        let project = outer.path().join("project");
        fs::create_dir_all(&project).unwrap();
        fs::create_dir_all(outer.path().join("sibling")).unwrap();
        fs::write(
            outer.path().join("sibling/pom.xml"),
            module_pom("sibling", &[]),
        )
        .unwrap();
        fs::write(project.join("pom.xml"), module_pom("root", &["../sibling"])).unwrap();

        let scanner = ProjectScannerAgent::new(&project);
        let info = scanner.validate().unwrap();
        let poms = scanner.discover_modules(&info).unwrap();
        assert_eq!(poms.len(), 1);
    }
}
