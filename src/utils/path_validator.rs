use crate::error::{PomupError, Result};
use std::path::{Path, PathBuf};

/// Path checks applied before anything is read from or written to disk.
pub struct PathValidator;

impl PathValidator {
    /// Canonicalises the project directory and refuses system locations.
    pub fn validate_project_path(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| {
            PomupError::ProjectValidation(format!("Invalid path '{}': {e}", path.display()))
        })?;

        if !canonical.is_dir() {
            return Err(PomupError::ProjectValidation(format!(
                "Path '{}' is not a directory",
                canonical.display()
            )));
        }

        const FORBIDDEN: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

        for forbidden in FORBIDDEN {
            let forbidden_path = Path::new(forbidden);
            let blocked = canonical.starts_with(forbidden_path)
                || forbidden_path
                    .canonicalize()
                    .is_ok_and(|resolved| canonical.starts_with(resolved));

            if blocked {
                return Err(PomupError::ProjectValidation(format!(
                    "Access to system directory '{forbidden}' is not allowed"
                )));
            }
        }

        Ok(canonical)
    }

    /// Canonicalises `file_path` and ensures it lies under `base_dir`.
    pub fn validate_file_path(
        file_path: impl AsRef<Path>,
        base_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let file_path = file_path.as_ref();
        let base_dir = base_dir.as_ref();

        let canonical_file = file_path.canonicalize().map_err(|e| {
            PomupError::ProjectValidation(format!(
                "Invalid file path '{}': {e}",
                file_path.display()
            ))
        })?;

        let canonical_base = base_dir.canonicalize().map_err(|e| {
            PomupError::ProjectValidation(format!(
                "Invalid base directory '{}': {e}",
                base_dir.display()
            ))
        })?;

        if !canonical_file.starts_with(&canonical_base) {
            return Err(PomupError::ProjectValidation(format!(
                "'{}' is outside the project directory",
                canonical_file.display()
            )));
        }

        Ok(canonical_file)
    }

    /// Resolves a `<module>` or `<relativePath>` entry against the directory of
    /// the POM that names it. Directories resolve to their `pom.xml`.
    pub fn resolve_pom_reference(pom_dir: &Path, reference: &str) -> PathBuf {
        let candidate = pom_dir.join(reference.trim());
        if candidate.is_dir() {
            candidate.join("pom.xml")
        } else {
            candidate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn validate_project_path_accepts_directory() {
        let dir = tempdir().unwrap();
        assert!(PathValidator::validate_project_path(dir.path()).is_ok());
    }

    #[test]
    fn validate_project_path_rejects_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("pom.xml");
        fs::write(&file_path, "<project/>").unwrap();
        let err = PathValidator::validate_project_path(&file_path).unwrap_err();
        assert!(matches!(err, PomupError::ProjectValidation(_)));
    }

    #[test]
    fn validate_project_path_rejects_system_directory() {
        assert!(PathValidator::validate_project_path("/etc").is_err());
    }

    #[test]
    fn validate_file_path_rejects_outside_files() {
        let base = tempdir().unwrap();
        let other = tempdir().unwrap();
        let outside = other.path().join("pom.xml");
        fs::write(&outside, "<project/>").unwrap();
        assert!(PathValidator::validate_file_path(&outside, base.path()).is_err());
    }

    #[test]
    fn module_references_resolve_to_pom_files() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("core")).unwrap();

        assert_eq!(
            PathValidator::resolve_pom_reference(dir.path(), "core"),
            dir.path().join("core").join("pom.xml")
        );
        assert_eq!(
            PathValidator::resolve_pom_reference(dir.path(), "build/alt-pom.xml"),
            dir.path().join("build/alt-pom.xml")
        );
    }
}
