#![allow(dead_code)]

use async_trait::async_trait;
use pomup::Result;
use pomup::maven::VersionComparator;
use pomup::repository::{Coordinate, RepositoryClient};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a temporary Maven project
pub struct TempProject {
    pub dir: TempDir,
}

impl TempProject {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        Self { dir }
    }

    /// Canonical project root, matching the paths the scanner reports.
    pub fn path(&self) -> PathBuf {
        self.dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp directory")
    }

    pub fn create_file(&self, relative_path: &str, content: &str) {
        let file_path = self.dir.path().join(relative_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&file_path, content).expect("Failed to write file");
    }

    pub fn file_path(&self, relative_path: &str) -> PathBuf {
        self.path().join(relative_path)
    }

    pub fn read_file(&self, relative_path: &str) -> String {
        fs::read_to_string(self.file_path(relative_path)).expect("Failed to read file")
    }

    /// Root aggregator plus `core` and `app` modules.
    pub fn multi_module() -> Self {
        let project = Self::new();
        project.create_file("pom.xml", ROOT_POM);
        project.create_file("core/pom.xml", CORE_POM);
        project.create_file("app/pom.xml", APP_POM);
        project
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}

pub const ROOT_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.acme</groupId>
  <artifactId>acme-parent</artifactId>
  <version>1.0.0</version>
  <packaging>pom</packaging>

  <modules>
    <module>core</module>
    <module>app</module>
  </modules>

  <properties>
    <jackson.version>2.15.2</jackson.version>
  </properties>

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
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13.2</version>
      <scope>test</scope>
    </dependency>
  </dependencies>
</project>
"#;

pub const CORE_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>com.acme</groupId>
    <artifactId>acme-parent</artifactId>
    <version>1.0.0</version>
  </parent>
  <artifactId>core</artifactId>

  <dependencies>
    <dependency>
      <groupId>com.fasterxml.jackson.core</groupId>
      <artifactId>jackson-databind</artifactId>
      <version>${jackson.version}</version>
    </dependency>
    <dependency>
      <groupId>org.slf4j</groupId>
      <artifactId>slf4j-api</artifactId>
    </dependency>
    <dependency>
      <groupId>org.apache.commons</groupId>
      <artifactId>commons-lang3</artifactId>
      <version>3.12.0</version>
    </dependency>
  </dependencies>
</project>
"#;

pub const APP_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>com.acme</groupId>
    <artifactId>acme-parent</artifactId>
    <version>1.0.0</version>
  </parent>
  <artifactId>app</artifactId>

  <dependencies>
    <dependency>
      <groupId>com.acme</groupId>
      <artifactId>core</artifactId>
      <version>${project.version}</version>
    </dependency>
    <dependency>
      <groupId>com.fasterxml.jackson.core</groupId>
      <artifactId>jackson-annotations</artifactId>
      <version>${jackson.version}</version>
    </dependency>
    <dependency>
      <groupId>org.apache.commons</groupId>
      <artifactId>commons-lang3</artifactId>
      <version>3.12.0</version>
    </dependency>
  </dependencies>
</project>
"#;

/// In-memory repository with fixed version lists.
pub struct FakeRepository {
    versions: HashMap<String, Vec<String>>,
}

impl FakeRepository {
    pub fn new(entries: &[(&str, &[&str])]) -> Self {
        let versions = entries
            .iter()
            .map(|(key, list)| (key.to_string(), list.iter().map(|v| v.to_string()).collect()))
            .collect();
        Self { versions }
    }

    /// Published versions for every dependency of the sample project.
    pub fn for_sample_project() -> Self {
        Self::new(&[
            (
                "com.fasterxml.jackson.core:jackson-databind",
                &["2.15.2", "2.16.0", "2.17.1", "2.18.0-rc1"],
            ),
            (
                "com.fasterxml.jackson.core:jackson-annotations",
                &["2.15.2", "2.16.0", "2.17.1", "2.18.0-rc1"],
            ),
            ("org.slf4j:slf4j-api", &["2.0.9", "2.0.13", "2.1.0-alpha1"]),
            ("junit:junit", &["4.12", "4.13.2"]),
            ("org.apache.commons:commons-lang3", &["3.12.0", "3.14.0"]),
        ])
    }
}

#[async_trait]
impl RepositoryClient for FakeRepository {
    async fn fetch_available_versions(&self, coordinate: &Coordinate) -> Result<Vec<String>> {
        Ok(self
            .versions
            .get(&coordinate.key())
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_latest_stable(&self, coordinate: &Coordinate) -> Result<Option<String>> {
        let versions = self.fetch_available_versions(coordinate).await?;
        Ok(VersionComparator::latest_stable(&versions))
    }
}

pub fn relative(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .replace('\\', "/")
}
