use crate::error::{PomupError, Result};
use crate::pom::PomFile;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const OUTPUT_FILE: &str = "pomup-dependencies.txt";

/// Effective `group:artifact -> version` maps, keyed by the module's `pom.xml`.
pub type EffectiveVersions = HashMap<PathBuf, HashMap<String, String>>;

/// MavenExecutionAgent asks Maven itself for each module's resolved versions.
pub struct MavenExecutionAgent {
    executable: PathBuf,
    project_path: PathBuf,
}

impl MavenExecutionAgent {
    /// Uses the wrapper when the project has one, `mvn` from `PATH` otherwise.
    pub fn new<P: AsRef<Path>>(project_path: P, wrapper: Option<&Path>) -> Self {
        let executable = match wrapper {
            Some(wrapper) => wrapper.to_path_buf(),
            None if cfg!(target_os = "windows") => PathBuf::from("mvn.cmd"),
            None => PathBuf::from("mvn"),
        };
        Self {
            executable,
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    /// Runs `dependency:list` across the reactor and reads back one report per
    /// module. Modules without a report get no entry.
    pub fn resolve_effective_versions(&self, modules: &[PomFile]) -> Result<EffectiveVersions> {
        let output_arg = format!("-DoutputFile={OUTPUT_FILE}");
        self.execute_maven_command(&[
            "-q",
            "-B",
            "dependency:list",
            &output_arg,
            "-DappendOutput=false",
            "-DexcludeTransitive=true",
        ])?;

        let mut resolved = HashMap::new();
        for module in modules {
            let report = module.directory().join(OUTPUT_FILE);
            let Ok(content) = fs::read_to_string(&report) else {
                debug!("No dependency report for {}", module.path.display());
                continue;
            };
            if let Err(e) = fs::remove_file(&report) {
                warn!("Could not remove {}: {e}", report.display());
            }
            resolved.insert(module.path.clone(), parse_dependency_list(&content));
        }

        info!("Maven resolved versions for {} module(s)", resolved.len());
        Ok(resolved)
    }

    fn execute_maven_command(&self, args: &[&str]) -> Result<()> {
        info!("Executing: {} {}", self.executable.display(), args.join(" "));

        let mut child = Command::new(&self.executable)
            .current_dir(&self.project_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| PomupError::MavenExecution(format!("Failed to spawn Maven: {e}")))?;

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(|line| line.ok()) {
                debug!("mvn: {line}");
            }
        }

        let status = child
            .wait()
            .map_err(|e| PomupError::MavenExecution(format!("Failed to wait for Maven: {e}")))?;

        if !status.success() {
            return Err(PomupError::MavenExecution(format!(
                "Maven exited with code {}",
                status.code().unwrap_or(-1)
            )));
        }

        Ok(())
    }
}

/// Parses `dependency:list` output lines of the form
/// `group:artifact:type[:classifier]:version:scope`.
pub fn parse_dependency_list(content: &str) -> HashMap<String, String> {
    let mut versions = HashMap::new();

    for line in content.lines() {
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        let parts: Vec<&str> = token.split(':').collect();
        if parts.len() < 5 || parts.iter().any(|p| p.is_empty()) {
            continue;
        }
        let version = parts[parts.len() - 2];
        versions
            .entry(format!("{}:{}", parts[0], parts[1]))
            .or_insert_with(|| version.to_string());
    }

    versions
}
