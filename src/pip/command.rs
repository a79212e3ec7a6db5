use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use std::process::Stdio;
use tokio::process::Command;

use super::{InstallOutcome, InstalledPackage, PackageManager};
use crate::requirements::RequirementSpec;

pub const DEFAULT_PIP: &str = "pip3";

/// Runs a pip executable as a child process.
#[derive(Debug, Clone)]
pub struct Pip {
    program: String,
    no_deps: bool,
    extra_args: Vec<String>,
}

impl Pip {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            no_deps: true,
            extra_args: Vec::new(),
        }
    }

    pub fn with_no_deps(mut self, no_deps: bool) -> Self {
        self.no_deps = no_deps;
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for installing `spec`, not including the program itself.
    pub fn install_args(&self, spec: &RequirementSpec) -> Vec<String> {
        let mut args = vec!["install".to_string()];
        if self.no_deps {
            args.push("--no-deps".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args.push(spec.as_str().to_string());
        args
    }
}

impl Default for Pip {
    fn default() -> Self {
        Self::new(DEFAULT_PIP)
    }
}

#[async_trait]
impl PackageManager for Pip {
    #[tracing::instrument(skip(self))]
    async fn install(&self, spec: &RequirementSpec) -> InstallOutcome {
        let args = self.install_args(spec);
        debug!("Running {} {}", self.program, args.join(" "));

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => InstallOutcome::Succeeded,
            Ok(status) => InstallOutcome::Failed {
                code: status.code(),
            },
            Err(e) => InstallOutcome::SpawnFailed(format!("{}: {}", self.program, e)),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn list_installed(&self) -> Result<Vec<InstalledPackage>> {
        let output = Command::new(&self.program)
            .args(["list", "--format=json"])
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            bail!(
                "{} list exited with {}",
                self.program,
                output
                    .status
                    .code()
                    .map_or_else(|| "a signal".to_string(), |c| format!("code {}", c))
            );
        }

        parse_pip_list(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the JSON printed by `pip list --format=json`.
pub(crate) fn parse_pip_list(json: &str) -> Result<Vec<InstalledPackage>> {
    let packages: Vec<InstalledPackage> =
        serde_json::from_str(json.trim()).context("Unexpected output from pip list")?;
    debug!("pip reports {} installed package(s)", packages.len());
    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(s: &str) -> RequirementSpec {
        s.parse().unwrap()
    }

    #[test]
    fn test_install_args_default_no_deps() {
        let pip = Pip::default();
        assert_eq!(pip.program(), "pip3");
        assert_eq!(
            pip.install_args(&spec("requests==2.31.0")),
            vec!["install", "--no-deps", "requests==2.31.0"]
        );
    }

    #[test]
    fn test_install_args_with_deps_and_extra_args() {
        let pip = Pip::new("/opt/venv/bin/pip")
            .with_no_deps(false)
            .with_extra_args(vec!["--index-url".into(), "https://mirror/simple".into()]);
        assert_eq!(
            pip.install_args(&spec("Flask")),
            vec!["install", "--index-url", "https://mirror/simple", "Flask"]
        );
    }

    #[test]
    fn test_install_args_keep_spec_as_single_argument() {
        let pip = Pip::default();
        let args = pip.install_args(&spec("pywin32==306; sys_platform == 'win32'"));
        assert_eq!(args.last().unwrap(), "pywin32==306; sys_platform == 'win32'");
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_parse_pip_list() {
        let json = r#"[{"name": "Flask", "version": "3.0.2"}, {"name": "six", "version": "1.16.0", "editable_project_location": "/src/six"}]"#;
        let packages = parse_pip_list(json).unwrap();
        assert_eq!(
            packages,
            vec![
                InstalledPackage { name: "Flask".into(), version: "3.0.2".into() },
                InstalledPackage { name: "six".into(), version: "1.16.0".into() },
            ]
        );
    }

    #[test]
    fn test_parse_pip_list_rejects_garbage() {
        let err = parse_pip_list("WARNING: not json").unwrap_err();
        assert!(err.to_string().contains("pip list"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_reports_exit_status() {
        assert_eq!(
            Pip::new("true").install(&spec("anything")).await,
            InstallOutcome::Succeeded
        );
        assert_eq!(
            Pip::new("false").install(&spec("anything")).await,
            InstallOutcome::Failed { code: Some(1) }
        );
    }

    #[tokio::test]
    async fn test_install_reports_spawn_failure() {
        let outcome = Pip::new("/definitely/not/a/pip3")
            .install(&spec("anything"))
            .await;
        match outcome {
            InstallOutcome::SpawnFailed(msg) => assert!(msg.contains("/definitely/not/a/pip3")),
            other => panic!("expected SpawnFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_installed_fails_on_non_zero_exit() {
        let err = Pip::new("false").list_installed().await.unwrap_err();
        assert!(err.to_string().contains("false list exited with code 1"));
    }
}
