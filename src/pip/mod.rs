//! The external package installer.
//!
//! [`PackageManager`] is the seam between the batch logic and the actual
//! `pip3` process, so dispatch and version checks can be tested without
//! spawning anything.

mod command;

pub use command::{DEFAULT_PIP, Pip};

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::requirements::RequirementSpec;

/// How a single installer invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Succeeded,
    /// The installer exited non-zero. `None` when it was killed by a signal.
    Failed { code: Option<i32> },
    /// The installer process could not be started at all.
    SpawnFailed(String),
}

impl InstallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InstallOutcome::Succeeded)
    }
}

impl std::fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallOutcome::Succeeded => write!(f, "ok"),
            InstallOutcome::Failed { code: Some(code) } => write!(f, "exit code {}", code),
            InstallOutcome::Failed { code: None } => write!(f, "terminated by signal"),
            InstallOutcome::SpawnFailed(msg) => write!(f, "could not start installer: {}", msg),
        }
    }
}

/// One entry of `pip list --format=json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Install a single specifier. Never fails: problems are part of the outcome.
    async fn install(&self, spec: &RequirementSpec) -> InstallOutcome;

    /// Packages currently installed in the target environment.
    async fn list_installed(&self) -> Result<Vec<InstalledPackage>>;
}
