//! Runtime abstraction for system operations.
//!
//! Everything the tool asks of the host (files, CPU count, privilege level,
//! interactive confirmation) goes through [`Runtime`] so commands can be
//! tested against a mock.
//!
//! # Structure
//!
//! - `env` - CPU detection and privilege checks
//! - `fs` - File system reads
//! - `user` - User interaction (confirmation prompts)

mod env;
mod fs;
mod user;

use anyhow::Result;
use std::io::Read;
use std::path::Path;

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // File System
    fn is_file(&self, path: &Path) -> bool;
    fn open(&self, path: &Path) -> Result<Box<dyn Read + Send>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;

    // System
    /// Number of logical CPUs, or `None` when it cannot be detected.
    fn cpu_count(&self) -> Option<usize>;

    // Privilege
    fn is_privileged(&self) -> bool;

    // User interaction
    /// Prompt user for confirmation. Returns true if user confirms (y/yes), false otherwise.
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn is_file(&self, path: &Path) -> bool {
        self.is_file_impl(path)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        self.open_impl(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn cpu_count(&self) -> Option<usize> {
        self.cpu_count_impl()
    }

    fn is_privileged(&self) -> bool {
        self.is_privileged_impl()
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        self.confirm_impl(prompt)
    }
}
