use anyhow::{Result, bail};
use log::debug;

use crate::dispatch::DispatchReport;

pub mod check;
pub mod config;
pub mod install;
pub mod playbook;
mod services;

pub use check::check;
pub use config::{Config, Options};
pub use install::install;
pub use playbook::playbook;

/// Print the outcome of a batch. In strict mode any failure becomes an error.
pub(crate) fn finish(report: &DispatchReport, strict: bool) -> Result<()> {
    println!("{}", report.summary());
    for (spec, outcome) in report.failed() {
        println!("  failed: {} ({})", spec, outcome);
    }

    let failed = report.failed().count();
    if strict && failed > 0 {
        bail!("{} package(s) failed to install", failed);
    }
    if failed > 0 {
        debug!("Ignoring {} failed install(s)", failed);
    }
    Ok(())
}
