use anyhow::Result;
use log::debug;
use std::path::Path;

use crate::{
    dispatch::{DispatchReport, dispatch},
    pip::PackageManager,
    requirements::RequirementsFile,
    runtime::Runtime,
};

use super::config::{Config, Options};
use super::services::{build_package_manager, warn_if_privileged};
use super::finish;

/// Install every package listed in a requirements file.
#[tracing::instrument(skip(runtime, options))]
pub async fn install<R: Runtime>(runtime: R, requirements: &Path, options: Options) -> Result<()> {
    let config = Config::new(&runtime, options);
    let pip = build_package_manager(&config);
    run(&runtime, &pip, requirements, &config).await?;
    Ok(())
}

#[tracing::instrument(skip(runtime, manager, config))]
pub async fn run<R: Runtime + ?Sized, P: PackageManager + ?Sized>(
    runtime: &R,
    manager: &P,
    requirements: &Path,
    config: &Config,
) -> Result<DispatchReport> {
    let specs = RequirementsFile::read_all(runtime, requirements)?;
    if specs.is_empty() {
        println!("No packages found in {}", requirements.display());
        return Ok(DispatchReport::default());
    }

    warn_if_privileged(runtime);
    debug!("Dispatching {} specifier(s) with {} job(s)", specs.len(), config.jobs);
    println!(
        "Installing {} package(s) from {} ({} parallel job(s))",
        specs.len(),
        requirements.display(),
        config.jobs
    );

    let report = dispatch(manager, specs, config.jobs).await;
    finish(&report, config.strict)?;
    Ok(report)
}
