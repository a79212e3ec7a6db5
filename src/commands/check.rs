use anyhow::Result;
use log::debug;
use std::collections::HashMap;
use std::path::Path;

use crate::{
    dispatch::dispatch,
    pip::{InstalledPackage, PackageManager},
    requirements::{RequirementSpec, RequirementsFile, normalize_name},
    runtime::Runtime,
};

use super::config::{Config, Options};
use super::services::{build_package_manager, warn_if_privileged};
use super::finish;

const NOT_INSTALLED: &str = "Not Installed";

/// A pinned requirement whose installed version differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMismatch {
    pub name: String,
    pub required: String,
    pub installed: Option<String>,
    /// The requirement line as written, extras and markers included.
    pub spec: RequirementSpec,
}

/// Compare pinned requirements against what is installed.
#[tracing::instrument(skip(runtime, options))]
pub async fn check<R: Runtime>(
    runtime: R,
    requirements: &Path,
    install: bool,
    assume_yes: bool,
    options: Options,
) -> Result<()> {
    let config = Config::new(&runtime, options);
    let pip = build_package_manager(&config);
    run(&runtime, &pip, requirements, &config, install, assume_yes).await?;
    Ok(())
}

#[tracing::instrument(skip(runtime, manager, config))]
pub async fn run<R: Runtime + ?Sized, P: PackageManager + ?Sized>(
    runtime: &R,
    manager: &P,
    requirements: &Path,
    config: &Config,
    install: bool,
    assume_yes: bool,
) -> Result<Vec<VersionMismatch>> {
    let specs = RequirementsFile::read_all(runtime, requirements)?;
    let installed = manager.list_installed().await?;
    let mismatches = compare_versions(&specs, &installed);

    if mismatches.is_empty() {
        println!("All package versions match the installed versions.");
        return Ok(mismatches);
    }

    println!("Packages with version mismatches:");
    print!("{}", format_mismatches(&mismatches));

    if !install {
        return Ok(mismatches);
    }

    if !assume_yes && !runtime.confirm("\nInstall the required versions?")? {
        println!("Installation skipped by user.");
        return Ok(mismatches);
    }

    warn_if_privileged(runtime);
    let specs: Vec<RequirementSpec> = mismatches.iter().map(|m| m.spec.clone()).collect();
    let report = dispatch(manager, specs, config.jobs).await;
    finish(&report, config.strict)?;
    Ok(mismatches)
}

/// Pinned specs whose installed version is missing or different, in file order.
pub fn compare_versions(
    specs: &[RequirementSpec],
    installed: &[InstalledPackage],
) -> Vec<VersionMismatch> {
    let installed: HashMap<String, &str> = installed
        .iter()
        .map(|p| (normalize_name(&p.name), p.version.as_str()))
        .collect();

    specs
        .iter()
        .filter_map(|spec| {
            let Some(required) = spec.pinned_version() else {
                debug!("Skipping {}: not an exact pin", spec);
                return None;
            };
            let current = installed.get(&spec.normalized_name()).copied();
            if current == Some(required) {
                return None;
            }
            Some(VersionMismatch {
                name: spec.name().to_string(),
                required: required.to_string(),
                installed: current.map(str::to_string),
                spec: spec.clone(),
            })
        })
        .collect()
}

/// Fixed-width mismatch table, one row per package.
pub fn format_mismatches(mismatches: &[VersionMismatch]) -> String {
    let mut out = format!(
        "{:<30} {:<20} {:<20}\n{}\n",
        "Package",
        "Req. Version",
        "Installed Version",
        "-".repeat(70)
    );
    for m in mismatches {
        out.push_str(&format!(
            "{:<30} {:<20} {:<20}\n",
            m.name,
            m.required,
            m.installed.as_deref().unwrap_or(NOT_INSTALLED)
        ));
    }
    out
}
