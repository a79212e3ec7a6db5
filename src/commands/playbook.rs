use anyhow::Result;
use std::path::Path;

use crate::{
    dispatch::{DispatchReport, dispatch},
    pip::PackageManager,
    playbook::{self, PlaybookPackages},
    runtime::Runtime,
};

use super::config::{Config, Options};
use super::services::{build_package_manager, warn_if_privileged};
use super::finish;

/// Install the pip packages an Ansible playbook would install.
#[tracing::instrument(skip(runtime, options))]
pub async fn playbook<R: Runtime>(
    runtime: R,
    path: &Path,
    list_only: bool,
    options: Options,
) -> Result<()> {
    let config = Config::new(&runtime, options);
    let pip = build_package_manager(&config);
    run(&runtime, &pip, path, &config, list_only).await?;
    Ok(())
}

#[tracing::instrument(skip(runtime, manager, config))]
pub async fn run<R: Runtime + ?Sized, P: PackageManager + ?Sized>(
    runtime: &R,
    manager: &P,
    path: &Path,
    config: &Config,
    list_only: bool,
) -> Result<Option<DispatchReport>> {
    let packages = playbook::load(runtime, path)?;
    print_packages(path, &packages);

    if list_only || packages.pip.is_empty() {
        return Ok(None);
    }

    warn_if_privileged(runtime);
    let report = dispatch(manager, packages.pip, config.jobs).await;
    finish(&report, config.strict)?;
    Ok(Some(report))
}

fn print_packages(path: &Path, packages: &PlaybookPackages) {
    if packages.pip.is_empty() {
        println!("No pip packages found.");
    } else {
        println!("Pip packages found in {}:", path.display());
        for spec in &packages.pip {
            println!("  {}", spec);
        }
    }

    if !packages.apt.is_empty() {
        println!("Apt packages found in {} (not installed):", path.display());
        for name in &packages.apt {
            println!("  {}", name);
        }
    }
}
