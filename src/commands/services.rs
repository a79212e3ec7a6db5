//! Builds the services a command runs against from its resolved [`Config`].

use log::{debug, warn};

use crate::{pip::Pip, runtime::Runtime};

use super::config::Config;

/// Build the pip invoker described by `config`.
pub fn build_package_manager(config: &Config) -> Pip {
    debug!(
        "Using {} (no-deps: {}, extra args: {:?})",
        config.pip_program, config.no_deps, config.pip_args
    );
    Pip::new(config.pip_program.clone())
        .with_no_deps(config.no_deps)
        .with_extra_args(config.pip_args.clone())
}

/// Warn when installs would land in the system interpreter's site-packages.
pub fn warn_if_privileged<R: Runtime + ?Sized>(runtime: &R) {
    if runtime.is_privileged() {
        warn!("Running as a privileged user: pip will modify the system environment");
    }
}
