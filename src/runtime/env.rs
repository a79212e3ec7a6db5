//! System information operations.

use std::thread;

use log::debug;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn cpu_count_impl(&self) -> Option<usize> {
        match thread::available_parallelism() {
            Ok(n) => Some(n.get()),
            Err(e) => {
                debug!("CPU count detection failed: {}", e);
                None
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_privileged_impl(&self) -> bool {
        #[cfg(unix)]
        return nix::unistd::geteuid().as_raw() == 0;

        #[cfg(windows)]
        return is_elevated::is_elevated();
    }
}
