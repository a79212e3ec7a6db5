//! Bounded parallel dispatch of installer invocations.

use futures_util::{StreamExt, stream};
use log::{info, warn};

use crate::pip::{InstallOutcome, PackageManager};
use crate::requirements::RequirementSpec;

/// Outcome of every dispatched specifier, in completion order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    entries: Vec<(RequirementSpec, InstallOutcome)>,
}

impl DispatchReport {
    pub fn entries(&self) -> &[(RequirementSpec, InstallOutcome)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &(RequirementSpec, InstallOutcome)> {
        self.entries.iter().filter(|(_, o)| !o.is_success())
    }

    pub fn is_success(&self) -> bool {
        self.entries.iter().all(|(_, o)| o.is_success())
    }

    /// Human readable one-line summary.
    pub fn summary(&self) -> String {
        let failed = self.len() - self.succeeded();
        format!(
            "{} package(s) processed: {} installed, {} failed",
            self.len(),
            self.succeeded(),
            failed
        )
    }
}

/// Install every spec, keeping at most `jobs` installs in flight.
///
/// A failed install never stops the others.
#[tracing::instrument(skip(manager, specs))]
pub async fn dispatch<P, I>(manager: &P, specs: I, jobs: usize) -> DispatchReport
where
    P: PackageManager + ?Sized,
    I: IntoIterator<Item = RequirementSpec>,
{
    let jobs = jobs.max(1);

    let entries = stream::iter(specs)
        .map(|spec| async move {
            info!("Installing {}", spec);
            let outcome = manager.install(&spec).await;
            match &outcome {
                InstallOutcome::Succeeded => info!("Installed {}", spec),
                failure => warn!("Failed to install {}: {}", spec, failure),
            }
            (spec, outcome)
        })
        .buffer_unordered(jobs)
        .collect::<Vec<_>>()
        .await;

    DispatchReport { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pip::{InstalledPackage, MockPackageManager};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn specs(names: &[&str]) -> Vec<RequirementSpec> {
        names.iter().map(|n| n.parse().unwrap()).collect()
    }

    /// Records how many installs overlap.
    #[derive(Default)]
    struct CountingManager {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PackageManager for CountingManager {
        async fn install(&self, spec: &RequirementSpec) -> InstallOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.seen.lock().unwrap().push(spec.to_string());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            InstallOutcome::Succeeded
        }

        async fn list_installed(&self) -> Result<Vec<InstalledPackage>> {
            Ok(vec![])
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_in_flight_never_exceeds_jobs() {
        let manager = CountingManager::default();
        let names: Vec<String> = (0..10).map(|i| format!("pkg{}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let report = dispatch(&manager, specs(&names), 3).await;

        assert_eq!(report.len(), 10);
        assert!(report.is_success());
        assert_eq!(manager.peak.load(Ordering::SeqCst), 3);

        let mut seen = manager.seen.lock().unwrap().clone();
        seen.sort();
        let mut expected: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_zero_jobs_runs_one_at_a_time() {
        let manager = CountingManager::default();
        let report = dispatch(&manager, specs(&["a", "b", "c"]), 0).await;
        assert_eq!(report.len(), 3);
        assert_eq!(manager.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_the_batch() {
        let mut manager = MockPackageManager::new();
        manager
            .expect_install()
            .withf(|s| s.as_str() == "broken==0.0.1")
            .times(1)
            .returning(|_| InstallOutcome::Failed { code: Some(1) });
        manager
            .expect_install()
            .withf(|s| s.as_str() != "broken==0.0.1")
            .times(3)
            .returning(|_| InstallOutcome::Succeeded);

        let report = dispatch(
            &manager,
            specs(&["attrs==23.2.0", "broken==0.0.1", "idna==3.7", "six"]),
            2,
        )
        .await;

        assert_eq!(report.len(), 4);
        assert_eq!(report.succeeded(), 3);
        assert!(!report.is_success());
        let failed: Vec<&str> = report.failed().map(|(s, _)| s.as_str()).collect();
        assert_eq!(failed, vec!["broken==0.0.1"]);
        assert_eq!(
            report.summary(),
            "4 package(s) processed: 3 installed, 1 failed"
        );
    }

    #[tokio::test]
    async fn test_empty_input_installs_nothing() {
        let mut manager = MockPackageManager::new();
        manager.expect_install().never();

        let report = dispatch(&manager, Vec::new(), 8).await;
        assert!(report.is_empty());
        assert!(report.is_success());
    }
}
