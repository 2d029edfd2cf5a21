//! Run coordinator: list, snapshot, plan, fetch, report.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::MirrorConfig;
use crate::error::{FetchError, RunError};
use crate::fetch::FetchPool;
use crate::listing::list_all;
use crate::providers::ObjectStore;
use crate::scheduler::plan_downloads;
use crate::snapshot::write_snapshot;

#[derive(Debug, Clone)]
pub struct MirrorOptions {
    pub bucket: String,
    pub local_root: PathBuf,
    /// Where the listing snapshot goes; `None` skips it.
    pub snapshot_path: Option<PathBuf>,
    pub concurrency: usize,
}

impl From<&MirrorConfig> for MirrorOptions {
    fn from(config: &MirrorConfig) -> Self {
        Self {
            bucket: config.bucket.clone(),
            local_root: config.local_root.clone(),
            snapshot_path: Some(config.snapshot_path.clone()),
            concurrency: config.concurrency,
        }
    }
}

#[derive(Debug)]
pub struct RunResult {
    pub bucket: String,
    pub object_count: usize,
    /// Key count summed from the service's page metadata.
    pub reported_count: usize,
    pub planned_count: usize,
    pub downloaded_count: usize,
    pub downloaded_bytes: u64,
    pub skipped_existing: usize,
    pub skipped_folders: usize,
    pub cancelled_count: usize,
    pub elapsed: Duration,
    pub failures: Vec<FetchError>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.cancelled_count == 0
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bucket: {}", self.bucket)?;
        writeln!(f, "Objects: {}", self.object_count)?;
        writeln!(
            f,
            "Downloaded: {} of {} planned ({} bytes)",
            self.downloaded_count, self.planned_count, self.downloaded_bytes
        )?;
        writeln!(
            f,
            "Skipped: {} already present, {} folder markers",
            self.skipped_existing, self.skipped_folders
        )?;
        if self.cancelled_count > 0 {
            writeln!(f, "Cancelled: {}", self.cancelled_count)?;
        }
        if !self.failures.is_empty() {
            writeln!(f, "Failed: {}", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "  {}", failure)?;
            }
        }
        write!(f, "Execution time: {} seconds", self.elapsed.as_secs_f64())
    }
}

/// What to do when the user interrupts a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Stop dispatching; in-flight downloads finish.
    Drain,
    /// Already draining; exit immediately.
    ForceExit,
}

/// First interrupt cancels `cancel`, any later one asks for a forced exit.
pub fn on_interrupt(cancel: &CancellationToken) -> Interrupt {
    if cancel.is_cancelled() {
        Interrupt::ForceExit
    } else {
        cancel.cancel();
        Interrupt::Drain
    }
}

/// Mirrors one bucket into a local directory.
pub struct Mirror {
    store: Arc<dyn ObjectStore>,
    options: MirrorOptions,
}

impl Mirror {
    pub fn new(store: Arc<dyn ObjectStore>, options: MirrorOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &MirrorOptions {
        &self.options
    }

    /// Runs the whole pipeline. Listing, local-root and snapshot errors abort
    /// the run before any fetch; per-object failures are collected into the
    /// result.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunResult, RunError> {
        let options = &self.options;

        tokio::fs::create_dir_all(&options.local_root)
            .await
            .map_err(|source| RunError::LocalRoot {
                path: options.local_root.clone(),
                source,
            })?;

        let start = Instant::now();

        let catalog = list_all(self.store.as_ref(), &options.bucket).await?;
        if !catalog.matches_reported_count() {
            warn!(
                "run: {} listed {} objects but the service reported {}",
                options.bucket,
                catalog.len(),
                catalog.reported_count()
            );
        }

        if let Some(path) = &options.snapshot_path {
            write_snapshot(path, &catalog).await?;
        }

        let plan = plan_downloads(&catalog, &options.local_root).await;
        let planned_count = plan.tasks.len();
        info!(
            "run: {} -> {} to fetch with {} workers ({} present, {} folders)",
            options.bucket,
            planned_count,
            options.concurrency,
            plan.skipped_existing,
            plan.skipped_folders
        );

        let pool = FetchPool::new(self.store.clone(), &options.bucket, options.concurrency);
        let summary = pool.execute(plan.tasks, cancel).await;

        let mut failures = plan.failures;
        failures.extend(summary.failures);

        let result = RunResult {
            bucket: options.bucket.clone(),
            object_count: catalog.len(),
            reported_count: catalog.reported_count(),
            planned_count,
            downloaded_count: summary.downloaded,
            downloaded_bytes: summary.downloaded_bytes,
            skipped_existing: plan.skipped_existing,
            skipped_folders: plan.skipped_folders,
            cancelled_count: summary.cancelled,
            elapsed: start.elapsed(),
            failures,
        };

        if result.failures.is_empty() {
            info!(
                "run: {} complete, {} downloaded in {:.2?}",
                result.bucket, result.downloaded_count, result.elapsed
            );
        } else {
            warn!(
                "run: {} complete with {} failures",
                result.bucket,
                result.failures.len()
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn result(failures: Vec<FetchError>) -> RunResult {
        RunResult {
            bucket: "photos".to_string(),
            object_count: 3,
            reported_count: 3,
            planned_count: 2,
            downloaded_count: 2 - failures.len(),
            downloaded_bytes: 15,
            skipped_existing: 0,
            skipped_folders: 1,
            cancelled_count: 0,
            elapsed: Duration::from_millis(1500),
            failures,
        }
    }

    #[test]
    fn report_lists_bucket_count_and_time() {
        let report = result(Vec::new()).to_string();
        assert!(report.contains("Bucket: photos"));
        assert!(report.contains("Objects: 3"));
        assert!(report.contains("Execution time: 1.5 seconds"));
        assert!(!report.contains("Failed"));
    }

    #[test]
    fn report_enumerates_every_failure() {
        let run = result(vec![FetchError::Remote {
            key: "a/b.txt".to_string(),
            source: StoreError::service("AccessDenied"),
        }]);
        assert!(!run.is_success());
        let report = run.to_string();
        assert!(report.contains("Failed: 1"));
        assert!(report.contains("a/b.txt: AccessDenied"));
    }

    #[test]
    fn second_interrupt_forces_exit() {
        let cancel = CancellationToken::new();
        assert_eq!(on_interrupt(&cancel), Interrupt::Drain);
        assert!(cancel.is_cancelled());
        assert_eq!(on_interrupt(&cancel), Interrupt::ForceExit);
    }
}
