//! Download planning: which cataloged objects still need fetching.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::catalog::Catalog;
use crate::error::FetchError;
use crate::paths::{basename, map_path};

/// One object to fetch into `local_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub key: String,
    pub local_path: PathBuf,
}

#[derive(Debug, Default)]
pub struct DownloadPlan {
    pub tasks: Vec<DownloadTask>,
    /// Objects whose destination is already a regular file.
    pub skipped_existing: usize,
    /// Keys ending in a separator.
    pub skipped_folders: usize,
    /// Objects that cannot be scheduled: unsafe keys, destinations claimed by
    /// another key or occupied by a non-file, or parent directories that
    /// could not be created.
    pub failures: Vec<FetchError>,
}

/// Plans one task per cataloged object whose destination is missing and
/// whose key names a file. Parent directories of every planned destination
/// exist when this returns.
pub async fn plan_downloads(catalog: &Catalog, local_root: &Path) -> DownloadPlan {
    let mut plan = DownloadPlan::default();
    let mut claimed: BTreeSet<PathBuf> = BTreeSet::new();

    for object in catalog.iter() {
        if basename(&object.key).is_empty() {
            plan.skipped_folders += 1;
            continue;
        }

        let local_path = match map_path(local_root, &object.key) {
            Ok(path) => path,
            Err(source) => {
                warn!("plan_downloads: skipping unsafe key {:?}: {}", object.key, source);
                plan.failures.push(FetchError::UnsafeKey {
                    key: object.key.clone(),
                    source,
                });
                continue;
            }
        };

        if !claimed.insert(local_path.clone()) {
            plan.failures.push(FetchError::Aborted {
                key: object.key.clone(),
                reason: format!(
                    "destination {} is already claimed by another key",
                    local_path.display()
                ),
            });
            continue;
        }

        // Only a regular file counts as already mirrored.
        match tokio::fs::metadata(&local_path).await {
            Ok(meta) if meta.is_file() => {
                plan.skipped_existing += 1;
                continue;
            }
            Ok(_) => {
                plan.failures.push(FetchError::filesystem(
                    &object.key,
                    local_path,
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "destination exists and is not a regular file",
                    ),
                ));
                continue;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                plan.failures.push(FetchError::filesystem(&object.key, local_path, e));
                continue;
            }
        }

        plan.tasks.push(DownloadTask {
            key: object.key.clone(),
            local_path,
        });
    }

    ensure_parent_dirs(&mut plan).await;

    debug!(
        "plan_downloads: {} tasks, {} existing, {} folders, {} rejected",
        plan.tasks.len(),
        plan.skipped_existing,
        plan.skipped_folders,
        plan.failures.len()
    );
    plan
}

/// Creates the parent directory of every task. A task whose directory cannot
/// be created becomes a failure; the others are kept.
async fn ensure_parent_dirs(plan: &mut DownloadPlan) {
    let parents: BTreeSet<PathBuf> = plan
        .tasks
        .iter()
        .filter_map(|task| task.local_path.parent().map(Path::to_path_buf))
        .collect();

    let mut broken: Vec<(PathBuf, io::Error)> = Vec::new();
    for parent in parents {
        if let Err(e) = tokio::fs::create_dir_all(&parent).await {
            broken.push((parent, e));
        }
    }

    if broken.is_empty() {
        return;
    }

    let tasks = std::mem::take(&mut plan.tasks);
    for task in tasks {
        let parent = task.local_path.parent();
        match broken.iter().find(|(dir, _)| Some(dir.as_path()) == parent) {
            Some((dir, e)) => plan.failures.push(FetchError::filesystem(
                &task.key,
                dir.clone(),
                io::Error::new(e.kind(), e.to_string()),
            )),
            None => plan.tasks.push(task),
        }
    }
}
