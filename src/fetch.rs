//! Fetch executor - transfers objects to disk on a bounded worker pool.
//!
//! Each object streams into a temporary file beside its destination and is
//! renamed into place only once every byte is on disk, so a failed or
//! abandoned transfer never leaves a partial file at the destination.

use std::path::Path;
use std::sync::Arc;

use futures_util::future::join_all;
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::providers::ObjectStore;
use crate::scheduler::DownloadTask;

const TEMP_PREFIX: &str = ".mirror-";
const TEMP_SUFFIX: &str = ".part";

/// Read buffer size for object bodies (256 KB)
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Fetch one object to `task.local_path`. Returns the number of bytes written.
/// The parent directory must already exist.
pub async fn fetch_object(
    store: &dyn ObjectStore,
    bucket: &str,
    task: &DownloadTask,
) -> Result<u64, FetchError> {
    let key = task.key.as_str();
    let destination = task.local_path.as_path();
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));

    let mut reader = store
        .get_object(bucket, key)
        .await
        .map_err(|source| FetchError::Remote {
            key: key.to_string(),
            source,
        })?;

    // Dropping `temp_path` before `persist` deletes the partial file.
    let (file, temp_path) = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)
        .map_err(|e| FetchError::filesystem(key, parent, e))?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let written = stream_into(key, &mut reader, &mut file, &temp_path).await?;

    file.sync_all()
        .await
        .map_err(|e| FetchError::filesystem(key, temp_path.to_path_buf(), e))?;
    drop(file);

    temp_path
        .persist(destination)
        .map_err(|e| FetchError::filesystem(key, destination, e.error))?;

    debug!("fetch_object: {} -> {} ({} bytes)", key, destination.display(), written);
    Ok(written)
}

/// Copies `reader` into `writer`. Read errors are remote failures; write and
/// flush errors are local filesystem failures on `path`.
async fn stream_into<R, W>(
    key: &str,
    reader: &mut R,
    writer: &mut W,
    path: &Path,
) -> Result<u64, FetchError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut written = 0u64;

    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| FetchError::Remote {
                key: key.to_string(),
                source: e.into(),
            })?;
        if n == 0 {
            break;
        }
        writer
            .write_all(&buf[..n])
            .await
            .map_err(|e| FetchError::filesystem(key, path, e))?;
        written += n as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::filesystem(key, path, e))?;
    Ok(written)
}

/// Outcome of dispatching a batch of tasks.
#[derive(Debug, Default)]
pub struct FetchSummary {
    pub downloaded: usize,
    pub downloaded_bytes: u64,
    pub failures: Vec<FetchError>,
    /// Tasks never dispatched because the run was cancelled.
    pub cancelled: usize,
}

/// Runs fetches with at most `concurrency` in flight. The store is shared by
/// every worker.
#[derive(Clone)]
pub struct FetchPool {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    concurrency: usize,
}

impl FetchPool {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, concurrency: usize) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Dispatch every task and wait for all of them. A failed task never
    /// cancels its siblings. After `cancel` fires no new task is dispatched;
    /// tasks already running are allowed to finish.
    pub async fn execute(&self, tasks: Vec<DownloadTask>, cancel: &CancellationToken) -> FetchSummary {
        let total = tasks.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut keys = Vec::with_capacity(total);
        let mut handles = Vec::with_capacity(total);

        for task in tasks {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let store = self.store.clone();
            let bucket = self.bucket.clone();
            keys.push(task.key.clone());

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                fetch_object(store.as_ref(), &bucket, &task).await
            }));
        }

        let mut summary = FetchSummary {
            cancelled: total - handles.len(),
            ..FetchSummary::default()
        };
        if summary.cancelled > 0 {
            info!(
                "fetch: cancelled, {} of {} tasks not dispatched",
                summary.cancelled, total
            );
        }

        for (key, joined) in keys.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(Ok(bytes)) => {
                    summary.downloaded += 1;
                    summary.downloaded_bytes += bytes;
                }
                Ok(Err(e)) => {
                    warn!("fetch: {}", e);
                    summary.failures.push(e);
                }
                Err(e) => {
                    warn!("fetch: {} task aborted: {}", key, e);
                    summary.failures.push(FetchError::Aborted {
                        key,
                        reason: e.to_string(),
                    });
                }
            }
        }

        summary
    }
}
