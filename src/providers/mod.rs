//! Storage service capability used by the mirror pipeline.
//!
//! The pipeline only needs two calls from a storage service: one page of the
//! bucket listing, and a reader over one object's bytes. `S3Store` backs them
//! with the AWS SDK; `MemoryStore` keeps objects in memory for tests and is
//! only built with `test-utils`.

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod s3;
pub mod s3_client;

use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::catalog::ObjectRecord;
use crate::error::StoreResult;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;
pub use s3::S3Store;

/// Byte stream of a single object.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// One page of a bucket listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectRecord>,
    /// Number of keys the service says this page holds.
    pub key_count: Option<usize>,
    /// Present while more pages remain.
    pub next_token: Option<String>,
    pub truncated: bool,
}

/// Must be safe to share across fetch workers; connection pooling is the
/// implementation's concern.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_page(
        &self,
        bucket: &str,
        continuation_token: Option<&str>,
    ) -> StoreResult<ListPage>;

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectReader>;
}
