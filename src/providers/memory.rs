//! In-memory object store.
//!
//! Objects are listed in key order like S3, paginated by `page_size`. Faults
//! can be injected per listing page and per object so pipeline behavior under
//! failure can be exercised without a network.

use std::collections::{BTreeMap, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use super::{ListPage, ObjectReader, ObjectStore};
use crate::catalog::ObjectRecord;
use crate::error::{StoreError, StoreResult};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
enum Fault {
    Request(String),
    MidStream(String),
}

#[derive(Debug)]
pub struct MemoryStore {
    bucket: String,
    objects: BTreeMap<String, Vec<u8>>,
    page_size: usize,
    failing_page: Option<usize>,
    faults: HashMap<String, Fault>,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: BTreeMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            failing_page: None,
            faults: HashMap::new(),
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_object(mut self, key: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.objects.insert(key.into(), body.into());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fail the listing request for the given 1-based page number.
    pub fn fail_listing_page(mut self, page: usize) -> Self {
        self.failing_page = Some(page);
        self
    }

    /// Fail `get_object` for `key` before any bytes are returned.
    pub fn fail_object(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.faults.insert(key.into(), Fault::Request(message.into()));
        self
    }

    /// Return half of the object's bytes, then a read error.
    pub fn fail_object_midstream(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.faults.insert(key.into(), Fault::MidStream(message.into()));
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn record(key: &str, body: &[u8]) -> ObjectRecord {
        let mut hasher = DefaultHasher::new();
        body.hash(&mut hasher);
        ObjectRecord {
            key: key.to_string(),
            last_modified: DateTime::<Utc>::from_timestamp(1_700_000_000, 0),
            etag: Some(format!("\"{:016x}\"", hasher.finish())),
            size: body.len() as i64,
            storage_class: Some("STANDARD".to_string()),
        }
    }

    fn check_bucket(&self, bucket: &str) -> StoreResult<()> {
        if bucket == self.bucket {
            Ok(())
        } else {
            Err(StoreError::service(format!("NoSuchBucket: {bucket}")))
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(
        &self,
        bucket: &str,
        continuation_token: Option<&str>,
    ) -> StoreResult<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_bucket(bucket)?;

        let offset = match continuation_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::service(format!("invalid continuation token {token:?}")))?,
            None => 0,
        };
        let page = offset / self.page_size + 1;
        if self.failing_page == Some(page) {
            return Err(StoreError::service(format!(
                "InternalError: listing page {page} unavailable"
            )));
        }

        let objects: Vec<ObjectRecord> = self
            .objects
            .iter()
            .skip(offset)
            .take(self.page_size)
            .map(|(key, body)| Self::record(key, body))
            .collect();
        let end = offset + objects.len();
        let truncated = end < self.objects.len();

        Ok(ListPage {
            key_count: Some(objects.len()),
            objects,
            next_token: truncated.then(|| end.to_string()),
            truncated,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectReader> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check_bucket(bucket)?;

        let body = self.objects.get(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })?;

        match self.faults.get(key) {
            Some(Fault::Request(message)) => Err(StoreError::service(message.clone())),
            Some(Fault::MidStream(message)) => {
                let head = Cursor::new(body[..body.len() / 2].to_vec());
                Ok(Box::pin(head.chain(BrokenReader(message.clone()))))
            }
            None => Ok(Box::pin(Cursor::new(body.clone()))),
        }
    }
}

struct BrokenReader(String);

impl AsyncRead for BrokenReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            self.0.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new("bucket")
            .with_page_size(2)
            .with_object("a", b"1".to_vec())
            .with_object("b", b"22".to_vec())
            .with_object("c", b"333".to_vec())
    }

    #[tokio::test]
    async fn pages_follow_continuation_tokens() {
        let store = store();
        let first = store.list_page("bucket", None).await.unwrap();
        assert_eq!(first.objects.len(), 2);
        assert!(first.truncated);
        let token = first.next_token.unwrap();

        let second = store.list_page("bucket", Some(&token)).await.unwrap();
        assert_eq!(second.objects[0].key, "c");
        assert!(!second.truncated);
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let err = store().get_object("bucket", "missing").await.err().unwrap();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn midstream_fault_ends_in_read_error() {
        let store = store().fail_object_midstream("c", "reset");
        let mut reader = store.get_object("bucket", "c").await.unwrap();
        let mut buf = Vec::new();
        let err = reader.read_to_end(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[tokio::test]
    async fn wrong_bucket_is_rejected() {
        assert!(store().list_page("other", None).await.is_err());
    }
}
