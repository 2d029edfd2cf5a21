//! Listing snapshot types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One object as reported by the bucket listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "LastModified")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(rename = "ETag")]
    pub etag: Option<String>,
    #[serde(rename = "Size")]
    pub size: i64,
    #[serde(rename = "StorageClass", skip_serializing_if = "Option::is_none", default)]
    pub storage_class: Option<String>,
}

impl ObjectRecord {
    pub fn new(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            last_modified: None,
            etag: None,
            size,
            storage_class: None,
        }
    }
}

/// Every object in the bucket, in listing page order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    objects: Vec<ObjectRecord>,
    reported_count: usize,
}

impl Catalog {
    pub(crate) fn push_page(&mut self, records: Vec<ObjectRecord>, reported: usize) {
        self.objects.extend(records);
        self.reported_count += reported;
    }

    pub fn objects(&self) -> &[ObjectRecord] {
        &self.objects
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Sum of the key counts the service reported for each page.
    pub fn reported_count(&self) -> usize {
        self.reported_count
    }

    pub fn matches_reported_count(&self) -> bool {
        self.reported_count == self.objects.len()
    }
}

impl FromIterator<ObjectRecord> for Catalog {
    fn from_iter<I: IntoIterator<Item = ObjectRecord>>(iter: I) -> Self {
        let objects: Vec<ObjectRecord> = iter.into_iter().collect();
        let reported_count = objects.len();
        Self {
            objects,
            reported_count,
        }
    }
}
