//! Mirror every object in an S3-compatible bucket to a local directory.
//!
//! The bucket is listed in full, the listing is saved as a JSON snapshot, and
//! every object without a local copy is fetched on a bounded worker pool.
//! Objects already present locally are left untouched, so repeated runs only
//! fetch what is new.

pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod listing;
pub mod paths;
pub mod providers;
pub mod runner;
pub mod scheduler;
pub mod snapshot;

pub use catalog::{Catalog, ObjectRecord};
pub use config::MirrorConfig;
pub use error::{ConfigError, FetchError, ListingError, PathError, RunError, StoreError};
pub use fetch::{fetch_object, FetchPool, FetchSummary};
pub use listing::list_all;
pub use paths::map_path;
#[cfg(any(test, feature = "test-utils"))]
pub use providers::MemoryStore;
pub use providers::{ObjectStore, S3Store};
pub use runner::{Mirror, MirrorOptions, RunResult};
pub use scheduler::{plan_downloads, DownloadPlan, DownloadTask};
pub use snapshot::write_snapshot;
