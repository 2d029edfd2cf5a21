//! Environment configuration.
//!
//! Built once at startup and passed down explicitly. Every required variable
//! is checked before any network or filesystem work starts.

use std::path::PathBuf;

use crate::error::ConfigError;

const ACCESS_KEY_VARS: &[&str] = &["ACCESS_KEY_ID", "AWS_ACCESS_KEY_ID"];
const SECRET_KEY_VARS: &[&str] = &["SECRET_ACCESS_KEY", "AWS_SECRET_ACCESS_KEY"];
const REGION_VARS: &[&str] = &["REGION", "AWS_REGION", "AWS_DEFAULT_REGION"];
const BUCKET_VARS: &[&str] = &["BUCKET_NAME"];

const MIN_DEFAULT_CONCURRENCY: usize = 8;
const MAX_DEFAULT_CONCURRENCY: usize = 32;

#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    /// Custom endpoint for S3-compatible services (R2, MinIO).
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    /// Number of objects fetched at once.
    pub concurrency: usize,
    pub local_root: PathBuf,
    pub snapshot_path: PathBuf,
}

impl MirrorConfig {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };
        let require = |names: &[&'static str]| {
            get(names).ok_or(ConfigError::Missing { name: names[0] })
        };

        let access_key_id = require(ACCESS_KEY_VARS)?;
        let secret_access_key = require(SECRET_KEY_VARS)?;
        let region = require(REGION_VARS)?;
        let bucket = require(BUCKET_VARS)?;

        let force_path_style = match get(&["S3_FORCE_PATH_STYLE"]) {
            Some(value) => parse_bool("S3_FORCE_PATH_STYLE", &value)?,
            None => false,
        };

        let concurrency = match get(&["DOWNLOAD_CONCURRENCY"]) {
            Some(value) => parse_concurrency(&value)?,
            None => default_concurrency(),
        };

        let local_root = get(&["LOCAL_ROOT"])
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{bucket}-local")));
        let snapshot_path = get(&["SNAPSHOT_PATH"])
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{bucket}.json")));

        Ok(Self {
            access_key_id,
            secret_access_key,
            region,
            endpoint_url: get(&["S3_ENDPOINT_URL"]),
            force_path_style,
            concurrency,
            local_root,
            snapshot_path,
            bucket,
        })
    }
}

/// Available parallelism times four, kept within 8..=32.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 4)
        .unwrap_or(MIN_DEFAULT_CONCURRENCY)
        .clamp(MIN_DEFAULT_CONCURRENCY, MAX_DEFAULT_CONCURRENCY)
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_concurrency(value: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        name: "DOWNLOAD_CONCURRENCY",
        value: value.to_string(),
        reason: reason.to_string(),
    };
    match value.parse::<usize>() {
        Ok(0) => Err(invalid("must be at least 1")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(&e.to_string())),
    }
}
