use std::path::Path;

use log::info;

use crate::catalog::Catalog;
use crate::error::SnapshotError;

/// Write the full listing to `path` as a pretty-printed JSON array,
/// replacing any previous snapshot. Timestamps are RFC 3339 strings.
pub async fn write_snapshot(path: &Path, catalog: &Catalog) -> Result<(), SnapshotError> {
    let json = serde_json::to_vec_pretty(catalog.objects())?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| SnapshotError::Write {
                path: path.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(path, json)
        .await
        .map_err(|source| SnapshotError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    info!("snapshot: {} objects -> {}", catalog.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ObjectRecord;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn writes_s3_style_fields_with_iso_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bucket.json");
        let mut record = ObjectRecord::new("a/b.txt", 10);
        record.last_modified = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
        record.etag = Some("\"abc\"".to_string());
        let catalog: Catalog = vec![record, ObjectRecord::new("a/", 0)].into_iter().collect();

        write_snapshot(&path, &catalog).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["Key"], "a/b.txt");
        assert_eq!(entries[0]["Size"], 10);
        assert_eq!(entries[0]["ETag"], "\"abc\"");
        assert_eq!(entries[0]["LastModified"], "2024-03-01T12:30:00Z");
        assert_eq!(entries[1]["Key"], "a/");
    }

    #[tokio::test]
    async fn overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bucket.json");
        std::fs::write(&path, b"[{\"Key\": \"stale\"}, {\"Key\": \"stale2\"}]").unwrap();

        let catalog: Catalog = std::iter::once(ObjectRecord::new("fresh", 1)).collect();
        write_snapshot(&path, &catalog).await.unwrap();

        let records: Vec<ObjectRecord> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "fresh");
    }
}
