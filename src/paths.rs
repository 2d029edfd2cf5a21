//! Mapping of object keys to local destination paths.

use std::path::{is_separator, Path, PathBuf};

use crate::error::PathError;

/// Hierarchy separator used in object keys.
pub const KEY_SEPARATOR: char = '/';

/// Final segment of a key; empty for folder markers such as `photos/`.
pub fn basename(key: &str) -> &str {
    key.rsplit(KEY_SEPARATOR).next().unwrap_or_default()
}

/// Maps `key` to a path under `local_root`, one directory per key segment.
///
/// Empty and `.` segments are dropped, so `/a//./b` maps like `a/b`. A `..`
/// segment, or a segment containing a platform path separator or NUL, is
/// rejected: the result never escapes `local_root`.
pub fn map_path(local_root: &Path, key: &str) -> Result<PathBuf, PathError> {
    let mut path = local_root.to_path_buf();
    let mut segments = 0;

    for segment in key.split(KEY_SEPARATOR) {
        match segment {
            "" | "." => continue,
            ".." => return Err(PathError::Traversal),
            s if s.contains('\0') || s.chars().any(is_separator) => {
                return Err(PathError::InvalidSegment {
                    segment: s.to_string(),
                });
            }
            s => {
                path.push(s);
                segments += 1;
            }
        }
    }

    if segments == 0 {
        return Err(PathError::Empty);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_key_becomes_nested_directories() {
        let root = Path::new("bucket-local");
        let path = map_path(root, "a/b/c.txt").unwrap();
        assert_eq!(path, root.join("a").join("b").join("c.txt"));
    }

    #[test]
    fn traversal_is_rejected() {
        let root = Path::new("/srv/bucket-local");
        assert_eq!(map_path(root, "../../etc/passwd"), Err(PathError::Traversal));
        assert_eq!(map_path(root, "a/../../b"), Err(PathError::Traversal));
    }

    #[test]
    fn leading_separator_and_dot_segments_are_normalized() {
        let root = Path::new("root");
        let path = map_path(root, "/a//./b.txt").unwrap();
        assert_eq!(path, root.join("a").join("b.txt"));
        assert!(path.starts_with(root));
    }

    #[test]
    fn key_without_segments_is_rejected() {
        let root = Path::new("root");
        assert_eq!(map_path(root, ""), Err(PathError::Empty));
        assert_eq!(map_path(root, "/./"), Err(PathError::Empty));
    }

    #[test]
    fn nul_in_segment_is_rejected() {
        let err = map_path(Path::new("root"), "a/b\0c").unwrap_err();
        assert!(matches!(err, PathError::InvalidSegment { .. }));
    }

    #[test]
    fn basename_of_folder_marker_is_empty() {
        assert_eq!(basename("a/"), "");
        assert_eq!(basename("a/b.txt"), "b.txt");
        assert_eq!(basename("c.txt"), "c.txt");
    }
}
