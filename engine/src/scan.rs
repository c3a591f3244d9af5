//! Tree size measurement.
//!
//! Used to seed the total of a directory copy. Measurement is best effort:
//! anything that cannot be read is logged and counted as zero, and the scan
//! carries on with what it has.

use std::fs;
use std::path::Path;
use tracing::warn;

use crate::fs_ops;
use crate::model::TreeSizeInfo;

/// Measure total bytes, file count and directory count below `root`.
///
/// The root itself is not counted as a directory. Directory links are
/// skipped; file links count with the size of their target.
pub fn measure(root: &Path) -> TreeSizeInfo {
    let mut size = TreeSizeInfo::default();

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                operation = "measure",
                path = %root.display(),
                error = %e,
                "failed to read directory"
            );
            return size;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(
                    operation = "measure",
                    path = %root.display(),
                    error = %e,
                    "failed to read directory entry"
                );
                continue;
            }
        };
        let path = entry.path();

        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                warn!(
                    operation = "measure",
                    path = %path.display(),
                    error = %e,
                    "failed to read file type"
                );
                continue;
            }
        };

        if fs_ops::is_directory_link(&file_type, &path) {
            continue;
        }
        if file_type.is_dir() {
            size.directory_count += 1;
            size = TreeSizeInfo::combine(size, measure(&path));
            continue;
        }

        match fs::metadata(&path) {
            Ok(metadata) => {
                size.total_bytes += metadata.len();
                size.file_count += 1;
            }
            Err(e) => {
                warn!(
                    operation = "measure",
                    path = %path.display(),
                    error = %e,
                    "failed to read file size"
                );
            }
        }
    }

    size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_nested_tree() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a").join("b")).expect("Failed to create dirs");
        fs::create_dir(root.join("empty")).expect("Failed to create empty dir");
        fs::write(root.join("top.txt"), b"12345").expect("Failed to write top");
        fs::write(root.join("a").join("mid.txt"), b"123").expect("Failed to write mid");
        fs::write(root.join("a").join("b").join("deep.txt"), b"1").expect("Failed to write deep");

        let info = measure(root);
        assert_eq!(info.total_bytes, 9);
        assert_eq!(info.file_count, 3);
        assert_eq!(info.directory_count, 3);
    }

    #[test]
    fn test_measure_missing_root_is_empty() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let info = measure(&temp_dir.path().join("gone"));
        assert_eq!(info, TreeSizeInfo::default());
    }

    #[cfg(unix)]
    #[test]
    fn test_measure_skips_dangling_link() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = temp_dir.path();
        fs::write(root.join("real.txt"), b"abcd").expect("Failed to write file");
        std::os::unix::fs::symlink(root.join("nowhere"), root.join("dangling"))
            .expect("Failed to create link");

        let info = measure(root);
        assert_eq!(info.total_bytes, 4);
        assert_eq!(info.file_count, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_measure_skips_directory_link() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = temp_dir.path();
        fs::create_dir(root.join("real")).expect("Failed to create dir");
        fs::write(root.join("real").join("f.txt"), b"12345").expect("Failed to write file");
        std::os::unix::fs::symlink(root.join("real"), root.join("link"))
            .expect("Failed to create link");

        let info = measure(root);
        assert_eq!(info.total_bytes, 5);
        assert_eq!(info.file_count, 1);
        assert_eq!(info.directory_count, 1);
    }
}
