//! Filesystem helpers.
//!
//! This module provides the small operations the transfer layers share:
//! - Classifying a path as file, directory or missing
//! - Redirecting a file copy into a destination directory
//! - Enumerating a source tree in a deterministic order
//! - Creating destination directories

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

/// What a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
    /// Missing, unreadable, or neither a file nor a directory
    NotFound,
}

/// Classify a path, following symbolic links.
pub fn classify(path: &Path) -> PathKind {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => PathKind::Directory,
        Ok(metadata) if metadata.is_file() => PathKind::File,
        _ => PathKind::NotFound,
    }
}

/// True for a symbolic link whose target is a directory.
///
/// Tree walks skip these: the target is neither descended into nor counted.
pub fn is_directory_link(file_type: &fs::FileType, path: &Path) -> bool {
    file_type.is_symlink() && fs::metadata(path).is_ok_and(|m| m.is_dir())
}

/// If `destination` is an existing directory, return `destination/<file name of source>`.
/// Otherwise `destination` is already the target file path.
pub fn correct_file_destination(source: &Path, destination: &Path) -> PathBuf {
    if classify(destination) == PathKind::Directory {
        if let Some(name) = source.file_name() {
            return destination.join(name);
        }
    }
    destination.to_path_buf()
}

/// Last component of a directory path, resolving `.`/`..` and trailing separators.
pub fn leaf_name(path: &Path) -> Result<OsString, EngineError> {
    if let Some(name) = path.file_name() {
        return Ok(name.to_os_string());
    }

    let resolved = fs::canonicalize(path).map_err(|e| EngineError::InvalidPath {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    resolved
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| EngineError::InvalidPath {
            path: path.to_path_buf(),
            reason: "Path has no final component".to_string(),
        })
}

/// One file or directory found below an enumeration root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub source_path: PathBuf,
    /// Path relative to the enumeration root
    pub relative_path: PathBuf,
    /// File length in bytes (0 for directories)
    pub size: u64,
    pub is_dir: bool,
}

/// Enumerate every file and directory below `root`.
///
/// Entries come out in pre-order with siblings sorted by name, so a parent
/// directory always precedes its contents and repeated walks agree.
///
/// # Errors
/// Returns `EngineError::EnumerationFailed` for the first directory that
/// cannot be listed. Nothing is skipped silently.
pub fn enumerate_tree(root: &Path) -> Result<Vec<TreeEntry>, EngineError> {
    let mut items = Vec::new();

    fn recurse(
        path: &Path,
        rel_path: &Path,
        items: &mut Vec<TreeEntry>,
    ) -> Result<(), EngineError> {
        let enumeration_failed = |e: io::Error| EngineError::EnumerationFailed {
            path: path.to_path_buf(),
            source: e,
        };

        let mut entries = fs::read_dir(path)
            .map_err(enumeration_failed)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(enumeration_failed)?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let file_type = entry.file_type().map_err(enumeration_failed)?;
            let rel_full_path = rel_path.join(entry.file_name());
            let entry_path = entry.path();

            // Directory links are skipped, file links are copied by content
            if is_directory_link(&file_type, &entry_path) {
                continue;
            }
            if file_type.is_dir() {
                items.push(TreeEntry {
                    source_path: entry_path.clone(),
                    relative_path: rel_full_path.clone(),
                    size: 0,
                    is_dir: true,
                });
                recurse(&entry_path, &rel_full_path, items)?;
            } else {
                // A dangling link still gets listed; copying it fails per file
                let size = fs::metadata(&entry_path).map(|m| m.len()).unwrap_or(0);
                items.push(TreeEntry {
                    source_path: entry_path,
                    relative_path: rel_full_path,
                    size,
                    is_dir: false,
                });
            }
        }
        Ok(())
    }

    recurse(root, Path::new(""), &mut items)?;
    Ok(items)
}

/// Ensure a directory exists, creating it and any missing parents.
///
/// # Errors
/// Returns `EngineError::DirectoryCreationFailed` if creation fails or the
/// path exists but is not a directory.
pub fn ensure_dir_exists(path: &Path) -> Result<(), EngineError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(EngineError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "Path exists but is not a directory",
            ),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path).map_err(|e| EngineError::DirectoryCreationFailed {
                path: path.to_path_buf(),
                source: e,
            })
        }
        Err(e) => Err(EngineError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
