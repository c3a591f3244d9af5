//! Core data model for transfers.
//!
//! This module defines the value types shared by every layer:
//! - TransferOutcome: terminal result of a file or tree transfer
//! - SuffixStyle: unit convention used when rendering byte counts
//! - TreeSizeInfo: measured size of a directory tree
//! - TransferReport: outcome plus per-file bookkeeping of a tree copy
//! - TransferOptions: caller-selected policy for copies

use serde::Serialize;
use std::path::PathBuf;

/// Terminal result of a transfer, at any granularity (single file or whole tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferOutcome {
    /// Everything requested was transferred (tree copies may still carry
    /// per-file failures when continuing on failure, see [`TransferReport`])
    Success,
    /// The transfer failed and no cancellation was requested
    Failed,
    /// The transfer was stopped by a cancellation request
    Cancelled,
}

impl std::fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferOutcome::Success => write!(f, "Success"),
            TransferOutcome::Failed => write!(f, "Failed"),
            TransferOutcome::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Style of suffix for file sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuffixStyle {
    /// 1 KB = 1024 bytes
    #[default]
    Windows,
    /// 1 KiB = 1024 bytes
    Binary,
    /// 1 kB = 1000 bytes
    Metric,
}

impl SuffixStyle {
    /// Parse a style name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "windows" => Some(Self::Windows),
            "binary" | "iec" => Some(Self::Binary),
            "metric" | "si" => Some(Self::Metric),
            _ => None,
        }
    }
}

impl std::fmt::Display for SuffixStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuffixStyle::Windows => write!(f, "windows"),
            SuffixStyle::Binary => write!(f, "binary"),
            SuffixStyle::Metric => write!(f, "metric"),
        }
    }
}

/// Measured size of a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TreeSizeInfo {
    /// Sum of the lengths of every file in the tree
    pub total_bytes: u64,
    /// Number of files in the tree
    pub file_count: u64,
    /// Number of directories below the root (the root itself is not counted)
    pub directory_count: u64,
}

impl TreeSizeInfo {
    /// Field-wise sum of two measurements.
    pub fn combine(a: TreeSizeInfo, b: TreeSizeInfo) -> TreeSizeInfo {
        TreeSizeInfo {
            total_bytes: a.total_bytes.saturating_add(b.total_bytes),
            file_count: a.file_count.saturating_add(b.file_count),
            directory_count: a.directory_count.saturating_add(b.directory_count),
        }
    }
}

/// A file that failed inside a tree copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    /// Source path of the file
    pub path: PathBuf,
    /// Human-readable reason
    pub reason: String,
}

/// Result of a transfer together with what happened along the way.
///
/// A tree copy that continues past failed files still reports
/// [`TransferOutcome::Success`]; `failures` lists what was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub outcome: TransferOutcome,
    /// Files that were copied successfully
    pub files_copied: u64,
    /// Bytes accounted for in the aggregate progress (includes failed files
    /// when continuing on failure)
    pub bytes_accounted: u64,
    /// Total bytes measured before the transfer started
    pub total_bytes: u64,
    pub failures: Vec<FileFailure>,
}

impl TransferReport {
    pub fn new(outcome: TransferOutcome) -> Self {
        TransferReport {
            outcome,
            files_copied: 0,
            bytes_accounted: 0,
            total_bytes: 0,
            failures: Vec::new(),
        }
    }

    /// True when the outcome is `Success` and no file failed.
    pub fn is_complete(&self) -> bool {
        self.outcome == TransferOutcome::Success && self.failures.is_empty()
    }
}

/// Policy knobs for a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferOptions {
    /// Keep going when a single file inside a tree fails
    pub continue_on_failure: bool,
    /// Copy the children of the source directory straight into the
    /// destination instead of creating `destination/<source name>`
    pub copy_contents_only: bool,
}

impl TransferOptions {
    pub fn with_continue_on_failure(mut self, value: bool) -> Self {
        self.continue_on_failure = value;
        self
    }

    pub fn with_copy_contents_only(mut self, value: bool) -> Self {
        self.copy_contents_only = value;
        self
    }
}
