//! Error types for the transfer engine.
//!
//! `EngineError` covers caller mistakes that are reported before any I/O
//! begins (missing source, bad formatter arguments) plus the I/O failures met
//! while replicating a directory structure. Per-file transfer failures are
//! never errors at the API boundary: they are folded into a
//! [`TransferOutcome`](crate::model::TransferOutcome) instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Source path is neither a file nor a directory, or does not exist
    #[error("Source has to be a file or directory: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// A regular file was required but something else was found
    #[error("Not a regular file: {}", path.display())]
    NotAFile { path: PathBuf },

    /// Size formatter was asked for a negative precision
    #[error("Decimal places must be zero or greater, got {0}")]
    InvalidDecimalPlaces(i32),

    /// Path is unusable for the requested operation
    #[error("Invalid path: {} ({reason})", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// Failed to enumerate a directory while walking the source tree
    #[error("Failed to enumerate directory: {}", path.display())]
    EnumerationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to create a directory at the destination
    #[error("Failed to create directory: {}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    /// True for errors caused by the arguments rather than the filesystem.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound { .. }
                | Self::NotAFile { .. }
                | Self::InvalidDecimalPlaces(_)
                | Self::InvalidPath { .. }
        )
    }

    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::EnumerationFailed { source, .. }
            | Self::DirectoryCreationFailed { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}
