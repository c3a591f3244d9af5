//! Progress samples and the sink that receives them.
//!
//! This module defines `TransferProgress`, the point-in-time snapshot handed
//! to callers, and the `ProgressCallback` trait that decouples the engine from
//! any particular UI. A sink that returns an error (or panics) stops the
//! transfer of the current file, which then resolves to `Failed`.

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

use crate::error::EngineError;
use crate::model::SuffixStyle;
use crate::size_format::{format_rate, format_size};

/// Point-in-time state of a transfer.
///
/// For a single file, `total` is the file size and `bytes_transferred` is the
/// size of the last chunk. For a tree copy, `total` and `stream_size` are the
/// size of the whole tree and `transferred`/`bytes_transferred` are the bytes
/// completed so far across all files.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    /// When the transfer unit started
    pub started_at: Instant,
    pub bytes_transferred: u64,
    /// Cumulative bytes transferred
    pub transferred: u64,
    pub stream_size: u64,
    pub total: u64,
    /// File currently being processed
    pub processed_file: PathBuf,
    bytes_per_second: f64,
}

impl TransferProgress {
    /// Build a sample, deriving the rate from `started_at` up to now.
    pub fn new(started_at: Instant, bytes_transferred: u64) -> Self {
        Self::sampled_at(started_at, Instant::now(), bytes_transferred)
    }

    /// Build a sample whose rate is measured up to `sampled_at`.
    pub fn sampled_at(started_at: Instant, sampled_at: Instant, bytes_transferred: u64) -> Self {
        let elapsed = sampled_at.saturating_duration_since(started_at).as_secs_f64();
        // No elapsed time means no measurable rate yet
        let bytes_per_second = if elapsed > 0.0 {
            bytes_transferred as f64 / elapsed
        } else {
            0.0
        };

        TransferProgress {
            started_at,
            bytes_transferred,
            transferred: 0,
            stream_size: 0,
            total: 0,
            processed_file: PathBuf::new(),
            bytes_per_second,
        }
    }

    /// Transfer rate derived when the sample was taken.
    pub fn bytes_per_second(&self) -> f64 {
        self.bytes_per_second
    }

    /// Completed share of `total`, in percent. `None` while `total` is zero.
    pub fn percentage(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(100.0 * self.transferred as f64 / self.total as f64)
    }

    /// `bytes_transferred` as a human-readable string.
    pub fn bytes_transferred_formatted(
        &self,
        style: SuffixStyle,
        decimal_places: i32,
    ) -> Result<String, EngineError> {
        format_size(self.bytes_transferred, style, decimal_places)
    }

    /// Transfer rate as a human-readable string, e.g. `"12.5 MB/sec"`.
    pub fn rate_formatted(
        &self,
        style: SuffixStyle,
        decimal_places: i32,
    ) -> Result<String, EngineError> {
        format_rate(self.bytes_per_second, style, decimal_places)
    }
}

impl fmt::Display for TransferProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percentage() {
            Some(pct) => write!(
                f,
                "Total: {}, BytesTransferred: {}, Percentage: {:.1}",
                self.total, self.bytes_transferred, pct
            ),
            None => write!(
                f,
                "Total: {}, BytesTransferred: {}",
                self.total, self.bytes_transferred
            ),
        }
    }
}

/// Raised by a sink to abort the current file.
#[derive(Debug, Error)]
#[error("progress sink failed: {message}")]
pub struct ProgressError {
    pub message: String,
}

impl ProgressError {
    pub fn new(message: impl Into<String>) -> Self {
        ProgressError {
            message: message.into(),
        }
    }
}

/// Trait for receiving progress updates.
///
/// Called synchronously on the thread performing the copy, once per chunk.
/// The sample is only valid for the duration of the call.
///
/// Plain closures taking `&TransferProgress` implement this trait and never
/// fail; implement it directly to be able to abort a file with an error.
pub trait ProgressCallback: Send {
    fn on_progress(&mut self, progress: &TransferProgress) -> Result<(), ProgressError>;
}

impl<F> ProgressCallback for F
where
    F: FnMut(&TransferProgress) + Send,
{
    fn on_progress(&mut self, progress: &TransferProgress) -> Result<(), ProgressError> {
        self(progress);
        Ok(())
    }
}

/// Sink that discards every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_progress(&mut self, _progress: &TransferProgress) -> Result<(), ProgressError> {
        Ok(())
    }
}
