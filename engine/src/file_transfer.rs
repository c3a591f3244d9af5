//! Single file transfer.
//!
//! Translates the primitive's chunk ticks into [`TransferProgress`] samples,
//! watches the cancellation flag, and classifies the result. Sink faults and
//! primitive failures never leave this layer as errors; only bad arguments do.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

use crate::cancel::CancelFlag;
use crate::error::EngineError;
use crate::fs_ops::{self, PathKind};
use crate::model::TransferOutcome;
use crate::primitive::{ChunkAction, ChunkProgress, CopyPrimitive, MoveFlags, PrimitiveError};
use crate::progress::{ProgressCallback, TransferProgress};

/// Outcome of one file plus the reason when it failed.
#[derive(Debug)]
pub(crate) struct FileResult {
    pub outcome: TransferOutcome,
    pub failure: Option<String>,
}

/// Relays chunk ticks to the caller's sink.
struct TickRelay<'a> {
    source: &'a Path,
    started_at: Instant,
    progress: &'a mut dyn ProgressCallback,
    cancel: &'a CancelFlag,
    sink_failure: Option<String>,
}

impl TickRelay<'_> {
    fn tick(&mut self, chunk: ChunkProgress) -> ChunkAction {
        if self.cancel.is_cancelled() {
            return ChunkAction::Cancel;
        }

        let mut sample = TransferProgress::new(self.started_at, chunk.bytes_this_tick);
        sample.total = chunk.total;
        sample.transferred = chunk.transferred;
        sample.stream_size = chunk.stream_size;
        sample.processed_file = self.source.to_path_buf();

        let progress = &mut *self.progress;
        match panic::catch_unwind(AssertUnwindSafe(|| progress.on_progress(&sample))) {
            Ok(Ok(())) => ChunkAction::Continue,
            Ok(Err(e)) => {
                self.sink_failure = Some(e.to_string());
                ChunkAction::Stop
            }
            Err(_) => {
                self.sink_failure = Some("progress sink panicked".to_string());
                ChunkAction::Stop
            }
        }
    }
}

/// Copy one file, failing if `destination` already exists.
///
/// # Errors
/// Returns an invalid-argument `EngineError` if `source` is not an existing
/// regular file. Every other problem is reported through the outcome.
pub fn copy_file<P: CopyPrimitive + ?Sized>(
    primitive: &P,
    source: &Path,
    destination: &Path,
    progress: &mut dyn ProgressCallback,
    cancel: &CancelFlag,
) -> Result<TransferOutcome, EngineError> {
    copy_file_reporting(primitive, source, destination, progress, cancel).map(|r| r.outcome)
}

pub(crate) fn copy_file_reporting<P: CopyPrimitive + ?Sized>(
    primitive: &P,
    source: &Path,
    destination: &Path,
    progress: &mut dyn ProgressCallback,
    cancel: &CancelFlag,
) -> Result<FileResult, EngineError> {
    match fs_ops::classify(source) {
        PathKind::File => {}
        PathKind::Directory => {
            return Err(EngineError::NotAFile {
                path: source.to_path_buf(),
            })
        }
        PathKind::NotFound => {
            return Err(EngineError::SourceNotFound {
                path: source.to_path_buf(),
            })
        }
    }

    if cancel.is_cancelled() {
        return Ok(FileResult {
            outcome: TransferOutcome::Cancelled,
            failure: None,
        });
    }

    debug!(
        operation = "copy",
        path = %source.display(),
        destination = %destination.display(),
        "copying file"
    );
    let mut relay = TickRelay {
        source,
        started_at: Instant::now(),
        progress,
        cancel,
        sink_failure: None,
    };
    let result =
        primitive.copy_file_chunked(source, destination, &mut |chunk| relay.tick(chunk), true);
    Ok(resolve("copy", source, result, relay.sink_failure, cancel))
}

/// Move a file or directory, replacing an existing destination file.
///
/// Directories are handed to the primitive as a whole; there is no tree walk
/// at this level.
///
/// # Errors
/// Returns `EngineError::SourceNotFound` if `source` does not exist.
pub fn move_path<P: CopyPrimitive + ?Sized>(
    primitive: &P,
    source: &Path,
    destination: &Path,
    progress: &mut dyn ProgressCallback,
    cancel: &CancelFlag,
) -> Result<TransferOutcome, EngineError> {
    if fs_ops::classify(source) == PathKind::NotFound {
        return Err(EngineError::SourceNotFound {
            path: source.to_path_buf(),
        });
    }

    if cancel.is_cancelled() {
        return Ok(TransferOutcome::Cancelled);
    }

    debug!(
        operation = "move",
        path = %source.display(),
        destination = %destination.display(),
        "moving"
    );
    let mut relay = TickRelay {
        source,
        started_at: Instant::now(),
        progress,
        cancel,
        sink_failure: None,
    };
    let result = primitive.move_path(
        source,
        destination,
        &mut |chunk| relay.tick(chunk),
        MoveFlags::replace_all(),
    );
    Ok(resolve("move", source, result, relay.sink_failure, cancel).outcome)
}

fn resolve(
    operation: &str,
    source: &Path,
    result: Result<(), PrimitiveError>,
    sink_failure: Option<String>,
    cancel: &CancelFlag,
) -> FileResult {
    // A cancellation request wins over whatever the primitive reported
    if cancel.is_cancelled() {
        return FileResult {
            outcome: TransferOutcome::Cancelled,
            failure: None,
        };
    }

    // A failed sink fails the file even if the primitive ignored the Stop
    if let Some(reason) = sink_failure {
        warn!(operation, path = %source.display(), error = %reason, "progress sink failed");
        return FileResult {
            outcome: TransferOutcome::Failed,
            failure: Some(reason),
        };
    }

    match result {
        Ok(()) => {
            debug!(operation, path = %source.display(), "transfer finished");
            FileResult {
                outcome: TransferOutcome::Success,
                failure: None,
            }
        }
        Err(e) => {
            let reason = e.to_string();
            warn!(operation, path = %source.display(), error = %reason, "transfer failed");
            FileResult {
                outcome: TransferOutcome::Failed,
                failure: Some(reason),
            }
        }
    }
}
