//! Public entry point.
//!
//! `TransferManager` decides between file and directory handling, fixes up
//! file destinations that name a directory, and offers every operation in a
//! blocking form and an async form. The async forms run the blocking
//! algorithm on tokio's blocking pool; anything that goes wrong in there
//! comes back as `TransferOutcome::Failed`, never as an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;

use crate::cancel::CancelFlag;
use crate::dir_transfer;
use crate::error::EngineError;
use crate::file_transfer;
use crate::fs_ops::{self, PathKind};
use crate::model::{FileFailure, TransferOptions, TransferOutcome, TransferReport};
use crate::primitive::{CopyPrimitive, NativeCopier};
use crate::progress::ProgressCallback;

/// Copies and moves files or directory trees with progress feedback.
#[derive(Debug)]
pub struct TransferManager<P = NativeCopier> {
    primitive: Arc<P>,
}

impl<P> Clone for TransferManager<P> {
    fn clone(&self) -> Self {
        TransferManager {
            primitive: Arc::clone(&self.primitive),
        }
    }
}

impl TransferManager<NativeCopier> {
    pub fn new() -> Self {
        Self::with_primitive(NativeCopier::new())
    }
}

impl Default for TransferManager<NativeCopier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: CopyPrimitive + 'static> TransferManager<P> {
    pub fn with_primitive(primitive: P) -> Self {
        TransferManager {
            primitive: Arc::new(primitive),
        }
    }

    /// Copy a file or directory. Not cancellable.
    ///
    /// # Errors
    /// Returns `EngineError::SourceNotFound` if `source` is neither a file nor a directory.
    pub fn copy(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        progress: &mut dyn ProgressCallback,
        options: TransferOptions,
    ) -> Result<TransferOutcome, EngineError> {
        self.copy_cancellable(source, destination, progress, options, &CancelFlag::never())
    }

    /// Copy a file or directory, stopping early once `cancel` is signaled.
    pub fn copy_cancellable(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        progress: &mut dyn ProgressCallback,
        options: TransferOptions,
        cancel: &CancelFlag,
    ) -> Result<TransferOutcome, EngineError> {
        self.copy_with_report(source, destination, progress, options, cancel)
            .map(|report| report.outcome)
    }

    /// Like [`copy_cancellable`](Self::copy_cancellable) but also returns the
    /// files that failed along the way.
    pub fn copy_with_report(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        progress: &mut dyn ProgressCallback,
        options: TransferOptions,
        cancel: &CancelFlag,
    ) -> Result<TransferReport, EngineError> {
        let source = source.as_ref();
        let kind = fs_ops::classify(source);
        self.copy_classified(kind, source, destination.as_ref(), progress, options, cancel)
    }

    fn copy_classified(
        &self,
        kind: PathKind,
        source: &Path,
        destination: &Path,
        progress: &mut dyn ProgressCallback,
        options: TransferOptions,
        cancel: &CancelFlag,
    ) -> Result<TransferReport, EngineError> {
        match kind {
            PathKind::NotFound => Err(EngineError::SourceNotFound {
                path: source.to_path_buf(),
            }),
            PathKind::Directory => Ok(dir_transfer::copy_tree(
                &*self.primitive,
                source,
                destination,
                progress,
                options,
                cancel,
            )),
            PathKind::File => {
                if cancel.is_cancelled() {
                    return Ok(TransferReport::new(TransferOutcome::Cancelled));
                }

                let destination = fs_ops::correct_file_destination(source, destination);
                let result = file_transfer::copy_file_reporting(
                    &*self.primitive,
                    source,
                    &destination,
                    progress,
                    cancel,
                )?;

                let mut report = TransferReport::new(result.outcome);
                report.total_bytes = fs::metadata(source).map(|m| m.len()).unwrap_or(0);
                match result.outcome {
                    TransferOutcome::Success => {
                        report.files_copied = 1;
                        report.bytes_accounted = report.total_bytes;
                    }
                    TransferOutcome::Failed => report.failures.push(FileFailure {
                        path: source.to_path_buf(),
                        reason: result.failure.unwrap_or_else(|| "transfer failed".to_string()),
                    }),
                    TransferOutcome::Cancelled => {}
                }
                Ok(report)
            }
        }
    }

    /// Move a file or directory, replacing an existing destination file.
    ///
    /// Directories are moved by the primitive in one piece; only file sources
    /// get redirected into an existing destination directory.
    pub fn move_path(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        progress: &mut dyn ProgressCallback,
        cancel: &CancelFlag,
    ) -> Result<TransferOutcome, EngineError> {
        let source = source.as_ref();
        let destination = move_destination(source, destination.as_ref())?;
        file_transfer::move_path(&*self.primitive, source, &destination, progress, cancel)
    }

    /// Async [`copy`](Self::copy).
    pub async fn copy_async(
        &self,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        progress: impl ProgressCallback + 'static,
        options: TransferOptions,
    ) -> Result<TransferOutcome, EngineError> {
        self.copy_async_cancellable(source, destination, progress, options, CancelFlag::never())
            .await
    }

    /// Async [`copy_cancellable`](Self::copy_cancellable).
    ///
    /// The source is classified before the background task starts, so a
    /// missing source is still reported as an error.
    pub async fn copy_async_cancellable(
        &self,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        progress: impl ProgressCallback + 'static,
        options: TransferOptions,
        cancel: CancelFlag,
    ) -> Result<TransferOutcome, EngineError> {
        self.copy_async_with_report(source, destination, progress, options, cancel)
            .await
            .map(|report| report.outcome)
    }

    /// Async [`copy_with_report`](Self::copy_with_report).
    pub async fn copy_async_with_report(
        &self,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        mut progress: impl ProgressCallback + 'static,
        options: TransferOptions,
        cancel: CancelFlag,
    ) -> Result<TransferReport, EngineError> {
        let source = source.into();
        let destination = destination.into();
        let kind = fs_ops::classify(&source);
        if kind == PathKind::NotFound {
            return Err(EngineError::SourceNotFound { path: source });
        }

        let manager = self.clone();
        let task = tokio::task::spawn_blocking(move || {
            manager.copy_classified(kind, &source, &destination, &mut progress, options, &cancel)
        });

        match task.await {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => {
                error!(operation = "copy_async", error = %e, "background copy failed");
                Ok(TransferReport::new(TransferOutcome::Failed))
            }
            Err(e) => {
                error!(operation = "copy_async", error = %e, "background copy panicked");
                Ok(TransferReport::new(TransferOutcome::Failed))
            }
        }
    }

    /// Async [`move_path`](Self::move_path).
    pub async fn move_async(
        &self,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        mut progress: impl ProgressCallback + 'static,
        cancel: CancelFlag,
    ) -> Result<TransferOutcome, EngineError> {
        let source = source.into();
        let destination = move_destination(&source, &destination.into())?;

        let primitive = Arc::clone(&self.primitive);
        let task = tokio::task::spawn_blocking(move || {
            file_transfer::move_path(&*primitive, &source, &destination, &mut progress, &cancel)
        });

        match task.await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => {
                error!(operation = "move_async", error = %e, "background move failed");
                Ok(TransferOutcome::Failed)
            }
            Err(e) => {
                error!(operation = "move_async", error = %e, "background move panicked");
                Ok(TransferOutcome::Failed)
            }
        }
    }
}

fn move_destination(source: &Path, destination: &Path) -> Result<PathBuf, EngineError> {
    match fs_ops::classify(source) {
        PathKind::NotFound => Err(EngineError::SourceNotFound {
            path: source.to_path_buf(),
        }),
        PathKind::File => Ok(fs_ops::correct_file_destination(source, destination)),
        PathKind::Directory => Ok(destination.to_path_buf()),
    }
}
