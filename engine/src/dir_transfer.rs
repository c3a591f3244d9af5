//! Directory tree copy.
//!
//! Walks the source tree, recreates its directories under the destination
//! root, then copies every file in enumeration order. Per-file progress is
//! folded into one tree-wide stream measured against the size of the whole
//! tree, so the reported percentage only ever grows.
//!
//! Files are processed strictly one after another. Nothing is rolled back on
//! failure or cancellation.

use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

use crate::cancel::CancelFlag;
use crate::error::EngineError;
use crate::file_transfer::{self, FileResult};
use crate::fs_ops;
use crate::model::{FileFailure, TransferOptions, TransferOutcome, TransferReport};
use crate::primitive::CopyPrimitive;
use crate::progress::{ProgressCallback, ProgressError, TransferProgress};
use crate::scan;

/// Rewrites file-level samples into tree-level samples.
struct TreeProgress<'a> {
    inner: &'a mut dyn ProgressCallback,
    started_at: Instant,
    /// Bytes accounted for by files finished before the current one
    prior: u64,
    total: u64,
    /// Highest `transferred` seen for the current file
    current: u64,
}

impl ProgressCallback for TreeProgress<'_> {
    fn on_progress(&mut self, progress: &TransferProgress) -> Result<(), ProgressError> {
        self.current = self.current.max(progress.transferred);
        let done = self.prior + self.current;

        let mut sample = TransferProgress::new(self.started_at, done);
        sample.transferred = done;
        sample.total = self.total;
        sample.stream_size = self.total;
        sample.processed_file = progress.processed_file.clone();
        self.inner.on_progress(&sample)
    }
}

/// Copy the directory `source_dir` into `destination_dir`.
///
/// Unless `options.copy_contents_only` is set, the copy lands in
/// `destination_dir/<name of source_dir>`. With `options.continue_on_failure`
/// a failed file is recorded in the report and counted as done for progress
/// purposes; the overall outcome stays `Success`. Without it the first failed
/// file ends the copy with `Failed`.
///
/// Errors while creating directories or listing the source end the copy with
/// `Failed`.
pub fn copy_tree<P: CopyPrimitive + ?Sized>(
    primitive: &P,
    source_dir: &Path,
    destination_dir: &Path,
    progress: &mut dyn ProgressCallback,
    options: TransferOptions,
    cancel: &CancelFlag,
) -> TransferReport {
    let tree_size = scan::measure(source_dir);
    let mut report = TransferReport::new(TransferOutcome::Success);
    report.total_bytes = tree_size.total_bytes;

    if cancel.is_cancelled() {
        report.outcome = TransferOutcome::Cancelled;
        return report;
    }

    let mut tree = TreeProgress {
        inner: progress,
        started_at: Instant::now(),
        prior: 0,
        total: tree_size.total_bytes,
        current: 0,
    };

    let copied = copy_entries(
        primitive,
        source_dir,
        destination_dir,
        &mut tree,
        options,
        cancel,
        &mut report,
    );
    let outcome = match copied {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(
                operation = "copy_tree",
                path = %source_dir.display(),
                error = %e,
                "directory copy failed"
            );
            TransferOutcome::Failed
        }
    };
    report.outcome = outcome;

    info!(
        operation = "copy_tree",
        path = %source_dir.display(),
        outcome = %report.outcome,
        files_copied = report.files_copied,
        failures = report.failures.len(),
        "directory copy finished"
    );
    report
}

fn destination_root(
    source_dir: &Path,
    destination_dir: &Path,
    copy_contents_only: bool,
) -> Result<PathBuf, EngineError> {
    let root = if copy_contents_only {
        destination_dir.to_path_buf()
    } else {
        destination_dir.join(fs_ops::leaf_name(source_dir)?)
    };
    fs_ops::ensure_dir_exists(&root)?;
    Ok(root)
}

fn copy_entries<P: CopyPrimitive + ?Sized>(
    primitive: &P,
    source_dir: &Path,
    destination_dir: &Path,
    tree: &mut TreeProgress<'_>,
    options: TransferOptions,
    cancel: &CancelFlag,
    report: &mut TransferReport,
) -> Result<TransferOutcome, EngineError> {
    let root = destination_root(source_dir, destination_dir, options.copy_contents_only)?;
    let entries = fs_ops::enumerate_tree(source_dir)?;

    for dir in entries.iter().filter(|e| e.is_dir) {
        if cancel.is_cancelled() {
            return Ok(TransferOutcome::Cancelled);
        }
        fs_ops::ensure_dir_exists(&root.join(&dir.relative_path))?;
    }

    for file in entries.iter().filter(|e| !e.is_dir) {
        if cancel.is_cancelled() {
            return Ok(TransferOutcome::Cancelled);
        }

        tree.current = 0;
        let destination = root.join(&file.relative_path);
        let copied = file_transfer::copy_file_reporting(
            primitive,
            &file.source_path,
            &destination,
            &mut *tree,
            cancel,
        );
        let result = copied.unwrap_or_else(|e| {
                // Source vanished or changed type since enumeration
                FileResult {
                    outcome: TransferOutcome::Failed,
                    failure: Some(e.to_string()),
                }
            });

        // Never step backwards if the file grew while it was copied
        let accounted = file.size.max(tree.current);

        match result.outcome {
            TransferOutcome::Success => {
                report.files_copied += 1;
            }
            TransferOutcome::Failed => {
                report.failures.push(FileFailure {
                    path: file.source_path.clone(),
                    reason: result.failure.unwrap_or_else(|| "transfer failed".to_string()),
                });
                if !options.continue_on_failure {
                    return Ok(TransferOutcome::Failed);
                }
                warn!(
                    operation = "copy_tree",
                    path = %file.source_path.display(),
                    "continuing after failed file"
                );
            }
            TransferOutcome::Cancelled => return Ok(TransferOutcome::Cancelled),
        }

        tree.prior += accounted;
        report.bytes_accounted = tree.prior;
    }

    Ok(TransferOutcome::Success)
}
