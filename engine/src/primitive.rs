//! Chunked copy/move primitive.
//!
//! The transfer layers never touch file contents themselves. They drive a
//! [`CopyPrimitive`], which moves bytes and reports every chunk through a
//! callback that answers with a [`ChunkAction`]. [`NativeCopier`] is the
//! `std::fs` implementation used by default; tests substitute their own.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::EngineError;
use crate::fs_ops;

/// Default read/write chunk size (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Progress of the primitive at one chunk boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Total bytes of the whole operation
    pub total: u64,
    /// Bytes written so far
    pub transferred: u64,
    /// Size of the stream currently being written
    pub stream_size: u64,
    /// Bytes written by this chunk
    pub bytes_this_tick: u64,
}

/// Answer of the chunk callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkAction {
    Continue,
    /// Abort and remove the partially written destination
    Cancel,
    /// Abort and leave the partially written destination in place
    Stop,
}

/// Flags for [`CopyPrimitive::move_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveFlags {
    /// Overwrite an existing destination file
    pub replace_existing: bool,
    /// Fall back to copy-then-delete when a rename is not possible
    pub allow_copy: bool,
    /// Flush copied data to disk before reporting success
    pub write_through: bool,
}

impl MoveFlags {
    /// Replace existing files, allow cross-volume copies, write through.
    pub const fn replace_all() -> Self {
        MoveFlags {
            replace_existing: true,
            allow_copy: true,
            write_through: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// The chunk callback asked to stop
    #[error("transfer aborted by progress routine ({0:?})")]
    Aborted(ChunkAction),

    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl PrimitiveError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> PrimitiveError + '_ {
        move |source| PrimitiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Platform copy/move operations with per-chunk progress.
pub trait CopyPrimitive: Send + Sync {
    /// Copy one regular file.
    ///
    /// With `fail_if_exists` an existing destination is an error rather than
    /// being overwritten.
    fn copy_file_chunked(
        &self,
        source: &Path,
        destination: &Path,
        on_chunk: &mut dyn FnMut(ChunkProgress) -> ChunkAction,
        fail_if_exists: bool,
    ) -> Result<(), PrimitiveError>;

    /// Move a file or a whole directory.
    fn move_path(
        &self,
        source: &Path,
        destination: &Path,
        on_chunk: &mut dyn FnMut(ChunkProgress) -> ChunkAction,
        flags: MoveFlags,
    ) -> Result<(), PrimitiveError>;
}

/// `std::fs` based primitive.
///
/// Emits one zero-byte tick when a file is opened, then one tick per chunk.
/// Copied files keep the source's modification time and permissions.
#[derive(Debug, Clone)]
pub struct NativeCopier {
    chunk_size: usize,
}

impl Default for NativeCopier {
    fn default() -> Self {
        NativeCopier {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl NativeCopier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `chunk_size` bytes per read (minimum 1).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Copy `source` into an already opened `destination`, reporting offsets
    /// relative to `base` within an operation of `total` bytes.
    #[allow(clippy::too_many_arguments)]
    fn pump(
        &self,
        source: &Path,
        destination: &Path,
        mut dst_file: File,
        base: u64,
        total: u64,
        on_chunk: &mut dyn FnMut(ChunkProgress) -> ChunkAction,
        write_through: bool,
    ) -> Result<u64, PrimitiveError> {
        let mut src_file = File::open(source).map_err(PrimitiveError::io(source))?;
        let src_metadata = src_file.metadata().map_err(PrimitiveError::io(source))?;
        let stream_size = src_metadata.len();

        let mut tick = |transferred: u64, bytes_this_tick: u64| match on_chunk(ChunkProgress {
            total,
            transferred: base + transferred,
            stream_size,
            bytes_this_tick,
        }) {
            ChunkAction::Continue => Ok(()),
            action => Err(PrimitiveError::Aborted(action)),
        };

        tick(0, 0)?;

        let mut buf = vec![0u8; self.chunk_size];
        let mut copied: u64 = 0;
        loop {
            let n = match src_file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(PrimitiveError::io(source)(e)),
            };
            dst_file
                .write_all(&buf[..n])
                .map_err(PrimitiveError::io(destination))?;
            copied += n as u64;
            tick(copied, n as u64)?;
        }

        if write_through {
            dst_file.sync_all().map_err(PrimitiveError::io(destination))?;
        }
        drop(dst_file);

        // Metadata preservation is best effort
        if let Ok(mtime) = src_metadata.modified() {
            let mtime = filetime::FileTime::from_system_time(mtime);
            let _ = filetime::set_file_mtime(destination, mtime);
        }
        let _ = fs::set_permissions(destination, src_metadata.permissions());

        Ok(copied)
    }

    fn open_destination(destination: &Path, fail_if_exists: bool) -> Result<File, PrimitiveError> {
        let mut options = OpenOptions::new();
        options.write(true);
        if fail_if_exists {
            options.create_new(true);
        } else {
            options.create(true).truncate(true);
        }
        options.open(destination).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                PrimitiveError::DestinationExists(destination.to_path_buf())
            } else {
                PrimitiveError::io(destination)(e)
            }
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn copy_one(
        &self,
        source: &Path,
        destination: &Path,
        base: u64,
        total: u64,
        on_chunk: &mut dyn FnMut(ChunkProgress) -> ChunkAction,
        fail_if_exists: bool,
        write_through: bool,
    ) -> Result<u64, PrimitiveError> {
        let dst_file = Self::open_destination(destination, fail_if_exists)?;
        let result = self.pump(source, destination, dst_file, base, total, on_chunk, write_through);
        match &result {
            Err(PrimitiveError::Aborted(ChunkAction::Stop)) | Ok(_) => {}
            Err(_) => {
                let _ = fs::remove_file(destination);
            }
        }
        result
    }

    /// Copy a directory tree as one progress stream, then delete the source.
    fn move_dir_by_copy(
        &self,
        source: &Path,
        destination: &Path,
        on_chunk: &mut dyn FnMut(ChunkProgress) -> ChunkAction,
        flags: MoveFlags,
    ) -> Result<(), PrimitiveError> {
        let entries = fs_ops::enumerate_tree(source)?;
        let total = entries.iter().filter(|e| !e.is_dir).map(|e| e.size).sum::<u64>();

        fs_ops::ensure_dir_exists(destination)?;
        let mut transferred = 0;
        for entry in &entries {
            let target = destination.join(&entry.relative_path);
            if entry.is_dir {
                fs_ops::ensure_dir_exists(&target)?;
            } else {
                transferred += self.copy_one(
                    &entry.source_path,
                    &target,
                    transferred,
                    total,
                    on_chunk,
                    !flags.replace_existing,
                    flags.write_through,
                )?;
            }
        }

        fs::remove_dir_all(source).map_err(PrimitiveError::io(source))
    }
}

impl CopyPrimitive for NativeCopier {
    fn copy_file_chunked(
        &self,
        source: &Path,
        destination: &Path,
        on_chunk: &mut dyn FnMut(ChunkProgress) -> ChunkAction,
        fail_if_exists: bool,
    ) -> Result<(), PrimitiveError> {
        let total = fs::metadata(source).map_err(PrimitiveError::io(source))?.len();
        self.copy_one(source, destination, 0, total, on_chunk, fail_if_exists, false)
            .map(|_| ())
    }

    fn move_path(
        &self,
        source: &Path,
        destination: &Path,
        on_chunk: &mut dyn FnMut(ChunkProgress) -> ChunkAction,
        flags: MoveFlags,
    ) -> Result<(), PrimitiveError> {
        let src_metadata = fs::metadata(source).map_err(PrimitiveError::io(source))?;

        match fs::metadata(destination) {
            Ok(dst_metadata) => {
                // Only files can be replaced; an existing directory is never clobbered
                if !flags.replace_existing || dst_metadata.is_dir() || src_metadata.is_dir() {
                    return Err(PrimitiveError::DestinationExists(destination.to_path_buf()));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(PrimitiveError::io(destination)(e)),
        }

        let rename_error = match fs::rename(source, destination) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        if !flags.allow_copy {
            return Err(PrimitiveError::io(source)(rename_error));
        }
        tracing::debug!(
            operation = "move",
            path = %source.display(),
            error = %rename_error,
            "rename failed, falling back to copy and delete"
        );

        if src_metadata.is_dir() {
            self.move_dir_by_copy(source, destination, on_chunk, flags)
        } else {
            self.copy_one(
                source,
                destination,
                0,
                src_metadata.len(),
                on_chunk,
                false,
                flags.write_through,
            )?;
            fs::remove_file(source).map_err(PrimitiveError::io(source))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_ticks(
        copier: &NativeCopier,
        src: &Path,
        dst: &Path,
        fail_if_exists: bool,
    ) -> (Result<(), PrimitiveError>, Vec<ChunkProgress>) {
        let mut ticks = Vec::new();
        let result = copier.copy_file_chunked(
            src,
            dst,
            &mut |chunk| {
                ticks.push(chunk);
                ChunkAction::Continue
            },
            fail_if_exists,
        );
        (result, ticks)
    }

    #[test]
    fn test_chunk_size_has_floor_of_one() {
        assert_eq!(NativeCopier::new().chunk_size(), DEFAULT_CHUNK_SIZE);
        assert_eq!(NativeCopier::new().with_chunk_size(0).chunk_size(), 1);
        assert_eq!(NativeCopier::new().with_chunk_size(4096).chunk_size(), 4096);
    }

    #[test]
    fn test_copy_reports_every_chunk() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("source.bin");
        let dst = temp_dir.path().join("dest.bin");
        fs::write(&src, vec![7u8; 10]).expect("Failed to write source");

        let copier = NativeCopier::new().with_chunk_size(4);
        let (result, ticks) = collect_ticks(&copier, &src, &dst, true);
        result.expect("Copy should succeed");

        let transferred: Vec<u64> = ticks.iter().map(|t| t.transferred).collect();
        assert_eq!(transferred, vec![0, 4, 8, 10]);
        assert_eq!(ticks.last().unwrap().bytes_this_tick, 2);
        assert!(ticks.iter().all(|t| t.total == 10 && t.stream_size == 10));
        assert_eq!(fs::read(&dst).expect("Failed to read dest"), vec![7u8; 10]);
    }

    #[test]
    fn test_empty_file_still_ticks_once() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("empty");
        fs::write(&src, b"").expect("Failed to write source");

        let dst = temp_dir.path().join("copy");
        let (result, ticks) = collect_ticks(&NativeCopier::new(), &src, &dst, true);
        result.expect("Copy should succeed");
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].total, 0);
    }

    #[test]
    fn test_fail_if_exists() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("a");
        let dst = temp_dir.path().join("b");
        fs::write(&src, b"new").expect("Failed to write source");
        fs::write(&dst, b"old").expect("Failed to write dest");

        let (result, _) = collect_ticks(&NativeCopier::new(), &src, &dst, true);
        assert!(matches!(result, Err(PrimitiveError::DestinationExists(_))));
        assert_eq!(fs::read(&dst).unwrap(), b"old");

        let (result, _) = collect_ticks(&NativeCopier::new(), &src, &dst, false);
        result.expect("Overwrite should succeed");
        assert_eq!(fs::read(&dst).unwrap(), b"new");
    }

    #[test]
    fn test_cancel_removes_partial_and_stop_keeps_it() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("big");
        fs::write(&src, vec![1u8; 64]).expect("Failed to write source");
        let copier = NativeCopier::new().with_chunk_size(8);

        let cancelled = temp_dir.path().join("cancelled");
        let result = copier.copy_file_chunked(
            &src,
            &cancelled,
            &mut |chunk| {
                if chunk.transferred >= 16 {
                    ChunkAction::Cancel
                } else {
                    ChunkAction::Continue
                }
            },
            true,
        );
        assert!(matches!(result, Err(PrimitiveError::Aborted(ChunkAction::Cancel))));
        assert!(!cancelled.exists());

        let stopped = temp_dir.path().join("stopped");
        let result = copier.copy_file_chunked(
            &src,
            &stopped,
            &mut |chunk| {
                if chunk.transferred >= 16 {
                    ChunkAction::Stop
                } else {
                    ChunkAction::Continue
                }
            },
            true,
        );
        assert!(matches!(result, Err(PrimitiveError::Aborted(ChunkAction::Stop))));
        assert_eq!(fs::metadata(&stopped).unwrap().len(), 16);
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("old.txt");
        let dst = temp_dir.path().join("copy.txt");
        fs::write(&src, b"content").expect("Failed to write source");
        let past = filetime::FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&src, past).expect("Failed to set mtime");

        let (result, _) = collect_ticks(&NativeCopier::new(), &src, &dst, true);
        result.expect("Copy should succeed");
        let copied = filetime::FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(copied.unix_seconds(), 1_000_000_000);
    }

    #[test]
    fn test_move_file_replaces_existing() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("a.txt");
        let dst = temp_dir.path().join("b.txt");
        fs::write(&src, b"fresh").expect("Failed to write source");
        fs::write(&dst, b"stale").expect("Failed to write dest");

        NativeCopier::new()
            .move_path(&src, &dst, &mut |_| ChunkAction::Continue, MoveFlags::replace_all())
            .expect("Move should succeed");
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"fresh");
    }

    #[test]
    fn test_move_refuses_existing_without_replace() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("a.txt");
        let dst = temp_dir.path().join("b.txt");
        fs::write(&src, b"a").expect("Failed to write source");
        fs::write(&dst, b"b").expect("Failed to write dest");

        let result = NativeCopier::new().move_path(
            &src,
            &dst,
            &mut |_| ChunkAction::Continue,
            MoveFlags::default(),
        );
        assert!(matches!(result, Err(PrimitiveError::DestinationExists(_))));
        assert!(src.exists());
    }

    #[test]
    fn test_move_dir_by_copy() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("tree");
        fs::create_dir_all(src.join("sub")).expect("Failed to create tree");
        fs::write(src.join("one.txt"), b"1").expect("Failed to write one");
        fs::write(src.join("sub").join("two.txt"), b"22").expect("Failed to write two");
        let dst = temp_dir.path().join("moved");

        let mut last = None;
        NativeCopier::new()
            .move_dir_by_copy(
                &src,
                &dst,
                &mut |chunk| {
                    last = Some(chunk);
                    ChunkAction::Continue
                },
                MoveFlags::replace_all(),
            )
            .expect("Directory move should succeed");

        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("sub").join("two.txt")).unwrap(), b"22");
        let last = last.expect("Expected progress ticks");
        assert_eq!(last.total, 3);
        assert_eq!(last.transferred, 3);
    }
}
