//! # Transfer Engine - File Copy/Move Library
//!
//! A headless engine for copying and moving files and directory trees with
//! progress reporting and cooperative cancellation. Designed as the
//! foundation for multiple front ends (CLI, GUI, services).
//!
//! ## Overview
//!
//! The engine features:
//! - Copy or move of a single file or a whole tree through one entry point
//! - Tree-wide progress (bytes, percentage, rate) via a caller-supplied sink
//! - Continue-on-failure for bulk directory copies, with the failed files reported
//! - Cooperative cancellation checked between directories, between files and per chunk
//! - Blocking and async (tokio) forms of every operation
//!
//! ## Basic Usage
//!
//! ```no_run
//! use transfer_engine::{
//!     SuffixStyle, TransferManager, TransferOptions, TransferOutcome, TransferProgress,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = TransferManager::new();
//! let mut show = |p: &TransferProgress| {
//!     if let (Some(pct), Ok(rate)) = (p.percentage(), p.rate_formatted(SuffixStyle::Windows, 1)) {
//!         println!("{pct:.1}% at {rate}");
//!     }
//! };
//!
//! let options = TransferOptions::default().with_continue_on_failure(true);
//! let outcome = manager.copy("C:\\source", "D:\\destination", &mut show, options)?;
//! assert_eq!(outcome, TransferOutcome::Success);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Value types (TransferOutcome, SuffixStyle, TreeSizeInfo, TransferReport)
//! - **error**: Error types
//! - **size_format**: Human-readable byte counts and rates
//! - **progress**: Progress samples and the sink trait
//! - **cancel**: Cancellation flag
//! - **primitive**: Chunked copy/move primitive and its std implementation
//! - **fs_ops**: Path classification and tree enumeration
//! - **scan**: Tree size measurement
//! - **file_transfer**: Single file copy/move
//! - **dir_transfer**: Directory tree copy
//! - **manager**: Public entry point

pub mod cancel;
pub mod dir_transfer;
pub mod error;
pub mod file_transfer;
pub mod fs_ops;
pub mod manager;
pub mod model;
pub mod primitive;
pub mod progress;
pub mod scan;
pub mod size_format;

// Re-export main types and functions
pub use cancel::CancelFlag;
pub use error::EngineError;
pub use manager::TransferManager;
pub use model::{
    FileFailure, SuffixStyle, TransferOptions, TransferOutcome, TransferReport, TreeSizeInfo,
};
pub use primitive::{
    ChunkAction, ChunkProgress, CopyPrimitive, MoveFlags, NativeCopier, PrimitiveError,
};
pub use progress::{NoProgress, ProgressCallback, ProgressError, TransferProgress};
pub use scan::measure;
pub use size_format::{format_rate, format_size};
