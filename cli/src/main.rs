//! transfer - Command-line interface for the transfer engine.
//!
//! Copies or moves a file or directory tree, drawing a progress line on
//! stderr. Ctrl-C cancels cooperatively: files already copied stay in place.

mod logging;

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use transfer_engine::{
    format_rate, format_size, CancelFlag, NativeCopier, ProgressCallback, ProgressError,
    SuffixStyle, TransferManager, TransferOptions, TransferOutcome, TransferProgress,
    TransferReport,
};

/// Minimum time between two redraws of the progress line
const REDRAW_INTERVAL: Duration = Duration::from_millis(200);

/// transfer - copy or move files with progress
#[derive(Parser, Debug)]
#[command(name = "transfer")]
#[command(version = "0.1.0")]
#[command(about = "Copy or move files and directory trees with progress tracking")]
struct Args {
    /// Source file or directory
    #[arg(value_name = "SRC")]
    src: PathBuf,

    /// Destination file or directory
    #[arg(value_name = "DST")]
    dst: PathBuf,

    /// Move instead of copy
    #[arg(long = "move")]
    move_source: bool,

    /// Keep copying the rest of a tree when a file fails
    #[arg(long)]
    continue_on_failure: bool,

    /// Copy the contents of SRC into DST instead of DST/<name of SRC>
    #[arg(long)]
    contents_only: bool,

    /// Size units: windows, binary, or metric
    #[arg(long, value_name = "STYLE", default_value = "windows")]
    style: String,

    /// Decimal places for sizes and rates
    #[arg(long, value_name = "N", default_value_t = 1, allow_negative_numbers = true)]
    decimals: i32,

    /// Read/write chunk size in bytes
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Do not draw the progress line
    #[arg(long, short)]
    quiet: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Progress line renderer for stderr.
struct CliProgress {
    style: SuffixStyle,
    decimals: i32,
    quiet: bool,
    last_redraw: Option<Instant>,
}

impl CliProgress {
    fn new(style: SuffixStyle, decimals: i32, quiet: bool) -> Self {
        CliProgress {
            style,
            decimals,
            quiet,
            last_redraw: None,
        }
    }

    fn progress_bar(percent: f64) -> String {
        let filled = ((percent.clamp(0.0, 100.0) / 5.0) as usize).min(20);
        format!("[{}{}]", "=".repeat(filled), " ".repeat(20 - filled))
    }

    fn render(&self, progress: &TransferProgress) -> Result<String, ProgressError> {
        let size = |bytes| {
            format_size(bytes, self.style, self.decimals)
                .map_err(|e| ProgressError::new(e.to_string()))
        };
        let percent = progress.percentage().unwrap_or(100.0);
        let rate = format_rate(progress.bytes_per_second(), self.style, self.decimals)
            .map_err(|e| ProgressError::new(e.to_string()))?;

        Ok(format!(
            "{} {:5.1}% | {} / {} | {}",
            Self::progress_bar(percent),
            percent,
            size(progress.transferred)?,
            size(progress.total)?,
            rate
        ))
    }
}

impl ProgressCallback for CliProgress {
    fn on_progress(&mut self, progress: &TransferProgress) -> Result<(), ProgressError> {
        if self.quiet {
            return Ok(());
        }

        // Always draw the final sample of a stream so the line ends at 100%
        let finished = progress.transferred >= progress.total;
        if let Some(last) = self.last_redraw {
            if !finished && last.elapsed() < REDRAW_INTERVAL {
                return Ok(());
            }
        }
        self.last_redraw = Some(Instant::now());

        let line = self.render(progress)?;
        eprint!("\r{line}   ");
        let _ = std::io::stderr().flush();
        Ok(())
    }
}

fn print_summary(report: &TransferReport, elapsed: Duration, style: SuffixStyle, decimals: i32) {
    eprintln!();
    eprintln!("Transfer {}", report.outcome);
    eprintln!(
        "Summary: {} copied, {} failed",
        report.files_copied,
        report.failures.len()
    );
    if let Ok(total) = format_size(report.total_bytes, style, decimals) {
        eprintln!("Total size: {total}");
    }
    eprintln!("Elapsed: {:.1}s", elapsed.as_secs_f64());

    if !report.failures.is_empty() {
        eprintln!();
        eprintln!("Failed files:");
        for failure in &report.failures {
            eprintln!("  {}: {}", failure.path.display(), failure.reason);
        }
    }
}

fn exit_code(report: &TransferReport) -> i32 {
    match report.outcome {
        TransferOutcome::Success if report.failures.is_empty() => 0,
        TransferOutcome::Success | TransferOutcome::Failed => 1,
        TransferOutcome::Cancelled => 130,
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!();
            eprintln!("Cancelling...");
            on_signal.cancel();
        }
    });

    let code = match run_cli(&args, cancel).await {
        Ok(report) => exit_code(&report),
        Err(msg) => {
            eprintln!("Error: {msg}");
            2
        }
    };

    std::process::exit(code);
}

/// Main CLI logic - separated for testability
async fn run_cli(args: &Args, cancel: CancelFlag) -> Result<TransferReport, String> {
    let style = SuffixStyle::parse(&args.style).ok_or_else(|| {
        format!(
            "Invalid style '{}'. Must be 'windows', 'binary', or 'metric'",
            args.style
        )
    })?;

    // Reject a bad precision before anything is touched
    format_size(0, style, args.decimals).map_err(|e| e.to_string())?;

    let mut copier = NativeCopier::new();
    if let Some(chunk_size) = args.chunk_size {
        if chunk_size == 0 {
            return Err("Chunk size must be at least 1 byte".to_string());
        }
        copier = copier.with_chunk_size(chunk_size);
    }
    let manager = TransferManager::with_primitive(copier);
    let progress = CliProgress::new(style, args.decimals, args.quiet || args.json);

    let started = Instant::now();
    let report = if args.move_source {
        let outcome = manager
            .move_async(args.src.clone(), args.dst.clone(), progress, cancel)
            .await
            .map_err(|e| e.to_string())?;
        TransferReport::new(outcome)
    } else {
        let options = TransferOptions::default()
            .with_continue_on_failure(args.continue_on_failure)
            .with_copy_contents_only(args.contents_only);
        manager
            .copy_async_with_report(args.src.clone(), args.dst.clone(), progress, options, cancel)
            .await
            .map_err(|e| e.to_string())?
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{json}");
    } else if !args.quiet {
        print_summary(&report, started.elapsed(), style, args.decimals);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(src: PathBuf, dst: PathBuf) -> Args {
        Args {
            src,
            dst,
            move_source: false,
            continue_on_failure: false,
            contents_only: false,
            style: "windows".to_string(),
            decimals: 1,
            chunk_size: None,
            json: false,
            quiet: true,
            verbose: 0,
        }
    }

    fn source_tree() -> TempDir {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(src_dir.path().join("test.txt"), "hello").expect("Failed to write file");
        std::fs::create_dir(src_dir.path().join("sub")).expect("Failed to create subdir");
        std::fs::write(src_dir.path().join("sub").join("more.txt"), "world")
            .expect("Failed to write file");
        src_dir
    }

    #[tokio::test]
    async fn test_cli_copies_directory_contents() {
        let src_dir = source_tree();
        let dst_dir = TempDir::new().expect("Failed to create temp dir");

        let mut args = args(src_dir.path().to_path_buf(), dst_dir.path().to_path_buf());
        args.contents_only = true;
        args.chunk_size = Some(2);

        let report = run_cli(&args, CancelFlag::new()).await.expect("CLI should succeed");
        assert_eq!(exit_code(&report), 0);
        assert_eq!(report.files_copied, 2);
        assert!(dst_dir.path().join("sub").join("more.txt").is_file());
    }

    #[tokio::test]
    async fn test_cli_moves_file() {
        let src_dir = source_tree();
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let src = src_dir.path().join("test.txt");

        let mut args = args(src.clone(), dst_dir.path().to_path_buf());
        args.move_source = true;

        let report = run_cli(&args, CancelFlag::new()).await.expect("CLI should succeed");
        assert_eq!(report.outcome, TransferOutcome::Success);
        assert!(!src.exists());
        assert!(dst_dir.path().join("test.txt").is_file());
    }

    #[tokio::test]
    async fn test_cli_reports_cancellation() {
        let src_dir = source_tree();
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let cancel = CancelFlag::new();
        cancel.cancel();

        let args = args(src_dir.path().to_path_buf(), dst_dir.path().to_path_buf());
        let report = run_cli(&args, cancel).await.expect("Cancellation is not an error");
        assert_eq!(exit_code(&report), 130);
    }

    #[tokio::test]
    async fn test_cli_rejects_missing_source() {
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let args = args(PathBuf::from("/nonexistent/path"), dst_dir.path().to_path_buf());
        let result = run_cli(&args, CancelFlag::new()).await;
        assert!(result.is_err(), "CLI should reject missing source");
    }

    #[tokio::test]
    async fn test_cli_rejects_invalid_style() {
        let src_dir = source_tree();
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let mut args = args(src_dir.path().to_path_buf(), dst_dir.path().to_path_buf());
        args.style = "furlongs".to_string();

        let result = run_cli(&args, CancelFlag::new()).await;
        assert!(result.is_err(), "CLI should reject invalid style");
    }

    #[tokio::test]
    async fn test_cli_rejects_negative_decimals() {
        let src_dir = source_tree();
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let mut args = args(src_dir.path().to_path_buf(), dst_dir.path().to_path_buf());
        args.decimals = -1;

        let result = run_cli(&args, CancelFlag::new()).await;
        assert!(result.is_err(), "CLI should reject negative decimals");
        assert_eq!(std::fs::read_dir(dst_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_progress_line() {
        let progress = CliProgress::new(SuffixStyle::Binary, 1, false);
        let mut sample = TransferProgress::new(Instant::now(), 512);
        sample.transferred = 512;
        sample.total = 1024;

        let line = progress.render(&sample).expect("Valid precision");
        assert!(line.starts_with("[==========          ]"), "{line}");
        assert!(line.contains(" 50.0%"));
        assert!(line.contains("512.0 bytes / 1.0 KiB"));
    }

    #[test]
    fn test_exit_codes() {
        let mut report = TransferReport::new(TransferOutcome::Success);
        assert_eq!(exit_code(&report), 0);
        report.failures.push(transfer_engine::FileFailure {
            path: PathBuf::from("x"),
            reason: "boom".to_string(),
        });
        assert_eq!(exit_code(&report), 1);
        assert_eq!(exit_code(&TransferReport::new(TransferOutcome::Failed)), 1);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "transfer",
            "a",
            "b",
            "--move",
            "--style",
            "metric",
            "--decimals",
            "2",
            "-vv",
        ])
        .expect("Arguments should parse");
        assert!(args.move_source);
        assert_eq!(args.style, "metric");
        assert_eq!(args.decimals, 2);
        assert_eq!(args.verbose, 2);
    }
}
