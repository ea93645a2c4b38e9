//! joinfiles - Join files inside the kernel
//!
//! Concatenates files into one with copy_file_range, FICLONERANGE or
//! sendfile, powered by filejoin.

use clap::{ArgAction, Parser};
use filejoin::{
    Error as JoinError, ErrorCode, JoinBuilder, JoinStats, create_progress_bar,
};
use std::path::PathBuf;
use thiserror::Error;
use tracing::Level;

/// joinfiles - Concatenate files without copying through user space
///
/// Writes SOURCE... in order into DESTINATION. When the kernel and the
/// filesystem allow it, DESTINATION is replaced only once the complete
/// output has been written.
///
/// Usage:
///   joinfiles SOURCE... DESTINATION
#[derive(Parser, Debug)]
#[command(name = "joinfiles", version, about, long_about = None)]
struct Args {
    /// Source files followed by the destination
    #[arg(required = true, value_name = "SOURCE... DESTINATION")]
    paths: Vec<PathBuf>,

    /// Quiet mode (no progress bar, errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose output (-v for a summary and info logs, -vv for debug logs)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Don't fsync the output before publishing (faster but less safe)
    #[arg(long)]
    no_sync: bool,

    /// Never use copy_file_range
    #[arg(long)]
    no_bulk_copy: bool,

    /// Never share extents with FICLONERANGE
    #[arg(long)]
    no_reflink: bool,

    /// Write DESTINATION in place instead of staging an O_TMPFILE
    #[arg(long)]
    no_tmpfile: bool,
}

type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
enum CliError {
    #[error("Missing destination operand after '{operand}'")]
    MissingDestinationOperand { operand: PathBuf },

    #[error(transparent)]
    Join(#[from] JoinError),
}

impl CliError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::MissingDestinationOperand { .. } => ErrorCode::InvalidInput,
            Self::Join(source) => source.code(),
        }
    }
}

fn exit_code_for(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::InvalidInput => 2,
        _ => 1,
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error[{}]: {}", error.code(), error);
        std::process::exit(exit_code_for(error.code()));
    }
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        Level::ERROR
    } else {
        match args.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Split the positional arguments into sources and destination.
fn split_paths(mut paths: Vec<PathBuf>) -> CliResult<(Vec<PathBuf>, PathBuf)> {
    if paths.len() < 2 {
        let operand = paths.pop().unwrap_or_default();
        return Err(CliError::MissingDestinationOperand { operand });
    }
    let dest = paths.pop().unwrap_or_default();
    Ok((paths, dest))
}

fn run() -> CliResult<()> {
    let args = Args::parse();
    init_logging(&args);

    let (sources, dest) = split_paths(args.paths.clone())?;

    let mut builder = JoinBuilder::new(&dest).sources(&sources);
    if args.no_sync {
        builder = builder.no_fsync();
    }
    if args.no_bulk_copy {
        builder = builder.no_bulk_copy();
    }
    if args.no_reflink {
        builder = builder.no_reflink();
    }
    if args.no_tmpfile {
        builder = builder.no_anonymous_staging();
    }

    let total: u64 = sources
        .iter()
        .filter_map(|p| p.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum();
    let pb = (!args.quiet).then(|| create_progress_bar(total));
    if let Some(pb) = &pb {
        let pb = pb.clone();
        builder = builder.on_progress(move |done, total| {
            pb.set_length(total);
            pb.set_position(done);
        });
    }

    let result = builder.run();
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    let stats = result?;

    if args.verbose > 0 {
        print_summary(&dest, &stats);
    }
    Ok(())
}

fn print_summary(dest: &std::path::Path, stats: &JoinStats) {
    eprintln!(
        "Joined {} files into {} ({}, {}) in {:.2?}",
        stats.files_joined,
        dest.display(),
        format_bytes(stats.bytes_written),
        stats.publication.as_str(),
        stats.duration
    );
    eprintln!(
        "  copy_file_range: {}, FICLONERANGE: {}, sendfile: {}",
        format_bytes(stats.bytes_bulk_copied),
        format_bytes(stats.bytes_cloned),
        format_bytes(stats.bytes_transferred)
    );
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
