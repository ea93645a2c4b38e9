//! Joining files.
//!
//! A join runs in five steps:
//!
//! 1. Probe the kernel and narrow the result by [`JoinOptions`]
//! 2. Open every source, recording its size (nothing is written yet)
//! 3. Stage the output, unnamed if possible
//! 4. Drain each source into the output through the copy engine
//! 5. Sync the output and publish it at the destination
//!
//! Sources are opened before the output is staged, so a missing or
//! unreadable source leaves an existing destination untouched. Once the
//! output is staged, a failure drops it: an unnamed output disappears with
//! its descriptor, while an output written in place stays behind partially
//! filled.

mod engine;
mod input;
mod output;
mod publish;
mod utils;

pub use publish::Publication;

use crate::error::{Error, Result};
use crate::options::JoinOptions;
use crate::probe::{Capabilities, probe_capabilities};
use engine::{CopyEngine, Kernel, Primitives};
use input::open_sources;
use output::stage_output;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::{Duration, Instant};

/// Callback for progress updates: `(bytes_written, total_bytes)`.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Statistics from a join operation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct JoinStats {
    /// Number of sources concatenated
    pub files_joined: u64,
    /// Total bytes in the output
    pub bytes_written: u64,
    /// Bytes moved with `copy_file_range`
    pub bytes_bulk_copied: u64,
    /// Bytes shared with `FICLONERANGE`
    pub bytes_cloned: u64,
    /// Bytes moved with `sendfile`
    pub bytes_transferred: u64,
    /// How the output reached the destination
    pub publication: Publication,
    /// Capabilities left at the end of the join, after any degradation
    pub capabilities: Capabilities,
    /// Duration of the join
    pub duration: Duration,
}

/// Concatenate `sources`, in order, into `destination`.
///
/// An existing destination is replaced. If the kernel and the filesystem
/// allow it, the destination only changes once the complete output has been
/// written (and synced, unless disabled).
///
/// # Errors
///
/// - [`Error::NoSources`] if `sources` is empty
/// - [`Error::KernelProbe`] if the running kernel cannot be identified
/// - [`Error::OpenSource`] / [`Error::IsADirectory`] for unusable sources
/// - [`Error::DestinationIsSource`] if the destination is one of the sources
/// - any staging, transfer or publication error; see [`Error`]
///
/// # Example
///
/// ```no_run
/// use filejoin::{join_files, JoinOptions};
///
/// let stats = join_files(&["part1", "part2"], "whole", &JoinOptions::default())?;
/// println!("wrote {} bytes", stats.bytes_written);
/// # Ok::<(), filejoin::Error>(())
/// ```
pub fn join_files<S: AsRef<Path>, D: AsRef<Path>>(
    sources: &[S],
    destination: D,
    options: &JoinOptions,
) -> Result<JoinStats> {
    join_files_with_progress(sources, destination, options, None)
}

/// Like [`join_files`], reporting progress after every transfer step.
pub(crate) fn join_files_with_progress<S: AsRef<Path>, D: AsRef<Path>>(
    sources: &[S],
    destination: D,
    options: &JoinOptions,
    progress: Option<&(dyn Fn(u64, u64) + Send + Sync)>,
) -> Result<JoinStats> {
    if sources.is_empty() {
        return Err(Error::NoSources);
    }
    let caps = options.restrict(probe_capabilities()?);
    join_with(Kernel, caps, sources, destination.as_ref(), options, progress)
}

/// Fail if `destination` exists and is the same file as one of `sources`.
fn check_not_a_source(destination: &Path, sources: &[input::SourceFile]) -> Result<()> {
    let Ok(meta) = fs::metadata(destination) else {
        return Ok(());
    };
    let identity = (meta.dev(), meta.ino());
    if sources.iter().any(|s| s.identity() == identity) {
        return Err(Error::DestinationIsSource(destination.to_path_buf()));
    }
    Ok(())
}

fn join_with<P: Primitives, S: AsRef<Path>>(
    primitives: P,
    mut caps: Capabilities,
    sources: &[S],
    destination: &Path,
    options: &JoinOptions,
    progress: Option<&(dyn Fn(u64, u64) + Send + Sync)>,
) -> Result<JoinStats> {
    let start = Instant::now();
    if sources.is_empty() {
        return Err(Error::NoSources);
    }

    let opened = open_sources(sources)?;
    check_not_a_source(destination, &opened)?;
    let total: u64 = opened.iter().map(input::SourceFile::size).sum();

    #[cfg(feature = "tracing")]
    tracing::info!(
        sources = opened.len(),
        total_bytes = total,
        destination = %destination.display(),
        "joining"
    );

    let mut out = stage_output(opened[0].path(), destination, &mut caps, options)?;
    let mut engine = CopyEngine::new(primitives, out.block_size(), options, progress, total);
    let files_joined = opened.len() as u64;
    for mut source in opened {
        engine.drain(&mut caps, &mut source, &mut out)?;
    }

    if options.fsync {
        out.sync()?;
    }
    let bytes_written = out.written();
    let tally = engine.tally();
    let publication = publish::publish(out)?;

    let stats = JoinStats {
        files_joined,
        bytes_written,
        bytes_bulk_copied: tally.bulk_copied,
        bytes_cloned: tally.cloned,
        bytes_transferred: tally.transferred,
        publication,
        capabilities: caps,
        duration: start.elapsed(),
    };

    #[cfg(feature = "tracing")]
    tracing::info!(
        bytes = stats.bytes_written,
        bulk_copied = stats.bytes_bulk_copied,
        cloned = stats.bytes_cloned,
        transferred = stats.bytes_transferred,
        publication = stats.publication.as_str(),
        "join complete"
    );

    Ok(stats)
}
