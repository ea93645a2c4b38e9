//! Builder API for ergonomic join operations.
//!
//! The builder pattern provides a fluent interface for configuring and executing
//! joins. This is often more convenient than manually constructing
//! [`JoinOptions`].
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use filejoin::JoinBuilder;
//!
//! let stats = JoinBuilder::new("archive.tar")
//!     .sources(["archive.tar.aa", "archive.tar.ab", "archive.tar.ac"])
//!     .run()?;
//! println!("Joined {} files", stats.files_joined);
//! # Ok::<(), filejoin::Error>(())
//! ```
//!
//! ## Restricting Primitives
//!
//! ```no_run
//! use filejoin::JoinBuilder;
//!
//! // Plain sendfile, written in place, no fsync
//! let stats = JoinBuilder::new("out")
//!     .source("a")
//!     .source("b")
//!     .no_bulk_copy()
//!     .no_reflink()
//!     .no_anonymous_staging()
//!     .no_fsync()
//!     .run()?;
//! # Ok::<(), filejoin::Error>(())
//! ```

use crate::error::Result;
use crate::join::{JoinStats, ProgressCallback, join_files_with_progress};
use crate::options::JoinOptions;
use std::fmt;
use std::path::{Path, PathBuf};

/// A builder for configuring and executing a join.
///
/// Sources are joined in the order they are added; the same path may be
/// added more than once.
///
/// # Example
///
/// ```no_run
/// use filejoin::JoinBuilder;
///
/// let stats = JoinBuilder::new("/data/backup.img")
///     .sources(["/data/backup.img.1", "/data/backup.img.2"])
///     .on_progress(|done, total| eprintln!("{done}/{total}"))
///     .run()?;
/// # Ok::<(), filejoin::Error>(())
/// ```
pub struct JoinBuilder {
    destination: PathBuf,
    sources: Vec<PathBuf>,
    options: JoinOptions,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for JoinBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinBuilder")
            .field("destination", &self.destination)
            .field("sources", &self.sources)
            .field("options", &self.options)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl JoinBuilder {
    /// Create a new `JoinBuilder` writing to `destination`, with no sources
    /// and default options.
    pub fn new<P: AsRef<Path>>(destination: P) -> Self {
        Self {
            destination: destination.as_ref().to_path_buf(),
            sources: Vec::new(),
            options: JoinOptions::default(),
            progress: None,
        }
    }

    /// Append one source.
    #[must_use]
    pub fn source<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.sources.push(path.as_ref().to_path_buf());
        self
    }

    /// Append several sources, in iteration order.
    #[must_use]
    pub fn sources<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.sources
            .extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    /// Never use `copy_file_range`.
    #[must_use]
    pub fn no_bulk_copy(mut self) -> Self {
        self.options = self.options.without_bulk_copy();
        self
    }

    /// Never share extents with `FICLONERANGE`.
    ///
    /// Useful when the output must not share storage with its sources.
    #[must_use]
    pub fn no_reflink(mut self) -> Self {
        self.options = self.options.without_reflink();
        self
    }

    /// Write the destination in place instead of staging an unnamed file.
    ///
    /// The destination is truncated at the start and is incomplete until
    /// the join finishes.
    #[must_use]
    pub fn no_anonymous_staging(mut self) -> Self {
        self.options = self.options.without_anonymous_staging();
        self
    }

    /// Disable fsync before publishing.
    ///
    /// This improves performance but reduces durability guarantees.
    #[must_use]
    pub fn no_fsync(mut self) -> Self {
        self.options = self.options.without_fsync();
        self
    }

    /// Set a warning handler for non-fatal issues.
    ///
    /// The handler is called when a primitive turns out to be unavailable
    /// and the join falls back to the next one.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filejoin::JoinBuilder;
    ///
    /// let stats = JoinBuilder::new("out")
    ///     .source("a")
    ///     .on_warning(|msg| eprintln!("Warning: {}", msg))
    ///     .run()?;
    /// # Ok::<(), filejoin::Error>(())
    /// ```
    #[must_use]
    pub fn on_warning(mut self, handler: fn(&str)) -> Self {
        self.options = self.options.with_warn_handler(handler);
        self
    }

    /// Report `(bytes_written, total_bytes)` after every transfer step.
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Replace all options at once.
    #[must_use]
    pub fn options(mut self, options: JoinOptions) -> Self {
        self.options = options;
        self
    }

    /// The options the join will run with.
    pub fn join_options(&self) -> &JoinOptions {
        &self.options
    }

    /// Sources added so far.
    pub fn source_paths(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Execute the join.
    ///
    /// # Errors
    ///
    /// See [`join_files`](crate::join_files).
    pub fn run(self) -> Result<JoinStats> {
        join_files_with_progress(
            &self.sources,
            &self.destination,
            &self.options,
            self.progress.as_deref(),
        )
    }
}
