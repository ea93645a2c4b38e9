//! Configuration options for joins.
//!
//! This module provides [`JoinOptions`] for configuring which primitives a
//! join may use and how it reports non-fatal notices.
//!
//! # Example
//!
//! ```
//! use filejoin::JoinOptions;
//!
//! // Never clone extents, and skip the final fsync
//! let options = JoinOptions::default()
//!     .without_reflink()
//!     .without_fsync();
//! ```

use crate::probe::Capabilities;

/// Options for join operations.
///
/// Use [`Default::default()`] to get sensible defaults, then customize
/// using the builder methods.
///
/// The `bulk_copy`, `reflink` and `anonymous_staging` switches can only
/// narrow what the kernel probe allows. Turning one on never enables a
/// primitive the running system was found to lack.
///
/// # Default Values
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `bulk_copy` | `true` | Try `copy_file_range` first |
/// | `reflink` | `true` | Try `FICLONERANGE` on aligned ranges |
/// | `anonymous_staging` | `true` | Stage output with `O_TMPFILE` and link it at the end |
/// | `fsync` | `true` | Sync output before publishing |
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JoinOptions {
    /// Whether in-kernel `copy_file_range` may be used (default: true)
    pub bulk_copy: bool,

    /// Whether extent-sharing clones may be used (default: true)
    pub reflink: bool,

    /// Whether the output may be staged as an unnamed file (default: true)
    ///
    /// When false, or when the kernel or filesystem does not support it, the
    /// destination is created and truncated in place and fills up while
    /// the join runs.
    pub anonymous_staging: bool,

    /// Whether to sync the output to disk before it is published (default: true)
    pub fsync: bool,

    /// Callback for warnings (optional)
    ///
    /// Warnings report capability degradation, which never fails a join. If
    /// no handler is set and the `tracing` feature is enabled, they are logged
    /// at `INFO` level. Otherwise, warnings are silently ignored.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub warn_handler: Option<fn(&str)>,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            bulk_copy: true,
            reflink: true,
            anonymous_staging: true,
            fsync: true,
            warn_handler: None,
        }
    }
}

impl JoinOptions {
    /// Create options with a warning handler
    #[must_use]
    pub fn with_warn_handler(mut self, handler: fn(&str)) -> Self {
        self.warn_handler = Some(handler);
        self
    }

    /// Never use `copy_file_range`
    #[must_use]
    pub fn without_bulk_copy(mut self) -> Self {
        self.bulk_copy = false;
        self
    }

    /// Never clone extents
    #[must_use]
    pub fn without_reflink(mut self) -> Self {
        self.reflink = false;
        self
    }

    /// Write the destination in place instead of staging an unnamed file
    ///
    /// The destination is visible, and incomplete, for the duration of the join.
    #[must_use]
    pub fn without_anonymous_staging(mut self) -> Self {
        self.anonymous_staging = false;
        self
    }

    /// Disable fsync for faster (but less durable) joins
    #[must_use]
    pub fn without_fsync(mut self) -> Self {
        self.fsync = false;
        self
    }

    /// Narrow probed capabilities to what these options allow.
    pub(crate) fn restrict(&self, mut caps: Capabilities) -> Capabilities {
        if !self.bulk_copy {
            caps.disable_bulk_copy();
        }
        if !self.reflink {
            caps.disable_reflink();
        }
        if !self.anonymous_staging {
            caps.disable_anonymous_tmpfile();
        }
        caps
    }

    pub(crate) fn warn(&self, msg: &str) {
        if let Some(handler) = self.warn_handler {
            handler(msg);
        } else {
            #[cfg(feature = "tracing")]
            tracing::info!("{}", msg);
        }
    }
}
