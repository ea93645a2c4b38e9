//! # filejoin
//!
//! Concatenate files into one on Linux, with the data moved inside the kernel.
//!
//! ## Core Features
//!
//! - **In-kernel copying**: `copy_file_range(2)` first, then extent sharing
//!   with `FICLONERANGE`, then `sendfile(2)`; user space never sees the bytes
//! - **Graceful degradation**: a primitive that turns out to be unavailable
//!   is switched off for the rest of the join and the next one takes over
//!   at the exact byte where it stopped
//! - **Atomic replacement**: the output is staged as an unnamed `O_TMPFILE`
//!   and only linked at the destination once complete and synced
//! - **Kernel probing**: primitives older kernels lack are never attempted
//!
//! ## Quick Start with Builder API
//!
//! ```no_run
//! use filejoin::JoinBuilder;
//!
//! let stats = JoinBuilder::new("video.mkv")
//!     .source("video.mkv.000")
//!     .source("video.mkv.001")
//!     .run()?;
//! println!("Joined {} files ({} bytes)", stats.files_joined, stats.bytes_written);
//! # Ok::<(), filejoin::Error>(())
//! ```
//!
//! ## Function API
//!
//! ```no_run
//! use filejoin::{join_files, JoinOptions};
//!
//! let options = JoinOptions::default()
//!     .without_reflink()          // Always copy, never share extents
//!     .without_fsync();           // Faster but less durable
//!
//! let stats = join_files(&["a", "b", "c"], "abc", &options)?;
//! println!("{:?}", stats.publication);
//! # Ok::<(), filejoin::Error>(())
//! ```
//!
//! ## Safety Guarantees
//!
//! ### Atomic Replacement
//!
//! When the kernel (3.11+) and the filesystem support `O_TMPFILE`, the
//! output has no name until it is linked at the destination. A failed or
//! interrupted join leaves the destination exactly as it was. Otherwise the
//! destination is truncated and written in place.
//!
//! ### Sources First
//!
//! Every source is opened before anything is created, so a typo in a
//! source path never destroys an existing destination. A destination that
//! is itself one of the sources is refused.
//!
//! ## Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `progress` | Progress bar support with indicatif |
//! | `tracing` | Structured logging with tracing crate |
//! | `serde` | Serialization for [`JoinOptions`] and [`JoinStats`] |
//! | `full` | Enable all optional features |

#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(target_os = "linux"))]
compile_error!("filejoin relies on Linux-only system calls");

mod builder;
mod error;
mod join;
mod options;
pub mod probe;

#[cfg(feature = "progress")]
mod progress;

pub use builder::JoinBuilder;
pub use error::{Error, ErrorCode, Result, is_no_space_error};
pub use join::{JoinStats, ProgressCallback, Publication, join_files};
pub use options::JoinOptions;
pub use probe::{Capabilities, KernelVersion, probe_capabilities};

#[cfg(feature = "progress")]
#[cfg_attr(docsrs, doc(cfg(feature = "progress")))]
pub use progress::create_progress_bar;
