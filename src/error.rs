//! Error types for filejoin.
//!
//! This module provides the [`Error`] enum containing all possible errors
//! that can occur while joining files, the [`Result`] type alias, and the
//! stable [`ErrorCode`] classification used by the command line tool.
//!
//! # Error Categories
//!
//! | Category | Errors |
//! |----------|--------|
//! | Input | [`Error::NoSources`], [`Error::DestinationIsSource`] |
//! | Environment | [`Error::KernelProbe`] |
//! | Resources | [`Error::OpenSource`], [`Error::IsADirectory`], [`Error::ResolveDirectory`], [`Error::CreateOutput`], [`Error::BlockSize`] |
//! | Transfer | [`Error::Transfer`], [`Error::ShortRead`], [`Error::Sync`] |
//! | Publication | [`Error::Publish`], [`Error::RemoveExisting`] |
//!
//! Capability degradation (a primitive reporting that it is not available)
//! is never surfaced as an error; the copy engine absorbs it.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for filejoin operations.
///
/// This is a type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Check if an IO error indicates "no space left on device".
///
/// # Example
///
/// ```
/// use std::io;
/// use filejoin::is_no_space_error;
///
/// let error = io::Error::new(io::ErrorKind::StorageFull, "disk full");
/// assert!(is_no_space_error(&error));
/// ```
pub fn is_no_space_error(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::StorageFull || error.raw_os_error() == Some(libc::ENOSPC)
}

/// Stable, machine-friendly classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// The caller supplied unusable arguments.
    InvalidInput,
    /// The running kernel could not be identified.
    EnvironmentProbe,
    /// A source, the destination or filesystem information could not be acquired.
    ResourceAcquisition,
    /// Moving bytes into the staged output failed.
    Transfer,
    /// The staged output could not be given its final name.
    Publication,
    /// The destination filesystem ran out of space.
    NoSpace,
}

impl ErrorCode {
    /// Snake-case name of the code, as printed by the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::EnvironmentProbe => "environment_probe",
            Self::ResourceAcquisition => "resource_acquisition",
            Self::Transfer => "transfer",
            Self::Publication => "publication",
            Self::NoSpace => "no_space",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during a join.
///
/// Every variant names the operation that failed and, where one exists,
/// the path it was applied to.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No source files were given
    #[error("No source files given")]
    NoSources,

    /// The destination already exists and is one of the sources
    #[error("Destination is also a source: {0}")]
    DestinationIsSource(PathBuf),

    /// The running kernel's release could not be determined
    #[error("uname: cannot determine running kernel: {0}")]
    KernelProbe(#[source] io::Error),

    /// A source file could not be opened or inspected
    #[error("Cannot open: {path}: {source}")]
    OpenSource {
        /// Source path as given by the caller
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// A source is a directory
    #[error("Source is a directory: {0}")]
    IsADirectory(PathBuf),

    /// The directory that should hold the anonymous output could not be resolved
    #[error("realpath: cannot resolve directory of {path}: {source}")]
    ResolveDirectory {
        /// First source path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// The output file could not be created
    #[error("open(output): {path}: {source}")]
    CreateOutput {
        /// Destination path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// The filesystem block size of the output could not be queried
    #[error("fstatfs: {0}")]
    BlockSize(#[source] io::Error),

    /// A transfer primitive failed with an error that is not a degradation
    #[error("{op}: {path}: {source}")]
    Transfer {
        /// Name of the primitive (`copy_file_range`, `ficlone`, `sendfile`, `lseek`)
        op: &'static str,
        /// Source being drained
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// A source yielded fewer bytes than its size at open time
    #[error("Failed to read the input file completely: {path}: {remaining} of {expected} bytes missing")]
    ShortRead {
        /// Source path
        path: PathBuf,
        /// Size captured when the source was opened
        expected: u64,
        /// Bytes that could not be transferred
        remaining: u64,
    },

    /// Syncing the output to disk failed
    #[error("fsync(output): {0}")]
    Sync(#[source] io::Error),

    /// An existing destination could not be removed before publication
    #[error("unlink(output): {path}: {source}")]
    RemoveExisting {
        /// Destination path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// The anonymous output could not be linked at the destination
    #[error("linkat(output): {path}: {source}")]
    Publish {
        /// Destination path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
}

impl Error {
    /// Classify this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NoSources | Self::DestinationIsSource(_) => ErrorCode::InvalidInput,
            Self::KernelProbe(_) => ErrorCode::EnvironmentProbe,
            Self::OpenSource { .. }
            | Self::IsADirectory(_)
            | Self::ResolveDirectory { .. }
            | Self::BlockSize(_) => ErrorCode::ResourceAcquisition,
            Self::CreateOutput { source, .. } => {
                if is_no_space_error(source) {
                    ErrorCode::NoSpace
                } else {
                    ErrorCode::ResourceAcquisition
                }
            }
            Self::Transfer { source, .. } | Self::Sync(source) => {
                if is_no_space_error(source) {
                    ErrorCode::NoSpace
                } else {
                    ErrorCode::Transfer
                }
            }
            Self::ShortRead { .. } => ErrorCode::Transfer,
            Self::RemoveExisting { .. } | Self::Publish { .. } => ErrorCode::Publication,
        }
    }
}
