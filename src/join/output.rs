//! Staging the destination file.
//!
//! The output is preferably an unnamed `O_TMPFILE` inside the directory of
//! the first source; nothing appears at the destination path until the
//! publish step links it there. When that is not possible the destination
//! is created and truncated directly.

use super::utils::{block_size, retry_on_interrupt};
use crate::error::{Error, Result};
use crate::options::JoinOptions;
use crate::probe::Capabilities;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Permission bits requested for the output, before umask.
const OUTPUT_MODE: u32 = 0o644;

/// How the output was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Staging {
    /// Unnamed file; must be linked to become visible.
    Anonymous,
    /// Created at the destination path and visible from the start.
    Named,
}

/// The file receiving the joined bytes.
#[derive(Debug)]
pub(crate) struct OutputFile {
    file: File,
    destination: PathBuf,
    staging: Staging,
    written: u64,
    block_size: u64,
}

impl OutputFile {
    pub(crate) fn file(&self) -> &File {
        &self.file
    }

    pub(crate) fn is_anonymous(&self) -> bool {
        self.staging == Staging::Anonymous
    }

    /// Bytes landed so far; also the offset the next byte is written at.
    pub(crate) fn written(&self) -> u64 {
        self.written
    }

    pub(crate) fn block_size(&self) -> u64 {
        self.block_size
    }

    pub(crate) fn advance(&mut self, n: u64) {
        self.written += n;
    }

    pub(crate) fn sync(&self) -> Result<()> {
        retry_on_interrupt(|| self.file.sync_all()).map_err(Error::Sync)
    }

    pub(crate) fn into_parts(self) -> (File, PathBuf) {
        (self.file, self.destination)
    }
}

/// Directory containing the symlink-free location of `path`.
fn resolved_parent(path: &Path) -> io::Result<PathBuf> {
    let real = fs::canonicalize(path)?;
    Ok(real
        .parent()
        .map_or_else(|| PathBuf::from("/"), Path::to_path_buf))
}

fn open_anonymous(dir: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_TMPFILE)
        .mode(OUTPUT_MODE)
        .open(dir)
}

fn open_named(destination: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(OUTPUT_MODE)
        .open(destination)
}

/// Create the output for a join whose first source is `first_source`.
///
/// If anonymous staging is allowed, an unnamed file is created next to the
/// resolved first source; sources and destination are expected to share a
/// filesystem. Any failure there clears the capability and falls back to
/// creating `destination` in place.
///
/// # Errors
///
/// - [`Error::ResolveDirectory`] if the first source cannot be resolved
/// - [`Error::CreateOutput`] if the named fallback cannot be created either
/// - [`Error::BlockSize`] if the filesystem block size cannot be read
pub(crate) fn stage_output(
    first_source: &Path,
    destination: &Path,
    caps: &mut Capabilities,
    options: &JoinOptions,
) -> Result<OutputFile> {
    let mut staged = None;
    if caps.anonymous_tmpfile() {
        let dir = resolved_parent(first_source).map_err(|source| Error::ResolveDirectory {
            path: first_source.to_path_buf(),
            source,
        })?;
        match open_anonymous(&dir) {
            Ok(file) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(dir = %dir.display(), "staging unnamed output");
                staged = Some((file, Staging::Anonymous));
            }
            Err(e) => {
                options.warn(&format!(
                    "Cannot create unnamed file in {}: {}; writing {} in place",
                    dir.display(),
                    e,
                    destination.display()
                ));
                caps.disable_anonymous_tmpfile();
            }
        }
    }

    let (file, staging) = match staged {
        Some(staged) => staged,
        None => {
            let file = open_named(destination).map_err(|source| Error::CreateOutput {
                path: destination.to_path_buf(),
                source,
            })?;
            (file, Staging::Named)
        }
    };

    let block_size = block_size(&file).map_err(Error::BlockSize)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        destination = %destination.display(),
        ?staging,
        block_size,
        "staged output"
    );

    Ok(OutputFile {
        file,
        destination: destination.to_path_buf(),
        staging,
        written: 0,
        block_size,
    })
}
