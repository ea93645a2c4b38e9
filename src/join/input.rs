//! Opening every source before the first byte is written.

use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

/// An opened source with its size captured at open time.
///
/// `offset` is the next byte to read; the bytes still owed to the output
/// are `size - offset`.
#[derive(Debug)]
pub(crate) struct SourceFile {
    path: PathBuf,
    file: File,
    size: u64,
    offset: u64,
    dev: u64,
    ino: u64,
}

impl SourceFile {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn file(&self) -> &File {
        &self.file
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn remaining(&self) -> u64 {
        self.size - self.offset
    }

    /// Mark `n` more bytes as delivered. Never moves past `size`.
    pub(crate) fn advance(&mut self, n: u64) {
        debug_assert!(n <= self.remaining());
        self.offset = self.offset.saturating_add(n).min(self.size);
    }

    /// Device and inode of the opened file.
    pub(crate) fn identity(&self) -> (u64, u64) {
        (self.dev, self.ino)
    }
}

/// Open every path in order, read-only.
///
/// Fails on the first path that cannot be opened or that is a directory,
/// dropping (and so closing) everything opened so far. Paths are neither
/// reordered nor deduplicated.
pub(crate) fn open_sources<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let open_error = |source| Error::OpenSource {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)
            .map_err(open_error)?;
        let meta = file.metadata().map_err(open_error)?;
        if meta.is_dir() {
            return Err(Error::IsADirectory(path.to_path_buf()));
        }

        sources.push(SourceFile {
            path: path.to_path_buf(),
            file,
            size: meta.len(),
            offset: 0,
            dev: meta.dev(),
            ino: meta.ino(),
        });
    }
    Ok(sources)
}
