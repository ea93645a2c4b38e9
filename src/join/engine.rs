//! The per-source transfer state machine.
//!
//! Each source is drained into the output by trying three strategies in a
//! fixed order:
//!
//! 1. **Bulk copy**: `copy_file_range(2)` in chunks of up to 1 GiB.
//! 2. **Reflink**: one `FICLONERANGE` for the whole remaining range, only
//!    when more than a block remains and both offsets are block-aligned.
//! 3. **Transfer**: `sendfile(2)` in chunks just under 2 GiB.
//!
//! A strategy that reports its primitive as unavailable clears the matching
//! capability for the rest of the join, and the next strategy picks up the
//! same source where the previous one stopped. Any other failure ends the
//! join. If all strategies ran and bytes are still owed, the source could
//! not be read completely.

use super::input::SourceFile;
use super::output::OutputFile;
use super::utils::{self, retry_on_interrupt};
use crate::error::{Error, Result};
use crate::options::JoinOptions;
use crate::probe::Capabilities;
use std::fs::File;
use std::io;

/// Largest request handed to a single `copy_file_range` call.
pub(crate) const BULK_COPY_CHUNK: u64 = 1 << 30;

/// Largest request handed to a single `sendfile` call (the kernel's own cap).
pub(crate) const TRANSFER_CHUNK: u64 = 0x7fff_f000;

/// Kernel primitives the engine drives.
///
/// The production implementation is [`Kernel`]. Offsets passed by mutable
/// reference are advanced by the primitive on success; output bytes always
/// go to the current file position of `dst`.
pub(crate) trait Primitives {
    fn copy_file_range(
        &mut self,
        src: &File,
        src_offset: &mut u64,
        dst: &File,
        len: usize,
    ) -> io::Result<usize>;

    fn clone_range(
        &mut self,
        src: &File,
        src_offset: u64,
        len: u64,
        dst: &File,
        dst_offset: u64,
    ) -> io::Result<()>;

    fn sendfile(
        &mut self,
        src: &File,
        src_offset: &mut u64,
        dst: &File,
        len: usize,
    ) -> io::Result<usize>;

    /// Move the position of `dst` to its end and return it.
    fn seek_to_end(&mut self, dst: &File) -> io::Result<u64>;
}

/// The real system calls.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Kernel;

impl Primitives for Kernel {
    fn copy_file_range(
        &mut self,
        src: &File,
        src_offset: &mut u64,
        dst: &File,
        len: usize,
    ) -> io::Result<usize> {
        utils::copy_file_range(src, src_offset, dst, len)
    }

    fn clone_range(
        &mut self,
        src: &File,
        src_offset: u64,
        len: u64,
        dst: &File,
        dst_offset: u64,
    ) -> io::Result<()> {
        utils::clone_range(src, src_offset, len, dst, dst_offset)
    }

    fn sendfile(
        &mut self,
        src: &File,
        src_offset: &mut u64,
        dst: &File,
        len: usize,
    ) -> io::Result<usize> {
        utils::sendfile(src, src_offset, dst, len)
    }

    fn seek_to_end(&mut self, dst: &File) -> io::Result<u64> {
        utils::seek_to_end(dst)
    }
}

/// Transfer strategies in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    BulkCopy,
    Reflink,
    Transfer,
}

pub(crate) const STRATEGY_ORDER: [Strategy; 3] =
    [Strategy::BulkCopy, Strategy::Reflink, Strategy::Transfer];

/// `copy_file_range` is missing or refuses this pairing of files.
fn bulk_copy_unavailable(error: &io::Error) -> bool {
    matches!(
        error.raw_os_error(),
        Some(libc::ENOSYS | libc::EOPNOTSUPP | libc::EXDEV)
    )
}

/// `FICLONERANGE` is missing, unsupported by the filesystem, or not
/// permitted for these two descriptors.
fn reflink_unavailable(error: &io::Error) -> bool {
    matches!(
        error.raw_os_error(),
        Some(
            libc::ENOSYS
                | libc::EOPNOTSUPP
                | libc::ENOTTY
                | libc::EBADF
                | libc::EPERM
                | libc::EXDEV
                | libc::EINVAL
        )
    )
}

/// Bytes moved by each strategy over a join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    pub bulk_copied: u64,
    pub cloned: u64,
    pub transferred: u64,
}

/// Drains sources into an output, one after another.
pub(crate) struct CopyEngine<'a, P> {
    primitives: P,
    block_size: u64,
    options: &'a JoinOptions,
    progress: Option<&'a (dyn Fn(u64, u64) + Send + Sync)>,
    total: u64,
    tally: Tally,
}

impl<'a, P: Primitives> CopyEngine<'a, P> {
    /// `total` is the sum of all source sizes, used for progress reports.
    pub(crate) fn new(
        primitives: P,
        block_size: u64,
        options: &'a JoinOptions,
        progress: Option<&'a (dyn Fn(u64, u64) + Send + Sync)>,
        total: u64,
    ) -> Self {
        Self {
            primitives,
            block_size: block_size.max(1),
            options,
            progress,
            total,
            tally: Tally::default(),
        }
    }

    pub(crate) fn tally(&self) -> Tally {
        self.tally
    }

    /// Move every remaining byte of `src` to the end of `out`.
    ///
    /// # Errors
    ///
    /// - [`Error::Transfer`] if a primitive fails for a reason other than
    ///   being unavailable
    /// - [`Error::ShortRead`] if bytes are still owed after all strategies
    pub(crate) fn drain(
        &mut self,
        caps: &mut Capabilities,
        src: &mut SourceFile,
        out: &mut OutputFile,
    ) -> Result<()> {
        for strategy in STRATEGY_ORDER {
            if src.remaining() == 0 {
                break;
            }
            match strategy {
                Strategy::BulkCopy => self.bulk_copy(caps, src, out)?,
                Strategy::Reflink => self.reflink(caps, src, out)?,
                Strategy::Transfer => self.transfer(src, out)?,
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            source = %src.path().display(),
            size = src.size(),
            written = out.written(),
            "drained source"
        );

        if src.remaining() > 0 {
            return Err(Error::ShortRead {
                path: src.path().to_path_buf(),
                expected: src.size(),
                remaining: src.remaining(),
            });
        }
        Ok(())
    }

    fn record(&mut self, strategy: Strategy, n: u64, src: &mut SourceFile, out: &mut OutputFile) {
        src.advance(n);
        out.advance(n);
        match strategy {
            Strategy::BulkCopy => self.tally.bulk_copied += n,
            Strategy::Reflink => self.tally.cloned += n,
            Strategy::Transfer => self.tally.transferred += n,
        }
        if let Some(progress) = self.progress {
            progress(out.written(), self.total);
        }
    }

    fn bulk_copy(
        &mut self,
        caps: &mut Capabilities,
        src: &mut SourceFile,
        out: &mut OutputFile,
    ) -> Result<()> {
        if !caps.bulk_copy() {
            return Ok(());
        }
        while src.remaining() > 0 {
            let chunk = src.remaining().min(BULK_COPY_CHUNK) as usize;
            let mut offset = src.offset();
            let result = retry_on_interrupt(|| {
                self.primitives
                    .copy_file_range(src.file(), &mut offset, out.file(), chunk)
            });
            match result {
                Ok(0) => break,
                Ok(n) => self.record(Strategy::BulkCopy, n as u64, src, out),
                Err(e) if bulk_copy_unavailable(&e) => {
                    caps.disable_bulk_copy();
                    self.options.warn(&format!(
                        "copy_file_range unavailable ({e}); falling back for the rest of the join"
                    ));
                    break;
                }
                Err(source) => {
                    return Err(Error::Transfer {
                        op: "copy_file_range",
                        path: src.path().to_path_buf(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    fn reflink(
        &mut self,
        caps: &mut Capabilities,
        src: &mut SourceFile,
        out: &mut OutputFile,
    ) -> Result<()> {
        let block = self.block_size;
        if !caps.reflink()
            || src.remaining() <= block
            || out.written() % block != 0
            || src.offset() % block != 0
        {
            return Ok(());
        }

        let before = out.written();
        let remaining = src.remaining();
        let result = retry_on_interrupt(|| {
            self.primitives
                .clone_range(src.file(), src.offset(), remaining, out.file(), before)
        });
        match result {
            Ok(()) => {
                let end = retry_on_interrupt(|| self.primitives.seek_to_end(out.file()))
                    .map_err(|source| Error::Transfer {
                        op: "lseek",
                        path: src.path().to_path_buf(),
                        source,
                    })?;
                let n = end.saturating_sub(before).min(remaining);
                if n > 0 {
                    self.record(Strategy::Reflink, n, src, out);
                }
                Ok(())
            }
            Err(e) if reflink_unavailable(&e) => {
                caps.disable_reflink();
                self.options.warn(&format!(
                    "FICLONERANGE unavailable ({e}); not cloning for the rest of the join"
                ));
                Ok(())
            }
            Err(source) => Err(Error::Transfer {
                op: "ficlone",
                path: src.path().to_path_buf(),
                source,
            }),
        }
    }

    fn transfer(&mut self, src: &mut SourceFile, out: &mut OutputFile) -> Result<()> {
        while src.remaining() > 0 {
            let chunk = src.remaining().min(TRANSFER_CHUNK) as usize;
            let mut offset = src.offset();
            let n = retry_on_interrupt(|| {
                self.primitives
                    .sendfile(src.file(), &mut offset, out.file(), chunk)
            })
            .map_err(|source| Error::Transfer {
                op: "sendfile",
                path: src.path().to_path_buf(),
                source,
            })?;
            if n == 0 {
                break;
            }
            self.record(Strategy::Transfer, n as u64, src, out);
        }
        Ok(())
    }
}
