//! Thin wrappers around the Linux primitives used by a join.
//!
//! Every wrapper returns `io::Result` with the raw `errno` preserved so the
//! copy engine can tell "not available" apart from real failures. None of
//! them retry on their own; callers wrap them in [`retry_on_interrupt`].

use std::ffi::CString;
use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

/// Upper bound on consecutive `EINTR` results before giving up.
const MAX_INTERRUPTED_RETRIES: usize = 1024;

// =============================================================================
// Interrupt handling
// =============================================================================

/// Run `op` until it returns something other than `EINTR`.
///
/// A blocking call interrupted by an unrelated signal is simply issued
/// again. The number of retries is bounded; after that many interruptions
/// in a row the last `EINTR` is returned as is.
pub(crate) fn retry_on_interrupt<T>(mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut attempts = 0;
    loop {
        match op() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted && attempts < MAX_INTERRUPTED_RETRIES => {
                attempts += 1;
            }
            result => return result,
        }
    }
}

// =============================================================================
// Transfer primitives
// =============================================================================

/// `copy_file_range(2)` from `src` at `*src_offset` to the current position of `dst`.
///
/// On success `*src_offset` is advanced by the number of bytes copied.
pub(crate) fn copy_file_range(
    src: &File,
    src_offset: &mut u64,
    dst: &File,
    len: usize,
) -> io::Result<usize> {
    let mut off_in = *src_offset as libc::loff_t;
    // SAFETY: both descriptors are open for the lifetime of the borrows; a null
    // output offset makes the kernel use and update the file position of `dst`.
    let result = unsafe {
        libc::copy_file_range(
            src.as_raw_fd(),
            &mut off_in,
            dst.as_raw_fd(),
            std::ptr::null_mut(),
            len,
            0,
        )
    };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    *src_offset = off_in as u64;
    Ok(result as usize)
}

/// `sendfile(2)` from `src` at `*src_offset` to the current position of `dst`.
///
/// On success `*src_offset` is advanced by the number of bytes sent.
pub(crate) fn sendfile(
    src: &File,
    src_offset: &mut u64,
    dst: &File,
    len: usize,
) -> io::Result<usize> {
    let mut off = *src_offset as libc::off_t;
    // SAFETY: both descriptors are open; `off` outlives the call.
    let result = unsafe { libc::sendfile(dst.as_raw_fd(), src.as_raw_fd(), &mut off, len) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    *src_offset = off as u64;
    Ok(result as usize)
}

/// Share `len` bytes of `src` starting at `src_offset` into `dst` at `dst_offset`.
///
/// File positions of both descriptors are left untouched.
pub(crate) fn clone_range(
    src: &File,
    src_offset: u64,
    len: u64,
    dst: &File,
    dst_offset: u64,
) -> io::Result<()> {
    let range = libc::file_clone_range {
        src_fd: i64::from(src.as_raw_fd()),
        src_offset,
        src_length: len,
        dest_offset: dst_offset,
    };
    // SAFETY: `range` is a properly laid out file_clone_range that lives
    // across the call; the kernel only reads it.
    let result = unsafe {
        libc::ioctl(
            dst.as_raw_fd(),
            libc::FICLONERANGE,
            &range as *const libc::file_clone_range,
        )
    };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Move the file position of `file` to its end and return that offset.
pub(crate) fn seek_to_end(mut file: &File) -> io::Result<u64> {
    file.seek(SeekFrom::End(0))
}

// =============================================================================
// Filesystem queries and naming
// =============================================================================

/// Preferred I/O block size of the filesystem holding `file`.
pub(crate) fn block_size(file: &File) -> io::Result<u64> {
    // SAFETY: statfs is plain old data and fully written by a successful call.
    let mut buf: libc::statfs = unsafe { std::mem::zeroed() };
    if unsafe { libc::fstatfs(file.as_raw_fd(), &mut buf) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((buf.f_bsize as u64).max(1))
}

fn path_to_cstring(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "path contains an interior NUL byte",
        )
    })
}

/// Give the unnamed file behind `file` the name `dest` (`linkat` with `AT_EMPTY_PATH`).
///
/// Unprivileged callers lacking `CAP_DAC_READ_SEARCH` get `ENOENT` here.
pub(crate) fn link_anonymous(file: &File, dest: &Path) -> io::Result<()> {
    let dest = path_to_cstring(dest)?;
    // SAFETY: both strings are NUL-terminated and outlive the call.
    let result = unsafe {
        libc::linkat(
            file.as_raw_fd(),
            c"".as_ptr(),
            libc::AT_FDCWD,
            dest.as_ptr(),
            libc::AT_EMPTY_PATH,
        )
    };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// `/proc/self/fd/<n>` for the descriptor behind `file`.
pub(crate) fn proc_fd_path(file: &File) -> String {
    format!("/proc/self/fd/{}", file.as_raw_fd())
}

/// Give the unnamed file behind `file` the name `dest` by following its
/// `/proc/self/fd` entry. Works without extra privileges.
pub(crate) fn link_via_proc_fd(file: &File, dest: &Path) -> io::Result<()> {
    let source = path_to_cstring(Path::new(&proc_fd_path(file)))?;
    let dest = path_to_cstring(dest)?;
    // SAFETY: both strings are NUL-terminated and outlive the call.
    let result = unsafe {
        libc::linkat(
            libc::AT_FDCWD,
            source.as_ptr(),
            libc::AT_FDCWD,
            dest.as_ptr(),
            libc::AT_SYMLINK_FOLLOW,
        )
    };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Whether the filesystem holding `dir` accepts `O_TMPFILE`, asked with a
/// bare `open(2)` that shares nothing with output staging.
#[cfg(test)]
pub(crate) fn tmpfile_supported(dir: &Path) -> bool {
    let Ok(dir) = path_to_cstring(dir) else {
        return false;
    };
    // SAFETY: `dir` is NUL-terminated; the descriptor is closed right away.
    unsafe {
        let fd = libc::open(dir.as_ptr(), libc::O_TMPFILE | libc::O_WRONLY, 0o600);
        if fd < 0 {
            return false;
        }
        libc::close(fd);
    }
    true
}

// =============================================================================
// Tests
// =============================================================================
