//! Feature detection for the kernel and C library primitives.
//!
//! The probe runs once per join, before any I/O, and produces the initial
//! [`Capabilities`]. From then on capabilities only ever narrow: the copy
//! engine clears a flag when the matching primitive reports that it is not
//! available, and nothing sets it again.

use crate::error::{Error, Result};
use std::ffi::CStr;
use std::fmt;
use std::io;

/// `copy_file_range(2)` was reworked in 5.3; earlier kernels are not trusted with it.
pub const BULK_COPY_MIN_KERNEL: KernelVersion = KernelVersion::new(5, 3, 0);

/// `O_TMPFILE` appeared in 3.11. Backports onto older kernels without matching
/// filesystem support are known to corrupt data.
pub const ANONYMOUS_TMPFILE_MIN_KERNEL: KernelVersion = KernelVersion::new(3, 11, 0);

/// glibc before 2.30 silently emulates `copy_file_range` in userspace, which
/// masks `ENOSYS` behind generic failures.
pub const BULK_COPY_MIN_GLIBC: KernelVersion = KernelVersion::new(2, 30, 0);

/// A `major.minor.patch` triple parsed from a free-form release string.
///
/// Ordering is lexicographic over the triple.
///
/// # Example
///
/// ```
/// use filejoin::KernelVersion;
///
/// let v = KernelVersion::parse("6.8.0-45-generic");
/// assert_eq!(v, KernelVersion::new(6, 8, 0));
/// assert!(v >= KernelVersion::new(5, 3, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KernelVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch level
    pub patch: u32,
}

impl KernelVersion {
    /// Build a version from its components.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the leading `major.minor.patch` of a release string.
    ///
    /// Digits accumulate into the current component, a `.` moves on to the
    /// next one, and any other character ends parsing. Components that were
    /// never reached are zero, so `"6"` is `6.0.0` and `"5.10-rc1"` is
    /// `5.10.0`. Parsing never fails.
    pub fn parse(release: &str) -> Self {
        let mut parts = [0u32; 3];
        let mut idx = 0;
        for c in release.chars() {
            if let Some(digit) = c.to_digit(10) {
                parts[idx] = parts[idx].saturating_mul(10).saturating_add(digit);
            } else if c == '.' {
                idx += 1;
                if idx == parts.len() {
                    break;
                }
            } else {
                break;
            }
        }
        Self::new(parts[0], parts[1], parts[2])
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Which transfer and publication primitives may be used.
///
/// Flags can be cleared but never set again. The only way to obtain a set
/// with a flag enabled is [`Capabilities::from_versions`] (or the probe that
/// wraps it), so within a join the set moves in one direction only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Capabilities {
    bulk_copy: bool,
    reflink: bool,
    anonymous_tmpfile: bool,
}

impl Capabilities {
    /// Derive the initial set from the kernel version and, when the C
    /// library is glibc, its version.
    ///
    /// Reflink is always assumed available; there is no version that tells
    /// whether a given filesystem pairing supports it.
    pub fn from_versions(kernel: KernelVersion, glibc: Option<KernelVersion>) -> Self {
        let libc_ok = glibc.is_none_or(|v| v >= BULK_COPY_MIN_GLIBC);
        Self {
            bulk_copy: kernel >= BULK_COPY_MIN_KERNEL && libc_ok,
            reflink: true,
            anonymous_tmpfile: kernel >= ANONYMOUS_TMPFILE_MIN_KERNEL,
        }
    }

    /// In-kernel `copy_file_range` may be attempted.
    pub fn bulk_copy(&self) -> bool {
        self.bulk_copy
    }

    /// `FICLONERANGE` may be attempted.
    pub fn reflink(&self) -> bool {
        self.reflink
    }

    /// The output may be staged with `O_TMPFILE`.
    pub fn anonymous_tmpfile(&self) -> bool {
        self.anonymous_tmpfile
    }

    /// Permanently stop using `copy_file_range`.
    pub fn disable_bulk_copy(&mut self) {
        self.bulk_copy = false;
    }

    /// Permanently stop using `FICLONERANGE`.
    pub fn disable_reflink(&mut self) {
        self.reflink = false;
    }

    /// Permanently stop staging with `O_TMPFILE`.
    pub fn disable_anonymous_tmpfile(&mut self) {
        self.anonymous_tmpfile = false;
    }
}

/// Release string of the running kernel, as reported by `uname(2)`.
pub fn kernel_release() -> io::Result<String> {
    // SAFETY: utsname is plain old data; uname fills it with NUL-terminated strings.
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: uname succeeded, so `release` is NUL-terminated within the array.
    let release = unsafe { CStr::from_ptr(uts.release.as_ptr()) };
    Ok(release.to_string_lossy().into_owned())
}

#[cfg(target_env = "gnu")]
unsafe extern "C" {
    fn gnu_get_libc_version() -> *const libc::c_char;
}

/// Version of the glibc the process runs against, `None` for other C libraries.
pub fn glibc_version() -> Option<KernelVersion> {
    #[cfg(target_env = "gnu")]
    {
        // SAFETY: glibc returns a pointer to a static NUL-terminated string.
        let version = unsafe { CStr::from_ptr(gnu_get_libc_version()) };
        Some(KernelVersion::parse(&version.to_string_lossy()))
    }
    #[cfg(not(target_env = "gnu"))]
    {
        None
    }
}

/// Probe the running system for its initial [`Capabilities`].
///
/// # Errors
///
/// Returns [`Error::KernelProbe`] if the kernel release cannot be read.
/// Joining without knowing the kernel is not safe, so this is fatal.
pub fn probe_capabilities() -> Result<Capabilities> {
    let release = kernel_release().map_err(Error::KernelProbe)?;
    let kernel = KernelVersion::parse(&release);
    let glibc = glibc_version();
    let caps = Capabilities::from_versions(kernel, glibc);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        %kernel,
        glibc = ?glibc.map(|v| v.to_string()),
        bulk_copy = caps.bulk_copy,
        anonymous_tmpfile = caps.anonymous_tmpfile,
        "probed capabilities"
    );

    Ok(caps)
}
