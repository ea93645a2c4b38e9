//! Giving the staged output its final name.

use super::output::OutputFile;
use super::utils::{self, retry_on_interrupt};
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// How the output reached its destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Publication {
    /// The unnamed file was linked directly by descriptor.
    Linked,
    /// The unnamed file was linked through its `/proc/self/fd` entry.
    LinkedViaProcFd,
    /// The destination was written in place; there was nothing to link.
    WrittenInPlace,
}

impl Publication {
    /// Short human-readable description.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linked => "linked",
            Self::LinkedViaProcFd => "linked via /proc/self/fd",
            Self::WrittenInPlace => "written in place",
        }
    }
}

/// Run `link`, and if the destination already exists remove it and run it
/// once more. A second `EEXIST` (someone raced us) is returned as is.
fn link_replacing(dest: &Path, mut link: impl FnMut() -> io::Result<()>) -> Result<io::Result<()>> {
    match retry_on_interrupt(&mut link) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            #[cfg(feature = "tracing")]
            tracing::debug!(destination = %dest.display(), "replacing existing destination");

            fs::remove_file(dest).map_err(|source| Error::RemoveExisting {
                path: dest.to_path_buf(),
                source,
            })?;
            Ok(retry_on_interrupt(link))
        }
        result => Ok(result),
    }
}

/// Link `file` at `dest`, directly first and through the fallback when the
/// direct link is refused with `ENOENT`.
fn publish_anonymous(
    dest: &Path,
    direct: impl FnMut() -> io::Result<()>,
    fallback: impl FnMut() -> io::Result<()>,
) -> Result<Publication> {
    let publish_error = |source| Error::Publish {
        path: dest.to_path_buf(),
        source,
    };

    match link_replacing(dest, direct)? {
        Ok(()) => Ok(Publication::Linked),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                destination = %dest.display(),
                "direct link refused, linking through /proc/self/fd"
            );
            link_replacing(dest, fallback)?.map_err(publish_error)?;
            Ok(Publication::LinkedViaProcFd)
        }
        Err(e) => Err(publish_error(e)),
    }
}

/// Make the output visible at its destination and close it.
///
/// Outputs written in place are already there. Unnamed outputs are linked,
/// replacing whatever the destination held before.
///
/// # Errors
///
/// - [`Error::RemoveExisting`] if an existing destination cannot be removed
/// - [`Error::Publish`] if neither link method succeeds
pub(crate) fn publish(output: OutputFile) -> Result<Publication> {
    let anonymous = output.is_anonymous();
    let (file, destination) = output.into_parts();
    let publication = if anonymous {
        let file: &File = &file;
        publish_anonymous(
            &destination,
            || utils::link_anonymous(file, &destination),
            || utils::link_via_proc_fd(file, &destination),
        )?
    } else {
        Publication::WrittenInPlace
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        destination = %destination.display(),
        publication = publication.as_str(),
        "published output"
    );

    drop(file);
    Ok(publication)
}
