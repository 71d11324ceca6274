//! Opening archive locations as filesystem handles.
//!
//! These are free functions over a [`Registry`]. [`open`] asks the registry for
//! a new filesystem and, when one is already open for the same archive, falls
//! back to looking it up and hands out a borrowed handle instead. Losing that
//! race is never an error.

use crate::archive_fs::handle::ArchiveHandle;
use crate::archive_fs::location::{ArchiveLocation, ArchiveUri};
use crate::archive_fs::registry::Registry;
use crate::archive_fs::ArchiveOptions;
use crate::error::{ArchiveFsError, Result};

/// How many times the new-then-lookup sequence runs before giving up
///
/// A lookup only misses when the owner is closing the filesystem, and it
/// returns once that close has finished, so a small bound is plenty.
const MAX_OPEN_ATTEMPTS: usize = 4;

/// Open the archive at `location` in the global registry
///
/// # Arguments
/// * `location` - Path, `file:` URI, or `archive:` URI of the archive
/// * `create` - Create an empty archive if none exists at `location`
///
/// # Returns
/// * `ArchiveHandle::Owned` if this call opened the filesystem
/// * `ArchiveHandle::Borrowed` if it was already open
///
/// # Errors
/// * `InvalidLocation` - location is not a well-formed URI
/// * `UnsupportedArchiveFormat` - target is not a ZIP archive, or its scheme
///   has no provider
/// * `IoFailure` - the underlying open failed
pub fn open(location: impl Into<ArchiveLocation>, create: bool) -> Result<ArchiveHandle> {
    open_with(location, &ArchiveOptions::new().create(create))
}

/// Open an existing archive at `location`
pub fn open_path(location: impl Into<ArchiveLocation>) -> Result<ArchiveHandle> {
    open(location, false)
}

/// Open `location` in the global registry with explicit options
pub fn open_with(
    location: impl Into<ArchiveLocation>,
    options: &ArchiveOptions,
) -> Result<ArchiveHandle> {
    open_in(Registry::global(), location, options)
}

/// Open `location` in `registry`
pub fn open_in(
    registry: &Registry,
    location: impl Into<ArchiveLocation>,
    options: &ArchiveOptions,
) -> Result<ArchiveHandle> {
    let location = location.into();
    let uri = ArchiveUri::from_location(&location)?;

    let mut attempt = 0;
    loop {
        attempt += 1;

        match registry.new_file_system(&uri, options) {
            Ok(fs) => return Ok(ArchiveHandle::Owned(fs)),
            Err(ArchiveFsError::FileSystemAlreadyExists { .. }) => {}
            Err(e) => return Err(e),
        }

        match registry.get_file_system(&uri) {
            Ok(fs) => {
                log::debug!("{} already open, returning borrowed handle", uri);
                return Ok(ArchiveHandle::Borrowed(fs));
            }
            Err(e @ ArchiveFsError::FileSystemNotFound { .. }) => {
                if attempt >= MAX_OPEN_ATTEMPTS {
                    return Err(e);
                }
                log::debug!(
                    "{} closed between open and lookup, retrying ({}/{})",
                    uri,
                    attempt,
                    MAX_OPEN_ATTEMPTS
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// Read the full contents of the entry at `path` through `handle`
///
/// # Errors
/// * `EntryNotFound` - nothing exists at `path` inside the archive
pub fn read_all_bytes(handle: &ArchiveHandle, path: &str) -> Result<Vec<u8>> {
    handle.read_all_bytes(path)
}

/// Release `handle`: closes the filesystem if the handle owns it
pub fn close(handle: &ArchiveHandle) -> Result<()> {
    handle.close()
}
