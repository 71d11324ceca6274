//! Owned and borrowed handles to an open archive filesystem.

use crate::archive_fs::filesystem::ArchiveFileSystem;
use crate::error::Result;
use std::ops::Deref;
use std::sync::Arc;

/// A live reference to an open [`ArchiveFileSystem`]
///
/// Exactly one `Owned` handle exists per registered filesystem. Closing (or
/// dropping) it closes the filesystem for everyone. `Borrowed` handles are
/// views onto a filesystem someone else owns; closing one does nothing.
///
/// A failed explicit close leaves the filesystem open so it can be retried.
/// Dropping an owner whose close fails discards the pending changes.
#[derive(Debug)]
pub enum ArchiveHandle {
    /// This handle opened the filesystem and is responsible for closing it
    Owned(Arc<ArchiveFileSystem>),
    /// The filesystem was already open; ownership lies elsewhere
    Borrowed(Arc<ArchiveFileSystem>),
}

impl ArchiveHandle {
    /// True if closing this handle releases the underlying filesystem
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// The underlying filesystem
    pub fn file_system(&self) -> &Arc<ArchiveFileSystem> {
        match self {
            Self::Owned(fs) | Self::Borrowed(fs) => fs,
        }
    }

    /// Read the full contents of the entry at `path`
    pub fn read_all_bytes(&self, path: &str) -> Result<Vec<u8>> {
        self.file_system().read(path)
    }

    /// Close the filesystem if this handle owns it
    ///
    /// Idempotent for owners, a no-op for borrowed handles.
    pub fn close(&self) -> Result<()> {
        match self {
            Self::Owned(fs) => fs.close(),
            Self::Borrowed(fs) => {
                log::trace!("not closing borrowed handle to {}", fs.uri());
                Ok(())
            }
        }
    }
}

impl Deref for ArchiveHandle {
    type Target = ArchiveFileSystem;

    fn deref(&self) -> &Self::Target {
        self.file_system()
    }
}

impl Drop for ArchiveHandle {
    fn drop(&mut self) {
        if let Self::Owned(fs) = self {
            if let Err(e) = fs.close() {
                log::warn!("failed to close {} on drop: {}", fs.uri(), e);
                fs.discard();
            }
        }
    }
}
