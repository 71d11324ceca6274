//! Archive-backed virtual filesystems with owner-only close semantics.
//!
//! This module turns a location (path, `file:` URI, or `archive:` URI) into an
//! [`ArchiveHandle`] over a ZIP-format archive. Open file systems live in a
//! [`Registry`] keyed by the resolved archive file; the first caller to open a
//! location owns the file system and every later caller gets a borrowed view
//! until the owner closes it.

pub mod entry_path;
pub mod filesystem;
pub mod handle;
pub mod location;
pub mod opener;
pub mod registry;
pub mod validation;

pub use entry_path::EntryPath;
pub use filesystem::ArchiveFileSystem;
pub use handle::ArchiveHandle;
pub use location::{ArchiveLocation, ArchiveUri};
pub use opener::{close, open, open_in, open_path, open_with, read_all_bytes};
pub use registry::Registry;

/// Compression applied to entries written through an [`ArchiveFileSystem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "config",
    derive(serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum EntryCompression {
    /// Store entries uncompressed
    Stored,
    /// Deflate entries (the usual choice for JARs)
    #[default]
    Deflated,
}

impl EntryCompression {
    /// Get human-readable name for the compression method
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Deflated => "deflated",
        }
    }

    pub(crate) fn method(&self) -> zip::CompressionMethod {
        match self {
            Self::Stored => zip::CompressionMethod::Stored,
            Self::Deflated => zip::CompressionMethod::Deflated,
        }
    }
}

/// Options controlling how an archive file system is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveOptions {
    /// Create an empty archive when the target does not exist
    pub create: bool,
    /// Compression used for entries written before close
    pub compression: EntryCompression,
}

impl ArchiveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether a missing archive should be created
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Set the compression method for written entries
    pub fn compression(mut self, compression: EntryCompression) -> Self {
        self.compression = compression;
        self
    }
}
