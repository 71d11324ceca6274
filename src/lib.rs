//! # archivefs - ZIP and JAR archives as shared virtual filesystems
//!
//! Opens a ZIP-format archive as a filesystem handle. The first caller to open an
//! archive owns the filesystem and is the only one whose close releases it; any
//! caller arriving while it is open gets a borrowed view of the same instance.
//!
//! ## Features
//!
//! - **Flexible locations**: paths, `file:` URIs, and `archive:` URIs
//! - **Owner-only close**: `Owned` vs `Borrowed` handles, safe under concurrent opens
//! - **Lazy reads**: entries are decompressed on demand
//! - **Writes on close**: new, replaced and removed entries are written atomically
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`archive_fs`] - Locations, registry, filesystems and handles
//! - `config` - File-based CLI defaults (behind the `config` feature)
//!
//! ## Example
//!
//! ```no_run
//! let handle = archivefs::open(std::path::Path::new("test.zip"), false)?;
//! let bytes = archivefs::read_all_bytes(&handle, "hello.txt")?;
//! assert_eq!(bytes, b"world");
//! archivefs::close(&handle)?;
//! # Ok::<(), archivefs::ArchiveFsError>(())
//! ```

pub mod archive_fs;
pub mod error;

#[cfg(feature = "config")]
pub mod config;

pub use error::{ArchiveFsError, Result};

pub use archive_fs::{
    close, open, open_in, open_path, open_with, read_all_bytes, ArchiveFileSystem, ArchiveHandle,
    ArchiveLocation, ArchiveOptions, ArchiveUri, EntryCompression, EntryPath, Registry,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
