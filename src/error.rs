//! Error types and handling infrastructure for archivefs.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! the library error type. The binary layers `anyhow` on top for context.
//!
//! Every failure is surfaced to the caller immediately. Opening an archive is a
//! one-shot resource acquisition, so nothing here is retried on the caller's behalf.

use thiserror::Error;

/// The main error type for archivefs operations.
#[derive(Error, Debug)]
pub enum ArchiveFsError {
    /// The location could not be turned into a well-formed archive URI
    #[error("Invalid archive location {location}: {reason}")]
    InvalidLocation { location: String, reason: String },

    /// Nothing can treat the target as an archive (wrong format or scheme)
    #[error("Unsupported archive format for {location}: {message}")]
    UnsupportedArchiveFormat { location: String, message: String },

    /// The underlying open failed for I/O reasons
    #[error("Could not create archive file system for {location} (create: {create})")]
    IoFailure {
        location: String,
        create: bool,
        #[source]
        source: std::io::Error,
    },

    /// Entry path does not exist inside the archive
    #[error("Entry not found: {path}")]
    EntryNotFound { path: String },

    /// Entry path names a directory where a file was expected
    #[error("Entry is a directory: {path}")]
    EntryIsDirectory { path: String },

    /// A file system is already registered for this archive
    #[error("File system already exists: {uri}")]
    FileSystemAlreadyExists { uri: String },

    /// No file system is registered for this archive
    #[error("File system not found: {uri}")]
    FileSystemNotFound { uri: String },

    /// The file system was closed by its owner
    #[error("File system is closed: {uri}")]
    ClosedFileSystem { uri: String },

    /// File operations outside of opening (flush on close, CLI input files)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Standard Result type for archivefs operations.
pub type Result<T> = std::result::Result<T, ArchiveFsError>;

impl ArchiveFsError {
    /// Create an InvalidLocation error
    pub fn invalid_location(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLocation {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedArchiveFormat error
    pub fn unsupported(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedArchiveFormat {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error raised while opening `location`
    pub fn io_failure(location: impl Into<String>, create: bool, source: std::io::Error) -> Self {
        Self::IoFailure {
            location: location.into(),
            create,
            source,
        }
    }

    /// Create an EntryNotFound error
    pub fn entry_not_found(path: impl Into<String>) -> Self {
        Self::EntryNotFound { path: path.into() }
    }

    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ArchiveFsError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}

/// Flatten a zip error into an io::Error, keeping the original when it is one
pub(crate) fn zip_to_io(err: zip::result::ZipError) -> std::io::Error {
    match err {
        zip::result::ZipError::Io(inner) => inner,
        other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
    }
}
