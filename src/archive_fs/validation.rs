//! Archive file validation.
//!
//! Checks that an existing target is a regular file that starts with a ZIP
//! signature before the ZIP reader gets to see it, so that "this is not an
//! archive" is reported separately from genuine I/O trouble.

use crate::error::{ArchiveFsError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Recognized ZIP signatures at offset zero
///
/// - `PK\x03\x04`: local file header (any non-empty archive)
/// - `PK\x05\x06`: end of central directory (empty archive)
/// - `PK\x07\x08`: spanned archive marker
const ZIP_SIGNATURES: [[u8; 4]; 3] = [
    [0x50, 0x4b, 0x03, 0x04],
    [0x50, 0x4b, 0x05, 0x06],
    [0x50, 0x4b, 0x07, 0x08],
];

/// Check whether `magic` starts with a ZIP signature
pub fn has_zip_signature(magic: &[u8]) -> bool {
    magic.len() >= 4 && ZIP_SIGNATURES.iter().any(|sig| magic.starts_with(sig))
}

/// Validate that an existing `path` looks like a ZIP archive
///
/// `location` and `create` only feed error messages.
///
/// # Error Cases
/// - Path is a directory or other non-file: `IoFailure`
/// - File cannot be opened or read: `IoFailure`
/// - File is empty or lacks a ZIP signature: `UnsupportedArchiveFormat`
pub fn validate_archive_file(path: &Path, location: &str, create: bool) -> Result<()> {
    let metadata =
        std::fs::metadata(path).map_err(|e| ArchiveFsError::io_failure(location, create, e))?;

    if !metadata.is_file() {
        return Err(ArchiveFsError::io_failure(
            location,
            create,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Path is not a file: {}", path.display()),
            ),
        ));
    }

    let mut file = File::open(path).map_err(|e| ArchiveFsError::io_failure(location, create, e))?;
    let mut magic = [0u8; 4];
    let mut filled = 0;
    while filled < magic.len() {
        let read = file
            .read(&mut magic[filled..])
            .map_err(|e| ArchiveFsError::io_failure(location, create, e))?;
        if read == 0 {
            break;
        }
        filled += read;
    }

    if !has_zip_signature(&magic[..filled]) {
        return Err(ArchiveFsError::unsupported(
            location,
            "Couldn't find an archive provider for this file. Is it really a ZIP or JAR?",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn create_test_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content).expect("Failed to write test content");
        file.flush().expect("Failed to flush test file");
        file
    }

    #[test]
    fn test_signature_detection() {
        assert!(has_zip_signature(b"PK\x03\x04rest"));
        assert!(has_zip_signature(b"PK\x05\x06"));
        assert!(has_zip_signature(b"PK\x07\x08"));
        assert!(!has_zip_signature(b"PK"));
        assert!(!has_zip_signature(&[0x1f, 0x8b, 0x08, 0x00]));
    }

    #[test]
    fn test_validate_accepts_zip_header() {
        let file = create_test_file(b"PK\x05\x06\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0");
        assert!(validate_archive_file(file.path(), "test", false).is_ok());
    }

    #[test]
    fn test_validate_rejects_plain_text() {
        let file = create_test_file(b"just some log lines\n");
        match validate_archive_file(file.path(), "test", false) {
            Err(ArchiveFsError::UnsupportedArchiveFormat { .. }) => {}
            other => panic!("Expected UnsupportedArchiveFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_empty_file() {
        let file = create_test_file(&[]);
        match validate_archive_file(file.path(), "test", true) {
            Err(ArchiveFsError::UnsupportedArchiveFormat { .. }) => {}
            other => panic!("Expected UnsupportedArchiveFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_directory() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        match validate_archive_file(dir.path(), "dir", true) {
            Err(ArchiveFsError::IoFailure { create, source, .. }) => {
                assert!(create);
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidInput);
            }
            other => panic!("Expected IoFailure for directory, got {other:?}"),
        }
    }
}
