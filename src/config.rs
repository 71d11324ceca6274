//! File-based defaults for the command-line tool.
//!
//! Read from `<config dir>/archivefs/config.toml`:
//!
//! ```toml
//! create = false
//! compression = "deflated"   # or "stored"
//! ```

use crate::archive_fs::{ArchiveOptions, EntryCompression};
use crate::error::{ArchiveFsError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Defaults applied when the CLI opens an archive
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Create missing archives
    pub create: bool,
    /// Compression for entries written by `put`
    pub compression: EntryCompression,
}

impl Config {
    /// Default location of the config file, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("archivefs").join("config.toml"))
    }

    /// Load from the default location; a missing file yields defaults
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ArchiveFsError::file_error(
                format!("Failed to read config {}", path.display()),
                e,
            )),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ArchiveFsError::config(e.to_string()))
    }

    /// Options for opening an archive under this config
    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions::new()
            .create(self.create)
            .compression(self.compression)
    }
}
