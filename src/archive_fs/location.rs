//! Archive locations and `archive:` URIs.
//!
//! Every input form is normalized to an [`ArchiveUri`], which renders as
//! `archive:<scheme>://<host>/<path>#<fragment>`. Port, user info and query
//! are dropped during normalization; only host, path and fragment survive.

use crate::error::{ArchiveFsError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Scheme prefix designating "treat this resource as a mountable archive"
pub const ARCHIVE_SCHEME: &str = "archive";

/// Caller-supplied location of an archive file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveLocation {
    /// Local filesystem path; relative paths resolve against the current directory
    Path(PathBuf),
    /// Textual URI, optionally already wrapped in `archive:`
    Uri(String),
    /// Parsed URI
    Url(Url),
}

impl ArchiveLocation {
    /// Location as shown in error messages
    pub fn display_string(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Uri(uri) => uri.clone(),
            Self::Url(url) => url.to_string(),
        }
    }
}

impl From<&Path> for ArchiveLocation {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ArchiveLocation {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&PathBuf> for ArchiveLocation {
    fn from(path: &PathBuf) -> Self {
        Self::Path(path.clone())
    }
}

impl From<&str> for ArchiveLocation {
    fn from(uri: &str) -> Self {
        Self::Uri(uri.to_string())
    }
}

impl From<String> for ArchiveLocation {
    fn from(uri: String) -> Self {
        Self::Uri(uri)
    }
}

impl From<Url> for ArchiveLocation {
    fn from(url: Url) -> Self {
        Self::Url(url)
    }
}

/// A normalized `archive:` URI wrapping the archive's own location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveUri {
    inner: Url,
}

impl ArchiveUri {
    /// Build the archive URI for `location`
    ///
    /// # Errors
    /// * `InvalidLocation` if the location is not a well-formed hierarchical URI
    ///   or carries no path
    pub fn from_location(location: &ArchiveLocation) -> Result<Self> {
        match location {
            ArchiveLocation::Path(path) => Self::from_path(path),
            ArchiveLocation::Uri(raw) => Self::parse(raw),
            ArchiveLocation::Url(url) => Self::from_url(url.clone(), url.as_str()),
        }
    }

    /// Parse a textual URI, unwrapping a leading `archive:` if present
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let unwrapped = trimmed
            .strip_prefix(ARCHIVE_SCHEME)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(trimmed);

        let url = Url::parse(unwrapped)
            .map_err(|e| ArchiveFsError::invalid_location(raw, e.to_string()))?;
        Self::from_url(url, raw)
    }

    fn from_path(path: &Path) -> Result<Self> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let cwd = std::env::current_dir().map_err(|e| {
                ArchiveFsError::invalid_location(
                    path.display().to_string(),
                    format!("cannot resolve relative path: {e}"),
                )
            })?;
            cwd.join(path)
        };

        let url = Url::from_file_path(&absolute).map_err(|()| {
            ArchiveFsError::invalid_location(
                path.display().to_string(),
                "path cannot be expressed as a file URI",
            )
        })?;
        Self::from_url(url, &path.display().to_string())
    }

    fn from_url(mut url: Url, original: &str) -> Result<Self> {
        if url.cannot_be_a_base() {
            return Err(ArchiveFsError::invalid_location(
                original,
                "URI has no hierarchical path",
            ));
        }

        url.set_query(None);
        // These fail for schemes without authority parts; nothing to strip then.
        let _ = url.set_port(None);
        let _ = url.set_username("");
        let _ = url.set_password(None);

        if url.path().is_empty() || url.path() == "/" {
            return Err(ArchiveFsError::invalid_location(
                original,
                "URI does not name an archive file",
            ));
        }

        Ok(Self { inner: url })
    }

    /// The wrapped location (without the `archive:` prefix)
    pub fn location(&self) -> &Url {
        &self.inner
    }

    /// Scheme of the wrapped location (`file` for local archives)
    pub fn inner_scheme(&self) -> &str {
        self.inner.scheme()
    }

    pub fn host(&self) -> Option<&str> {
        self.inner.host_str()
    }

    pub fn path(&self) -> &str {
        self.inner.path()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.inner.fragment()
    }

    /// Local path of the archive file
    ///
    /// # Errors
    /// * `UnsupportedArchiveFormat` when the wrapped scheme is not `file`
    /// * `InvalidLocation` when the file URI has no local path equivalent
    pub fn to_file_path(&self) -> Result<PathBuf> {
        if self.inner.scheme() != "file" {
            return Err(ArchiveFsError::unsupported(
                self.to_string(),
                format!(
                    "no archive provider for scheme '{}'",
                    self.inner.scheme()
                ),
            ));
        }

        self.inner.to_file_path().map_err(|()| {
            ArchiveFsError::invalid_location(self.to_string(), "file URI has no local path")
        })
    }
}

impl fmt::Display for ArchiveUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", ARCHIVE_SCHEME, self.inner)
    }
}
