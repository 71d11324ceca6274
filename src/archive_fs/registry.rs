//! Registry of open archive filesystems.
//!
//! The registry is the one shared mutable resource of this crate. It maps the
//! resolved archive file to its open [`ArchiveFileSystem`] and reports
//! atomically whether a request created a new filesystem or found one already
//! open. Filesystems remove themselves when closed.

use crate::archive_fs::filesystem::{ArchiveFileSystem, RegistryTable};
use crate::archive_fs::location::ArchiveUri;
use crate::archive_fs::ArchiveOptions;
use crate::error::{ArchiveFsError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Table of open archive filesystems keyed by resolved archive path
#[derive(Debug)]
pub struct Registry {
    table: Arc<RegistryTable>,
}

impl Registry {
    /// Create an empty, independent registry
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The process-wide registry used by [`open`](super::open)
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Open and register a new filesystem for `uri`
    ///
    /// The existence check and the insert happen under the registry lock, so
    /// concurrent callers for the same archive see exactly one success.
    ///
    /// # Errors
    /// * `FileSystemAlreadyExists` if the archive is already open here
    /// * Any error from resolving the URI or opening the archive
    pub fn new_file_system(
        &self,
        uri: &ArchiveUri,
        options: &ArchiveOptions,
    ) -> Result<Arc<ArchiveFileSystem>> {
        let key = resolve_key(&uri.to_file_path()?);

        let mut table = self.table.lock();
        if table.contains_key(&key) {
            log::trace!("file system already open for {}", key.display());
            return Err(ArchiveFsError::FileSystemAlreadyExists {
                uri: uri.to_string(),
            });
        }

        let fs = Arc::new(ArchiveFileSystem::open(
            uri.clone(),
            key.clone(),
            options,
            Arc::downgrade(&self.table),
        )?);
        table.insert(key.clone(), Arc::clone(&fs));
        log::trace!("registered {}", key.display());
        Ok(fs)
    }

    /// Look up the open filesystem for `uri`
    ///
    /// A filesystem whose owner is in the middle of closing it counts as not
    /// found. The lookup waits for that close to finish first, so a following
    /// [`new_file_system`](Self::new_file_system) sees the rewritten archive.
    ///
    /// # Errors
    /// * `FileSystemNotFound` if nothing open is registered for the archive
    pub fn get_file_system(&self, uri: &ArchiveUri) -> Result<Arc<ArchiveFileSystem>> {
        let key = resolve_key(&uri.to_file_path()?);
        let registered = self.table.lock().get(&key).cloned();

        match registered {
            Some(fs) if fs.is_open() => Ok(fs),
            Some(fs) => {
                log::trace!("{} is closing, waiting", key.display());
                fs.wait_for_close();
                Err(ArchiveFsError::FileSystemNotFound {
                    uri: uri.to_string(),
                })
            }
            None => Err(ArchiveFsError::FileSystemNotFound {
                uri: uri.to_string(),
            }),
        }
    }

    /// Whether a filesystem is registered for `uri`
    pub fn contains(&self, uri: &ArchiveUri) -> bool {
        match uri.to_file_path() {
            Ok(path) => self.table.lock().contains_key(&resolve_key(&path)),
            Err(_) => false,
        }
    }

    /// Number of open filesystems
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry key for an archive file
///
/// Existing files are canonicalized so different spellings of one archive map
/// to one filesystem. A missing file is keyed by its canonicalized parent.
fn resolve_key(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}
