//! An open, archive-backed virtual filesystem.
//!
//! Entries are read lazily from the backing ZIP file. Writes and removals are
//! kept in an in-memory overlay and only reach disk when the filesystem is
//! closed: the new archive is staged in a temporary file next to the target,
//! untouched entries are copied raw, and the staged file is renamed over the
//! original.

use crate::archive_fs::entry_path::EntryPath;
use crate::archive_fs::location::ArchiveUri;
use crate::archive_fs::validation::validate_archive_file;
use crate::archive_fs::{ArchiveOptions, EntryCompression};
use crate::error::{zip_to_io, ArchiveFsError, Result};
use parking_lot::{Mutex, MutexGuard};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Registry table shared between a [`Registry`](super::Registry) and the
/// filesystems it opened
pub(crate) type RegistryTable = Mutex<HashMap<PathBuf, Arc<ArchiveFileSystem>>>;

/// Change recorded against an entry since the archive was opened
#[derive(Debug)]
enum Pending {
    Written(Vec<u8>),
    Removed,
}

/// Mutable state guarded by the filesystem lock
struct State {
    /// Backing archive; `None` for a freshly created archive
    backing: Option<ZipArchive<File>>,
    /// Overlay of writes and removals keyed by entry name
    pending: BTreeMap<String, Pending>,
    /// Whether close must rewrite the archive file
    dirty: bool,
}

impl State {
    /// Names of entries currently visible, overlay applied
    fn live_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self
            .backing
            .as_ref()
            .map(|archive| {
                archive
                    .file_names()
                    .filter(|name| !self.pending.contains_key(*name))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        for (name, change) in &self.pending {
            if let Pending::Written(_) = change {
                names.insert(name.clone());
            }
        }
        names
    }

    fn is_file(&self, entry: &EntryPath) -> bool {
        if entry.is_root() {
            return false;
        }
        match self.pending.get(entry.as_str()) {
            Some(Pending::Written(_)) => true,
            Some(Pending::Removed) => false,
            None => self
                .backing
                .as_ref()
                .is_some_and(|archive| archive.file_names().any(|name| name == entry.as_str())),
        }
    }

    /// Root, explicit `dir/` entries, and directories implied by entry prefixes
    fn is_directory(&self, entry: &EntryPath) -> bool {
        if entry.is_root() {
            return true;
        }
        let prefix = entry.dir_prefix();
        self.live_names().iter().any(|name| name.starts_with(&prefix))
    }
}

/// An open filesystem view over one ZIP-format archive
///
/// Instances are created by a [`Registry`](super::Registry) and shared through
/// [`ArchiveHandle`](super::ArchiveHandle)s. All methods are thread-safe.
pub struct ArchiveFileSystem {
    uri: ArchiveUri,
    archive_path: PathBuf,
    compression: EntryCompression,
    create: bool,
    pub(super) open: AtomicBool,
    state: Mutex<State>,
    registry: Weak<RegistryTable>,
}

impl ArchiveFileSystem {
    /// Open the archive at `archive_path`
    ///
    /// # Errors
    /// * `IoFailure` if the archive is missing and `create` is false, if the
    ///   parent directory of a to-be-created archive is missing, or on read errors
    /// * `UnsupportedArchiveFormat` if the file is not a readable ZIP archive
    pub(crate) fn open(
        uri: ArchiveUri,
        archive_path: PathBuf,
        options: &ArchiveOptions,
        registry: Weak<RegistryTable>,
    ) -> Result<Self> {
        let location = uri.location().to_string();
        let create = options.create;

        let (backing, dirty) = if archive_path.exists() {
            validate_archive_file(&archive_path, &location, create)?;
            let file = File::open(&archive_path)
                .map_err(|e| ArchiveFsError::io_failure(&location, create, e))?;
            let archive = ZipArchive::new(file).map_err(|e| match e {
                ZipError::Io(source) => ArchiveFsError::io_failure(&location, create, source),
                other => ArchiveFsError::unsupported(&location, other.to_string()),
            })?;
            (Some(archive), false)
        } else if create {
            let parent_exists = archive_path
                .parent()
                .map_or(true, |parent| parent.as_os_str().is_empty() || parent.is_dir());
            if !parent_exists {
                return Err(ArchiveFsError::io_failure(
                    &location,
                    create,
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("Parent directory does not exist: {}", archive_path.display()),
                    ),
                ));
            }
            (None, true)
        } else {
            return Err(ArchiveFsError::io_failure(
                &location,
                create,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Archive does not exist: {}", archive_path.display()),
                ),
            ));
        };

        log::debug!(
            "opened archive file system {} ({} entries, create: {})",
            uri,
            backing.as_ref().map_or(0, ZipArchive::len),
            create
        );

        Ok(Self {
            uri,
            archive_path,
            compression: options.compression,
            create,
            open: AtomicBool::new(true),
            state: Mutex::new(State {
                backing,
                pending: BTreeMap::new(),
                dirty,
            }),
            registry,
        })
    }

    /// The `archive:` URI this filesystem was opened with
    pub fn uri(&self) -> &ArchiveUri {
        &self.uri
    }

    /// Resolved path of the backing archive file
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Lock the state, failing if the filesystem has been closed
    fn lock_open(&self) -> Result<MutexGuard<'_, State>> {
        let state = self.state.lock();
        if !self.is_open() {
            return Err(ArchiveFsError::ClosedFileSystem {
                uri: self.uri.to_string(),
            });
        }
        Ok(state)
    }

    /// Check whether `path` names a file or directory in the archive
    pub fn exists(&self, path: &str) -> Result<bool> {
        let entry = EntryPath::new(path);
        let state = self.lock_open()?;
        Ok(state.is_file(&entry) || state.is_directory(&entry))
    }

    pub fn is_directory(&self, path: &str) -> Result<bool> {
        let entry = EntryPath::new(path);
        let state = self.lock_open()?;
        Ok(!state.is_file(&entry) && state.is_directory(&entry))
    }

    /// Read the full contents of the entry at `path`
    ///
    /// # Errors
    /// * `EntryNotFound` if nothing exists at `path`
    /// * `EntryIsDirectory` if `path` names a directory
    /// * `ClosedFileSystem` after close
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let entry = EntryPath::new(path);
        let mut state = self.lock_open()?;

        match state.pending.get(entry.as_str()) {
            Some(Pending::Written(bytes)) => return Ok(bytes.clone()),
            Some(Pending::Removed) => return Err(ArchiveFsError::entry_not_found(entry.to_string())),
            None => {}
        }

        if !entry.is_root() {
            if let Some(archive) = state.backing.as_mut() {
                if let Some(bytes) = read_backing_entry(archive, &entry)? {
                    return Ok(bytes);
                }
            }
        }

        if state.is_directory(&entry) {
            Err(ArchiveFsError::EntryIsDirectory {
                path: entry.to_string(),
            })
        } else {
            Err(ArchiveFsError::entry_not_found(entry.to_string()))
        }
    }

    /// Create or overwrite the entry at `path`
    ///
    /// The change becomes durable when the filesystem is closed.
    pub fn write(&self, path: &str, contents: impl Into<Vec<u8>>) -> Result<()> {
        let entry = EntryPath::new(path);
        let mut state = self.lock_open()?;

        if entry.is_root() || (!state.is_file(&entry) && state.is_directory(&entry)) {
            return Err(ArchiveFsError::EntryIsDirectory {
                path: entry.to_string(),
            });
        }

        state
            .pending
            .insert(entry.as_str().to_owned(), Pending::Written(contents.into()));
        state.dirty = true;
        Ok(())
    }

    /// Remove the file entry at `path`
    pub fn remove(&self, path: &str) -> Result<()> {
        let entry = EntryPath::new(path);
        let mut state = self.lock_open()?;

        if !state.is_file(&entry) {
            if state.is_directory(&entry) {
                return Err(ArchiveFsError::EntryIsDirectory {
                    path: entry.to_string(),
                });
            }
            return Err(ArchiveFsError::entry_not_found(entry.to_string()));
        }

        state
            .pending
            .insert(entry.as_str().to_owned(), Pending::Removed);
        state.dirty = true;
        Ok(())
    }

    /// Sorted names of every live entry, including explicit directory entries
    pub fn entry_names(&self) -> Result<Vec<String>> {
        let state = self.lock_open()?;
        Ok(state.live_names().into_iter().collect())
    }

    /// Close the filesystem, writing pending changes back to the archive
    ///
    /// Closing is idempotent. The filesystem stays registered until the
    /// archive has been rewritten, so no other caller can become owner of the
    /// same archive mid-flush. If the rewrite fails the filesystem stays open
    /// with its pending changes and close may be retried. Only owning handles
    /// reach this.
    pub(crate) fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        // The flag only changes under the state lock; see `wait_for_close`.
        if !self.open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        if state.dirty {
            if let Err(e) = self.flush(&mut state) {
                self.open.store(true, Ordering::Release);
                log::warn!("failed to write {}, keeping it open: {}", self.uri, e);
                return Err(e);
            }
        }

        state.backing = None;
        state.pending.clear();
        state.dirty = false;
        self.deregister();

        log::debug!("closed archive file system {}", self.uri);
        Ok(())
    }

    /// Close without writing pending changes back
    pub(crate) fn discard(&self) {
        let mut state = self.state.lock();
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }

        if state.dirty {
            log::warn!(
                "discarding {} pending changes to {}",
                state.pending.len(),
                self.uri
            );
        }
        state.backing = None;
        state.pending.clear();
        state.dirty = false;
        self.deregister();
    }

    /// Block until a close that has already cleared the open flag finishes
    pub(crate) fn wait_for_close(&self) {
        drop(self.state.lock());
    }

    fn deregister(&self) {
        if let Some(table) = self.registry.upgrade() {
            let mut table = table.lock();
            let is_self = table
                .get(&self.archive_path)
                .is_some_and(|registered| std::ptr::eq(Arc::as_ptr(registered), self));
            if is_self {
                table.remove(&self.archive_path);
                log::trace!("deregistered {}", self.archive_path.display());
            }
        }
    }

    /// Stage the updated archive next to the target and rename it into place
    fn flush(&self, state: &mut State) -> Result<()> {
        let staging_dir = self
            .archive_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut staged = NamedTempFile::new_in(staging_dir).map_err(|e| {
            ArchiveFsError::file_error(
                format!("Failed to stage archive in {}", staging_dir.display()),
                e,
            )
        })?;

        let write_err = |e: std::io::Error| {
            ArchiveFsError::file_error(
                format!("Failed to write archive {}", self.archive_path.display()),
                e,
            )
        };

        {
            let mut writer = ZipWriter::new(staged.as_file_mut());
            let mut copied = 0usize;

            if let Some(archive) = state.backing.as_mut() {
                for index in 0..archive.len() {
                    let file = archive
                        .by_index_raw(index)
                        .map_err(|e| write_err(zip_to_io(e)))?;
                    if state.pending.contains_key(file.name()) {
                        continue;
                    }
                    writer
                        .raw_copy_file(file)
                        .map_err(|e| write_err(zip_to_io(e)))?;
                    copied += 1;
                }
            }

            let options = SimpleFileOptions::default().compression_method(self.compression.method());
            let mut written = 0usize;
            for (name, change) in &state.pending {
                if let Pending::Written(bytes) = change {
                    writer
                        .start_file(name.as_str(), options)
                        .map_err(|e| write_err(zip_to_io(e)))?;
                    writer.write_all(bytes).map_err(write_err)?;
                    written += 1;
                }
            }

            writer.finish().map_err(|e| write_err(zip_to_io(e)))?;
            log::debug!(
                "flushing {}: {} entries copied, {} written",
                self.archive_path.display(),
                copied,
                written
            );
        }

        // Release the old archive before replacing it.
        state.backing = None;

        if let Err(e) = staged.persist(&self.archive_path) {
            state.backing = self.reopen_backing();
            return Err(write_err(e.error));
        }
        Ok(())
    }

    /// Re-read the archive on disk after a failed replace
    fn reopen_backing(&self) -> Option<ZipArchive<File>> {
        let file = File::open(&self.archive_path).ok()?;
        ZipArchive::new(file).ok()
    }
}

/// Read `entry` from the backing archive; `None` if absent or a directory entry
fn read_backing_entry(archive: &mut ZipArchive<File>, entry: &EntryPath) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(entry.as_str()) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(ArchiveFsError::file_error(
                format!("Failed to read entry {entry}"),
                zip_to_io(e),
            ))
        }
    };

    if file.is_dir() {
        return Ok(None);
    }

    let mut contents = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
    file.read_to_end(&mut contents).map_err(|e| {
        ArchiveFsError::file_error(format!("Failed to read entry {entry}"), e)
    })?;
    Ok(Some(contents))
}

impl fmt::Debug for ArchiveFileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveFileSystem")
            .field("uri", &self.uri.to_string())
            .field("archive_path", &self.archive_path)
            .field("compression", &self.compression)
            .field("create", &self.create)
            .field("open", &self.is_open())
            .finish()
    }
}
