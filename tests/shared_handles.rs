use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

use archivefs::{
    open_in, read_all_bytes, ArchiveFsError, ArchiveHandle, ArchiveOptions, EntryCompression,
    Registry,
};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const THREADS: usize = 8;

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = std::fs::File::create(path).expect("create zip");
    let mut writer = zip::ZipWriter::new(file);
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start entry");
        writer.write_all(contents.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish zip");
}

fn open_concurrently(registry: &Arc<Registry>, path: &Path, create: bool) -> Vec<ArchiveHandle> {
    let barrier = Arc::new(Barrier::new(THREADS));
    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(registry);
            let barrier = Arc::clone(&barrier);
            let path = path.to_path_buf();
            thread::spawn(move || {
                barrier.wait();
                open_in(&registry, path, &ArchiveOptions::new().create(create))
                    .expect("open archive")
            })
        })
        .collect();

    workers
        .into_iter()
        .map(|worker| worker.join().expect("worker panicked"))
        .collect()
}

#[test]
fn concurrent_opens_yield_exactly_one_owner() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.zip");
    write_zip(&path, &[("hello.txt", "world")]);
    let registry = Arc::new(Registry::new());

    let handles = open_concurrently(&registry, &path, false);

    assert_eq!(handles.iter().filter(|h| h.is_owner()).count(), 1);
    let owner = handles.iter().find(|h| h.is_owner()).unwrap();
    for handle in &handles {
        assert!(Arc::ptr_eq(handle.file_system(), owner.file_system()));
        assert_eq!(read_all_bytes(handle, "hello.txt").unwrap(), b"world");
    }
}

#[test]
fn borrowed_close_keeps_shared_filesystem_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.zip");
    write_zip(&path, &[("hello.txt", "world")]);
    let registry = Arc::new(Registry::new());

    let mut handles = open_concurrently(&registry, &path, false);
    let owner_index = handles.iter().position(|h| h.is_owner()).unwrap();
    let owner = handles.swap_remove(owner_index);

    // Close and drop borrowed handles one by one; the rest keep working.
    while let Some(borrowed) = handles.pop() {
        archivefs::close(&borrowed).unwrap();
        drop(borrowed);
        assert!(owner.is_open());
        for remaining in &handles {
            assert_eq!(read_all_bytes(remaining, "hello.txt").unwrap(), b"world");
        }
    }

    assert_eq!(read_all_bytes(&owner, "hello.txt").unwrap(), b"world");
    archivefs::close(&owner).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn owner_close_invalidates_borrowed_handles() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.zip");
    write_zip(&path, &[("hello.txt", "world")]);
    let registry = Registry::new();

    let owner = open_in(&registry, path.as_path(), &ArchiveOptions::new()).unwrap();
    let borrowed = open_in(&registry, path.as_path(), &ArchiveOptions::new()).unwrap();
    assert!(!borrowed.is_owner());

    archivefs::close(&owner).unwrap();
    archivefs::close(&owner).unwrap();

    assert!(matches!(
        read_all_bytes(&borrowed, "hello.txt"),
        Err(ArchiveFsError::ClosedFileSystem { .. })
    ));

    // The next open owns a fresh filesystem.
    let next = open_in(&registry, path.as_path(), &ArchiveOptions::new()).unwrap();
    assert!(next.is_owner());
}

#[test]
fn concurrent_create_yields_one_owner_and_empty_archive() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fresh.jar");
    let registry = Arc::new(Registry::new());

    let handles = open_concurrently(&registry, &path, true);
    assert_eq!(handles.iter().filter(|h| h.is_owner()).count(), 1);
    assert!(handles[0].entry_names().unwrap().is_empty());
    assert!(matches!(
        read_all_bytes(&handles[0], "anything"),
        Err(ArchiveFsError::EntryNotFound { .. })
    ));

    drop(handles);
    assert!(registry.is_empty());
    assert!(path.exists());

    let reopened = open_in(&registry, path.as_path(), &ArchiveOptions::new()).unwrap();
    assert!(reopened.entry_names().unwrap().is_empty());
}

#[test]
fn written_entries_round_trip_through_close() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("round_trip.zip");
    let registry = Registry::new();

    let handle = open_in(&registry, path.as_path(), &ArchiveOptions::new().create(true)).unwrap();
    handle.write("hello.txt", b"world".to_vec()).unwrap();
    handle.write("nested/dir/data.bin", vec![0u8, 1, 2, 255]).unwrap();
    archivefs::close(&handle).unwrap();

    let reopened = open_in(&registry, path.as_path(), &ArchiveOptions::new()).unwrap();
    assert_eq!(read_all_bytes(&reopened, "hello.txt").unwrap(), b"world");
    assert_eq!(
        read_all_bytes(&reopened, "/nested/dir/data.bin").unwrap(),
        vec![0u8, 1, 2, 255]
    );
    match read_all_bytes(&reopened, "missing.txt") {
        Err(ArchiveFsError::EntryNotFound { path }) => assert_eq!(path, "/missing.txt"),
        other => panic!("Expected EntryNotFound, got {other:?}"),
    }
}

#[test]
fn open_during_owner_flush_never_steals_ownership() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("busy.zip");
    let registry = Arc::new(Registry::new());
    let payload_len = 64 * 1024 * 1024;

    let options = ArchiveOptions::new()
        .create(true)
        .compression(EntryCompression::Stored);
    let owner = open_in(&registry, path.as_path(), &options).unwrap();
    owner.write("a.bin", vec![7u8; payload_len]).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let opener = {
        let registry = Arc::clone(&registry);
        let barrier = Arc::clone(&barrier);
        let path = path.clone();
        thread::spawn(move || {
            barrier.wait();
            loop {
                let handle = open_in(&registry, path.as_path(), &ArchiveOptions::new().create(true))
                    .expect("open while owner closes");
                if handle.is_owner() {
                    handle.write("b.txt", b"second".to_vec()).unwrap();
                    archivefs::close(&handle).unwrap();
                    return;
                }
            }
        })
    };

    barrier.wait();
    archivefs::close(&owner).unwrap();
    opener.join().expect("opener panicked");

    let reopened = open_in(&registry, path.as_path(), &ArchiveOptions::new()).unwrap();
    assert_eq!(
        reopened.entry_names().unwrap(),
        vec!["a.bin".to_string(), "b.txt".to_string()]
    );
    assert_eq!(read_all_bytes(&reopened, "a.bin").unwrap().len(), payload_len);
    assert_eq!(read_all_bytes(&reopened, "b.txt").unwrap(), b"second");
}

#[test]
fn missing_archive_without_create_fails() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();

    let result = open_in(&registry, dir.path().join("absent.zip"), &ArchiveOptions::new());
    match result {
        Err(ArchiveFsError::IoFailure { create, source, .. }) => {
            assert!(!create);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("Expected IoFailure, got {other:?}"),
    }
    assert!(registry.is_empty());
}

#[test]
fn non_archive_file_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("readme.jar");
    std::fs::write(&path, "this is plain text").unwrap();
    let registry = Registry::new();

    assert!(matches!(
        open_in(&registry, path.as_path(), &ArchiveOptions::new()),
        Err(ArchiveFsError::UnsupportedArchiveFormat { .. })
    ));
}
