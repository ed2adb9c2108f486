//! In-memory storage service.
//!
//! Satisfies the same contract as the filesystem backend, including path confinement, which is
//! checked against a virtual root. Useful for adapter tests and ephemeral deployments.

use crate::constants::TEMP_FILE_PREFIX;
use crate::paths::{confined_child, copy_chunked};
use crate::{ArchiveStream, FileNames, StorageError, StorageResult, StorageService, StoredFile};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::{self, Cursor, ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;

const VIRTUAL_ROOT: &str = "/memory/store";

type Files = BTreeMap<String, Arc<[u8]>>;

#[derive(Debug, Default)]
struct State {
    initialised: bool,
    files: Files,
}

/// Storage service keeping file contents in memory.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<RwLock<State>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve(filename: &str) -> Option<String> {
        let path = confined_child(Path::new(VIRTUAL_ROOT), filename)?;
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

impl StorageService for InMemoryStorage {
    fn init(&self) -> StorageResult<()> {
        self.state.write().initialised = true;
        Ok(())
    }

    fn store(&self, filename: &str, content: &mut dyn Read) -> StorageResult<()> {
        let mut bytes = Vec::new();
        let mut buffer = [0u8; 1024];
        copy_chunked(content, &mut bytes, &mut buffer).map_err(|source| StorageError::Store {
            filename: filename.to_owned(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(StorageError::EmptyContent);
        }

        let key = Self::resolve(filename)
            .ok_or_else(|| StorageError::OutsideRoot(filename.to_owned()))?;
        if key.starts_with(TEMP_FILE_PREFIX) {
            return Err(StorageError::ReservedName(filename.to_owned()));
        }

        let mut state = self.state.write();
        if !state.initialised {
            return Err(StorageError::Store {
                filename: filename.to_owned(),
                source: io::Error::new(ErrorKind::NotFound, "storage is not initialised"),
            });
        }
        state.files.insert(key, bytes.into());
        Ok(())
    }

    fn list(&self) -> StorageResult<FileNames> {
        let state = self.state.read();
        if !state.initialised {
            return Err(StorageError::List(io::Error::new(
                ErrorKind::NotFound,
                "storage is not initialised",
            )));
        }
        let names: Vec<StorageResult<String>> = state.files.keys().cloned().map(Ok).collect();
        Ok(Box::new(names.into_iter()))
    }

    fn load(&self, filename: &str) -> StorageResult<StoredFile> {
        let bytes = Self::resolve(filename)
            .and_then(|key| self.state.read().files.get(&key).cloned())
            .ok_or_else(|| StorageError::NotFound(filename.to_owned()))?;

        Ok(StoredFile::new(
            filename,
            bytes.len() as u64,
            Box::new(Cursor::new(bytes)),
        ))
    }

    fn zip_archive(&self, filenames: Vec<String>) -> ArchiveStream {
        let state = self.state.clone();
        ArchiveStream::new(filenames, move |filename| {
            let bytes = Self::resolve(filename)
                .and_then(|key| state.read().files.get(&key).cloned())
                .ok_or_else(|| io::Error::new(ErrorKind::NotFound, filename.to_owned()))?;
            Ok(Box::new(Cursor::new(bytes)) as Box<dyn Read + Send>)
        })
    }

    fn delete_all(&self) -> StorageResult<()> {
        let mut state = self.state.write();
        state.files.clear();
        state.initialised = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        storage.init().unwrap();
        storage
    }

    fn drain(storage: &InMemoryStorage) -> Vec<String> {
        storage
            .list()
            .unwrap()
            .collect::<StorageResult<_>>()
            .unwrap()
    }

    #[test]
    fn test_roundtrip_and_overwrite() {
        let storage = storage();
        storage.store("f.txt", &mut "one".as_bytes()).unwrap();
        storage.store("f.txt", &mut "two".as_bytes()).unwrap();

        let mut content = String::new();
        storage
            .load("f.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();

        assert_eq!(content, "two");
        assert_eq!(drain(&storage), vec!["f.txt"]);
    }

    #[test]
    fn test_rejects_empty_and_traversal() {
        let storage = storage();

        assert!(matches!(
            storage.store("e.txt", &mut io::empty()),
            Err(StorageError::EmptyContent)
        ));
        for name in ["../escape.txt", "../../etc/x", "dir/file.txt", "/abs.txt"] {
            assert!(matches!(
                storage.store(name, &mut "x".as_bytes()),
                Err(StorageError::OutsideRoot(_))
            ));
        }
        assert!(drain(&storage).is_empty());
    }

    #[test]
    fn test_rejects_reserved_prefix_so_listing_stays_complete() {
        let storage = storage();

        let result = storage.store(".upload-notes.txt", &mut "data".as_bytes());

        assert!(matches!(result, Err(StorageError::ReservedName(ref n)) if n == ".upload-notes.txt"));
        assert!(matches!(
            storage.load(".upload-notes.txt"),
            Err(StorageError::NotFound(_))
        ));
        assert!(drain(&storage).is_empty());
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let storage = storage();

        let err = storage.load("ghost.txt").unwrap_err();

        assert_eq!(err.to_string(), "Could not read file: ghost.txt");
    }

    #[test]
    fn test_zip_archive_and_failure() {
        let storage = storage();
        storage.store("a.txt", &mut "hello".as_bytes()).unwrap();
        storage.store("b.txt", &mut "world".as_bytes()).unwrap();

        let mut out = Vec::new();
        storage
            .zip_archive(vec!["b.txt".into(), "a.txt".into()])
            .write_to(&mut out)
            .unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(out)).unwrap();
        assert_eq!(archive.by_index(0).unwrap().name(), "b.txt");
        assert_eq!(archive.by_index(1).unwrap().name(), "a.txt");

        let result = storage
            .zip_archive(vec!["a.txt".into(), "missing.txt".into()])
            .write_to(Vec::new());
        assert!(matches!(result, Err(StorageError::ArchiveEntry { .. })));
    }

    #[test]
    fn test_delete_all_then_init() {
        let storage = storage();
        storage.store("a.txt", &mut "a".as_bytes()).unwrap();

        storage.delete_all().unwrap();
        assert!(matches!(storage.list(), Err(StorageError::List(_))));

        storage.init().unwrap();
        storage.init().unwrap();
        assert!(drain(&storage).is_empty());
    }

    #[test]
    fn test_usable_as_trait_object() {
        let shared: Arc<dyn StorageService> = Arc::new(storage());
        shared.store("x.txt", &mut "x".as_bytes()).unwrap();
        assert_eq!(shared.load("x.txt").unwrap().len(), 1);
    }
}
