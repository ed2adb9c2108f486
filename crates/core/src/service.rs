//! Application-level file operations.
//!
//! [`FileService`] is what the REST adapter and the CLI talk to. It holds the storage backend
//! behind the [`StorageService`] trait so either backend can be injected.

use std::io::Read;
use std::sync::Arc;
use updown_files::{ArchiveStream, StorageResult, StorageService, StoredFile};

/// File operations exposed to the outer layers
#[derive(Clone, Debug)]
pub struct FileService {
    storage: Arc<dyn StorageService>,
}

impl FileService {
    /// Creates a new `FileService` over the given storage backend.
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn StorageService> {
        &self.storage
    }

    /// Prepares storage for serving.
    ///
    /// When `reset` is set every stored file is removed first; the root is then (re)created.
    pub fn prepare(&self, reset: bool) -> StorageResult<()> {
        if reset {
            tracing::info!("resetting storage before startup");
            self.storage.delete_all()?;
        }
        self.storage.init()
    }

    /// Stores one uploaded file.
    pub fn upload_file(&self, filename: &str, content: &mut dyn Read) -> StorageResult<()> {
        self.storage.store(filename, content)
    }

    /// Stores several uploaded files in order.
    ///
    /// Stops at the first failure; files stored before it remain stored.
    ///
    /// # Returns
    ///
    /// The number of files stored.
    pub fn upload_files<'a, I, R>(&self, files: I) -> StorageResult<usize>
    where
        I: IntoIterator<Item = (&'a str, R)>,
        R: Read,
    {
        let mut stored = 0;
        for (filename, mut content) in files {
            self.storage.store(filename, &mut content)?;
            stored += 1;
        }
        Ok(stored)
    }

    /// Lists stored filenames in ascending order.
    ///
    /// The underlying scan is drained and released before returning.
    pub fn list_files(&self) -> StorageResult<Vec<String>> {
        let mut names = self.storage.list()?.collect::<StorageResult<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    pub fn load(&self, filename: &str) -> StorageResult<StoredFile> {
        self.storage.load(filename)
    }

    pub fn zip_files(&self, filenames: Vec<String>) -> ArchiveStream {
        self.storage.zip_archive(filenames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;
    use updown_files::{FileSystemStorage, InMemoryStorage, StorageError, StorageErrorKind};

    fn memory_service() -> FileService {
        let service = FileService::new(Arc::new(InMemoryStorage::new()));
        service.prepare(false).unwrap();
        service
    }

    #[test]
    fn test_upload_and_list_sorted() {
        let service = memory_service();
        service.upload_file("b.txt", &mut "b".as_bytes()).unwrap();
        service.upload_file("a.txt", &mut "a".as_bytes()).unwrap();

        assert_eq!(service.list_files().unwrap(), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_upload_empty_is_empty_content() {
        let service = memory_service();

        let err = service
            .upload_file("empty.txt", &mut std::io::empty())
            .unwrap_err();

        assert_eq!(err.kind(), StorageErrorKind::EmptyContent);
    }

    #[test]
    fn test_upload_files_stops_at_first_failure() {
        let service = memory_service();
        let files = vec![
            ("one.txt", Cursor::new(b"1".to_vec())),
            ("two.txt", Cursor::new(Vec::new())),
            ("three.txt", Cursor::new(b"3".to_vec())),
        ];

        let result = service.upload_files(files);

        assert!(matches!(result, Err(StorageError::EmptyContent)));
        assert_eq!(service.list_files().unwrap(), vec!["one.txt"]);
    }

    #[test]
    fn test_upload_files_counts() {
        let service = memory_service();
        let stored = service
            .upload_files([("x.txt", "x".as_bytes()), ("y.txt", "y".as_bytes())])
            .unwrap();
        assert_eq!(stored, 2);
    }

    #[test]
    fn test_prepare_reset_wipes_existing_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("uploads");
        let storage = FileSystemStorage::new(root.to_string_lossy()).unwrap();
        let service = FileService::new(Arc::new(storage));

        service.prepare(false).unwrap();
        service.upload_file("old.txt", &mut "old".as_bytes()).unwrap();

        service.prepare(false).unwrap();
        assert_eq!(service.list_files().unwrap(), vec!["old.txt"]);

        service.prepare(true).unwrap();
        assert!(service.list_files().unwrap().is_empty());
        assert!(root.is_dir());
    }

    #[test]
    fn test_zip_files_delegates() {
        let service = memory_service();
        service.upload_file("a.txt", &mut "hello".as_bytes()).unwrap();

        let mut out = Vec::new();
        service
            .zip_files(vec!["a.txt".into()])
            .write_to(&mut out)
            .unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(out)).unwrap();
        let mut content = String::new();
        archive
            .by_name("a.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "hello");
    }

    #[test]
    fn test_load_not_found_kind() {
        let service = memory_service();
        let err = service.load("nope.txt").unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::NotFound);
    }
}
