//! The storage capability consumed by the application layer and adapters.

use crate::{ArchiveStream, StorageResult};
use std::io::{self, Read};

/// Lazy sequence of stored filenames, bound to one open directory scan.
///
/// The scan is released when the iterator is dropped; drain it before doing so.
pub type FileNames = Box<dyn Iterator<Item = StorageResult<String>> + Send>;

/// Storage backend for uploaded files.
///
/// Every implementation enforces path confinement: a filename must resolve to a direct child
/// of the backend's root, for writes and reads alike.
pub trait StorageService: Send + Sync + std::fmt::Debug {
    /// Ensures the root exists. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Initialise` if the root cannot be created.
    fn init(&self) -> StorageResult<()>;

    /// Persists `content` under `filename`, replacing any existing file of that name.
    ///
    /// # Errors
    ///
    /// - `StorageError::EmptyContent` if `content` yields no bytes; nothing is written
    /// - `StorageError::OutsideRoot` if `filename` does not resolve to a direct child of root
    /// - `StorageError::Store` if reading `content` or writing the destination fails
    fn store(&self, filename: &str, content: &mut dyn Read) -> StorageResult<()>;

    /// Lists the names of the files directly under root. Non-recursive.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::List` if the scan cannot be started.
    fn list(&self) -> StorageResult<FileNames>;

    /// Resolves `filename` for reading.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the name does not resolve to a readable file,
    /// including names that would escape the root.
    fn load(&self, filename: &str) -> StorageResult<StoredFile>;

    /// Returns a deferred producer writing a zip of `filenames`, in order, to a sink.
    ///
    /// Nothing is opened until [`ArchiveStream::write_to`] runs; failures surface there.
    fn zip_archive(&self, filenames: Vec<String>) -> ArchiveStream;

    /// Removes the root and everything under it. A missing root is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Delete` for I/O failures other than absence.
    fn delete_all(&self) -> StorageResult<()>;
}

/// A stored file resolved for reading.
///
/// Holds an open reader; dropping the value releases it.
pub struct StoredFile {
    filename: String,
    len: u64,
    reader: Box<dyn Read + Send>,
}

impl StoredFile {
    pub fn new(filename: impl Into<String>, len: u64, reader: Box<dyn Read + Send>) -> Self {
        Self {
            filename: filename.into(),
            len,
            reader,
        }
    }

    /// Name the file was requested by.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Size in bytes at the time the file was resolved.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.reader
    }
}

impl Read for StoredFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl std::fmt::Debug for StoredFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredFile")
            .field("filename", &self.filename)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}
