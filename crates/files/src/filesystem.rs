//! Directory-backed storage service
//!
//! [`FileSystemStorage`] keeps every stored file as a plain file directly under one root
//! directory. It is the backend the server and CLI run against.
//!
//! # Security Model
//!
//! - The root is made absolute and lexically normalised once, at construction
//! - Every filename is joined onto the root, normalised, and accepted only if its parent is
//!   exactly the root; this covers traversal, absolute overrides and nested segments
//! - Reads use the same rule, so a download can never serve a file outside the root
//!
//! # Write Semantics
//!
//! Uploads stream into a temporary `.upload-*` file inside the root and are renamed over the
//! destination once fully written. A failed upload leaves the previous content of that name
//! untouched and the temporary file is removed when it drops. Concurrent uploads of the same
//! name race on the rename; the last one wins. Client filenames may not use the temporary
//! prefix, and stored files get the ordinary umask-derived mode.

use crate::constants::{COPY_BUFFER_SIZE, TEMP_FILE_PREFIX};
use crate::paths::{absolute, confined_child, copy_chunked, is_reserved_name, read_chunk};
use crate::{ArchiveStream, FileNames, StorageError, StorageResult, StorageService, StoredFile};
use std::fs;
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use updown_types::NonEmptyText;

/// Storage service rooted at a single directory
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    /// Absolute, normalised root directory
    root: PathBuf,
}

impl FileSystemStorage {
    /// Creates a service rooted at `location`.
    ///
    /// The directory is not created here; call [`StorageService::init`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidConfiguration` if `location` is empty or blank, or cannot
    /// be resolved to an absolute path.
    pub fn new(location: impl AsRef<str>) -> StorageResult<Self> {
        let location = NonEmptyText::new(location.as_ref()).map_err(|_| {
            StorageError::InvalidConfiguration("File upload location can not be empty.".into())
        })?;

        let root = absolute(Path::new(location.as_str())).map_err(|e| {
            StorageError::InvalidConfiguration(format!(
                "Cannot resolve upload location {}: {}",
                location, e
            ))
        })?;

        Ok(Self { root })
    }

    /// Returns the absolute root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write_atomically(
        &self,
        destination: &Path,
        first_chunk: &[u8],
        content: &mut dyn Read,
        buffer: &mut [u8],
    ) -> io::Result<u64> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_FILE_PREFIX);
        // Same mode a plain create would get; the umask still applies.
        #[cfg(unix)]
        builder.permissions(std::os::unix::fs::PermissionsExt::from_mode(0o666));
        let mut temp = builder.tempfile_in(&self.root)?;

        temp.write_all(first_chunk)?;
        let rest = copy_chunked(content, &mut temp, buffer)?;
        temp.flush()?;

        temp.persist(destination).map_err(|e| e.error)?;
        Ok(first_chunk.len() as u64 + rest)
    }
}

impl StorageService for FileSystemStorage {
    fn init(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.root).map_err(|source| StorageError::Initialise {
            root: self.root.clone(),
            source,
        })?;
        tracing::info!(root = %self.root.display(), "storage initialised");
        Ok(())
    }

    fn store(&self, filename: &str, content: &mut dyn Read) -> StorageResult<()> {
        let store_error = |source| StorageError::Store {
            filename: filename.to_owned(),
            source,
        };

        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let first = read_chunk(content, &mut buffer).map_err(store_error)?;
        if first == 0 {
            tracing::warn!(filename = %filename, "rejected empty upload");
            return Err(StorageError::EmptyContent);
        }

        let Some(destination) = confined_child(&self.root, filename) else {
            tracing::warn!(filename = %filename, "rejected upload outside storage root");
            return Err(StorageError::OutsideRoot(filename.to_owned()));
        };
        if is_reserved_name(&destination) {
            tracing::warn!(filename = %filename, "rejected upload with reserved name");
            return Err(StorageError::ReservedName(filename.to_owned()));
        }

        let first_chunk = buffer[..first].to_vec();
        let written = self
            .write_atomically(&destination, &first_chunk, content, &mut buffer)
            .map_err(store_error)?;

        tracing::info!(filename = %filename, bytes = written, "file stored");
        Ok(())
    }

    fn list(&self) -> StorageResult<FileNames> {
        let entries = fs::read_dir(&self.root).map_err(StorageError::List)?;

        let names = entries.filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(StorageError::List(e))),
            };
            match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(StorageError::List(e))),
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!(name = ?raw, "skipping stored file with non UTF-8 name");
                    return None;
                }
            };
            if name.starts_with(TEMP_FILE_PREFIX) {
                return None;
            }
            Some(Ok(name))
        });

        Ok(Box::new(names))
    }

    fn load(&self, filename: &str) -> StorageResult<StoredFile> {
        let not_found = || StorageError::NotFound(filename.to_owned());

        let path = confined_child(&self.root, filename).ok_or_else(not_found)?;
        let file = fs::File::open(&path).map_err(|_| not_found())?;
        let metadata = file.metadata().map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        Ok(StoredFile::new(filename, metadata.len(), Box::new(file)))
    }

    fn zip_archive(&self, filenames: Vec<String>) -> ArchiveStream {
        let root = self.root.clone();
        ArchiveStream::new(filenames, move |filename| {
            let path = confined_child(&root, filename).ok_or_else(|| {
                io::Error::new(ErrorKind::PermissionDenied, "path is outside storage root")
            })?;
            Ok(Box::new(fs::File::open(path)?) as Box<dyn Read + Send>)
        })
    }

    fn delete_all(&self) -> StorageResult<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {
                tracing::info!(root = %self.root.display(), "storage cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Delete {
                root: self.root.clone(),
                source,
            }),
        }
    }
}
