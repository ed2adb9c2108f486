//! UpDown File Storage
//!
//! This crate owns everything that touches stored bytes: persisting uploads, listing what is
//! stored, resolving a file for download and streaming a zip bundle of several files.
//!
//! ## Storage Model
//!
//! - One configured root directory, flat and non-recursive
//! - A file is identified by its name; storing the same name again replaces the content
//! - No index or metadata beyond what the filesystem provides
//! - Every resolved path must be a direct child of the root (path confinement)
//!
//! ```text
//! <root>/
//! ├── report.pdf
//! ├── notes.txt
//! └── .upload-XXXXXX   # in-flight upload, renamed into place on success
//! ```
//!
//! ## Backends
//!
//! [`StorageService`] is the capability the outer layers depend on. [`FileSystemStorage`] is the
//! real backend; [`InMemoryStorage`] satisfies the same contract without touching disk.
//!
//! ## Example Usage
//!
//! ```no_run
//! use updown_files::{FileSystemStorage, StorageService};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = FileSystemStorage::new("upload-dir")?;
//! storage.init()?;
//! storage.store("hello.txt", &mut "Hello, World!".as_bytes())?;
//!
//! let out = std::fs::File::create("bundle.zip")?;
//! storage.zip_archive(vec!["hello.txt".into()]).write_to(out)?;
//! # Ok(())
//! # }
//! ```

mod archive;
mod constants;
mod filesystem;
mod memory;
mod paths;
mod storage;

pub use archive::ArchiveStream;
pub use constants::{COPY_BUFFER_SIZE, TEMP_FILE_PREFIX};
pub use filesystem::FileSystemStorage;
pub use memory::InMemoryStorage;
pub use storage::{FileNames, StorageService, StoredFile};

use std::path::PathBuf;

/// Coarse classification of a [`StorageError`].
///
/// Adapters map each kind to an outward signal (client error, not found, server error)
/// without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Generic storage failure: I/O, configuration or path confinement
    Storage,
    /// The caller supplied zero-byte content
    EmptyContent,
    /// The requested filename does not resolve to a readable file
    NotFound,
}

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The configured root location is unusable
    #[error("Invalid storage configuration: {0}")]
    InvalidConfiguration(String),

    /// The root directory could not be created
    #[error("Could not initialise storage at {}", root.display())]
    Initialise {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Upload content was empty
    #[error("Failed to store empty file.")]
    EmptyContent,

    /// The filename resolves outside the root directory
    #[error("Cannot store file outside current directory.")]
    OutsideRoot(String),

    /// The filename uses the prefix reserved for in-flight uploads
    #[error("Cannot store file with reserved name {0}")]
    ReservedName(String),

    /// Reading the upload or writing the destination failed
    #[error("Failed to store file {filename}")]
    Store {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// The root directory could not be scanned
    #[error("Failed to read stored files")]
    List(#[source] std::io::Error),

    /// The filename does not resolve to a readable file
    #[error("Could not read file: {0}")]
    NotFound(String),

    /// An archive entry could not be opened, read or written
    #[error("Failed to add {filename} to archive")]
    ArchiveEntry {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// The zip writer failed
    #[error("Failed to write archive")]
    ArchiveWrite(#[from] zip::result::ZipError),

    /// The root directory could not be removed
    #[error("Could not delete storage at {}", root.display())]
    Delete {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Returns the kind used to map this error to an outward signal.
    #[must_use]
    pub fn kind(&self) -> StorageErrorKind {
        match self {
            StorageError::EmptyContent => StorageErrorKind::EmptyContent,
            StorageError::NotFound(_) => StorageErrorKind::NotFound,
            StorageError::InvalidConfiguration(_)
            | StorageError::Initialise { .. }
            | StorageError::OutsideRoot(_)
            | StorageError::ReservedName(_)
            | StorageError::Store { .. }
            | StorageError::List(_)
            | StorageError::ArchiveEntry { .. }
            | StorageError::ArchiveWrite(_)
            | StorageError::Delete { .. } => StorageErrorKind::Storage,
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
