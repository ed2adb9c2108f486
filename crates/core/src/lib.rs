//! # UpDown Core
//!
//! Application layer for the UpDown file service:
//! - Startup configuration (`CoreConfig`) resolved once and passed into services
//! - `FileService`, the operations the REST adapter and CLI call
//!
//! **No transport concerns**: HTTP routing, status codes and CLI parsing belong in `api-rest`
//! and `updown-cli`. Storage mechanics live in `updown_files`.

pub mod config;
pub mod constants;
mod error;
mod service;

pub use config::CoreConfig;
pub use constants::*;
pub use error::{CoreError, CoreResult};
pub use service::FileService;
pub use updown_files::{
    ArchiveStream, FileSystemStorage, InMemoryStorage, StorageError, StorageErrorKind,
    StorageResult, StorageService, StoredFile, COPY_BUFFER_SIZE,
};
