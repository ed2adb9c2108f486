//! Constants used throughout the storage crate.

/// Size of the fixed buffer used when copying upload, download and archive bytes.
pub const COPY_BUFFER_SIZE: usize = 8 * 1024;

/// Prefix of in-flight upload files inside the root directory.
///
/// Listings skip entries with this prefix; they are renamed into place once fully written.
pub const TEMP_FILE_PREFIX: &str = ".upload-";
