//! Constants used throughout the UpDown core crate.
//!
//! Defaults for startup configuration and the names the adapters present to clients.

/// Default storage directory when no explicit location is configured.
pub const DEFAULT_STORAGE_LOCATION: &str = "upload-dir";

/// Default upper bound on a single upload request body (64 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Default address for the REST server.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:8080";

/// Filename offered to clients for zip bundle downloads.
pub const ZIP_DOWNLOAD_FILENAME: &str = "files.zip";

/// Environment variable naming the storage directory.
pub const STORAGE_LOCATION_ENV: &str = "UPDOWN_STORAGE_LOCATION";

/// Environment variable bounding upload request bodies, in bytes.
pub const MAX_UPLOAD_BYTES_ENV: &str = "UPDOWN_MAX_UPLOAD_BYTES";

/// Environment variable controlling whether storage is wiped at startup.
pub const RESET_ON_STARTUP_ENV: &str = "UPDOWN_RESET_ON_STARTUP";

/// Environment variable for the REST server bind address.
pub const REST_ADDR_ENV: &str = "UPDOWN_REST_ADDR";
