//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services. Nothing
//! here reads the process environment itself: binaries read the variables and hand the raw
//! values to the parsing helpers, so tests can exercise every path without mutating global
//! state.

use crate::constants::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_STORAGE_LOCATION};
use crate::{CoreError, CoreResult};
use std::path::Path;
use updown_types::NonEmptyText;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    storage_location: NonEmptyText,
    max_upload_bytes: usize,
    reset_on_startup: bool,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if `storage_location` is blank or
    /// `max_upload_bytes` is zero.
    pub fn new(
        storage_location: &str,
        max_upload_bytes: usize,
        reset_on_startup: bool,
    ) -> CoreResult<Self> {
        let storage_location = NonEmptyText::new(storage_location)
            .map_err(|_| CoreError::InvalidInput("storage location cannot be empty".into()))?;

        if max_upload_bytes == 0 {
            return Err(CoreError::InvalidInput(
                "max upload size must be greater than 0".into(),
            ));
        }

        Ok(Self {
            storage_location,
            max_upload_bytes,
            reset_on_startup,
        })
    }

    /// Build configuration from raw (optional) environment values.
    ///
    /// Missing or blank values fall back to their defaults.
    pub fn from_env_values(
        storage_location: Option<String>,
        max_upload_bytes: Option<String>,
        reset_on_startup: Option<String>,
    ) -> CoreResult<Self> {
        let storage_location = non_blank(storage_location)
            .unwrap_or_else(|| DEFAULT_STORAGE_LOCATION.to_string());
        let max_upload_bytes = max_upload_bytes_from_env_value(max_upload_bytes)?;
        let reset_on_startup = flag_from_env_value(reset_on_startup)?;

        Self::new(&storage_location, max_upload_bytes, reset_on_startup)
    }

    pub fn storage_location(&self) -> &str {
        self.storage_location.as_str()
    }

    pub fn storage_path(&self) -> &Path {
        self.storage_location.as_ref()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Whether stored files are wiped before the service starts accepting requests.
    pub fn reset_on_startup(&self) -> bool {
        self.reset_on_startup
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the upload size limit from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default limit.
pub fn max_upload_bytes_from_env_value(value: Option<String>) -> CoreResult<usize> {
    match non_blank(value) {
        None => Ok(DEFAULT_MAX_UPLOAD_BYTES),
        Some(v) => match v.parse::<usize>() {
            Ok(0) | Err(_) => Err(CoreError::InvalidInput(format!(
                "max upload size must be a positive integer, got {:?}",
                v
            ))),
            Ok(n) => Ok(n),
        },
    }
}

/// Parse a boolean flag from an optional string value.
///
/// Accepts `true`/`false`/`1`/`0`/`yes`/`no` in any case. `None` or blank means `false`.
pub fn flag_from_env_value(value: Option<String>) -> CoreResult<bool> {
    match non_blank(value).map(|v| v.to_ascii_lowercase()).as_deref() {
        None => Ok(false),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(CoreError::InvalidInput(format!(
            "expected a boolean flag, got {:?}",
            other
        ))),
    }
}
