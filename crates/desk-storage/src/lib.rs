//! Credential persistence for ordersdesk.
//!
//! This crate provides:
//! - A `SecureStorage` backend trait
//! - OS keychain backends: Secret Service on Linux, Keychain on macOS,
//!   Credential Vault on Windows
//! - An owner-only JSON file backend used when no keychain is reachable
//! - An in-memory backend for tests
//! - `CredentialStore`, the single `token` slot with placeholder sanitizing

mod credential;
mod file;
mod keys;
mod memory;
mod traits;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

pub use credential::{is_placeholder, Credential, CredentialStore};
pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::SecureStorage;

use desk_config_and_utils::Paths;
use thiserror::Error;
use tracing::{debug, warn};

/// Service name under which the token is filed in the OS keychain.
pub const KEYCHAIN_SERVICE: &str = "dev.ordersdesk.credentials";

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error in a file-backed store
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Open the OS keychain for this platform.
fn create_platform_storage() -> StorageResult<Box<dyn SecureStorage>> {
    #[cfg(target_os = "linux")]
    {
        let storage = linux::SecretServiceStorage::new(KEYCHAIN_SERVICE)?;
        Ok(Box::new(storage))
    }

    #[cfg(target_os = "macos")]
    {
        let storage = macos::KeychainStorage::new(KEYCHAIN_SERVICE)?;
        Ok(Box::new(storage))
    }

    #[cfg(target_os = "windows")]
    {
        let storage = crate::windows::CredentialStorage::new(KEYCHAIN_SERVICE)?;
        Ok(Box::new(storage))
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        Err(StorageError::Platform(
            "no OS keychain on this platform".to_string(),
        ))
    }
}

/// Create the default storage backend.
///
/// The OS keychain is preferred. When it cannot be reached (no Secret
/// Service on a headless Linux box, unsupported platform) the token goes to
/// an owner-only file under the client's base directory instead.
pub fn create_storage(paths: &Paths) -> Box<dyn SecureStorage> {
    match create_platform_storage() {
        Ok(storage) => {
            debug!(service = KEYCHAIN_SERVICE, "Using OS keychain for credentials");
            storage
        }
        Err(error) => {
            warn!(
                error = %error,
                path = %paths.credentials_file().display(),
                "OS keychain unavailable, storing credentials in a private file"
            );
            Box::new(create_file_storage(paths))
        }
    }
}

/// File backend under the client's base directory, which is created
/// owner-only.
pub fn create_file_storage(paths: &Paths) -> FileStorage {
    if let Err(error) = paths.ensure_dirs() {
        warn!(error = %error, "Failed to prepare the ordersdesk directory");
    }
    FileStorage::new(paths.credentials_file())
}

/// Create a CredentialStore over the default backend.
pub fn create_credential_store(paths: &Paths) -> CredentialStore {
    CredentialStore::new(create_storage(paths))
}
