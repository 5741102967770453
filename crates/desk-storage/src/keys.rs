//! Storage key constants.

/// Storage keys used by the client
pub struct StorageKeys;

impl StorageKeys {
    /// Opaque bearer token for the admin API
    pub const TOKEN: &'static str = "token";
}
