//! Secret Service backend (GNOME Keyring, KWallet) over D-Bus.

use crate::{SecureStorage, StorageError, StorageResult};
use secret_service::blocking::{Collection, SecretService};
use secret_service::EncryptionType;
use std::collections::HashMap;
use tracing::debug;

fn platform(context: &str, error: secret_service::Error) -> StorageError {
    StorageError::Platform(format!("{context}: {error}"))
}

/// Items are tagged with `service` and `key` attributes and live in the
/// default collection.
pub struct SecretServiceStorage {
    service_name: String,
}

impl SecretServiceStorage {
    /// Connect once and make sure a default collection exists. Headless
    /// sessions without a keyring daemon fail here and the caller falls back.
    pub fn new(service_name: &str) -> StorageResult<Self> {
        let service = SecretService::connect(EncryptionType::Dh)
            .map_err(|e| platform("Secret Service unavailable", e))?;
        service
            .get_default_collection()
            .map_err(|e| platform("no default keyring collection", e))?;

        Ok(Self {
            service_name: service_name.to_string(),
        })
    }

    fn with_collection<T>(
        &self,
        f: impl FnOnce(&Collection<'_>) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let service = SecretService::connect(EncryptionType::Dh)
            .map_err(|e| platform("Secret Service unavailable", e))?;
        let collection = service
            .get_default_collection()
            .map_err(|e| platform("no default keyring collection", e))?;

        if collection.is_locked().unwrap_or(false) {
            collection
                .unlock()
                .map_err(|e| platform("keyring is locked", e))?;
        }

        f(&collection)
    }

    fn attributes<'a>(&'a self, key: &'a str) -> HashMap<&'a str, &'a str> {
        HashMap::from([("service", self.service_name.as_str()), ("key", key)])
    }
}

impl SecureStorage for SecretServiceStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "Storing keyring item");

        self.with_collection(|collection| {
            collection
                .create_item(
                    &format!("ordersdesk {key}"),
                    self.attributes(key),
                    value.as_bytes(),
                    true,
                    "text/plain",
                )
                .map_err(|e| platform("failed to store keyring item", e))?;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.with_collection(|collection| {
            let items = collection
                .search_items(self.attributes(key))
                .map_err(|e| platform("keyring search failed", e))?;
            let Some(item) = items.first() else {
                return Ok(None);
            };

            let secret = item
                .get_secret()
                .map_err(|e| platform("failed to read keyring item", e))?;
            String::from_utf8(secret)
                .map(Some)
                .map_err(|e| StorageError::Encoding(e.to_string()))
        })
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(service = %self.service_name, key = %key, "Deleting keyring item");

        self.with_collection(|collection| {
            let items = collection
                .search_items(self.attributes(key))
                .map_err(|e| platform("keyring search failed", e))?;
            if items.is_empty() {
                return Ok(false);
            }

            for item in &items {
                item.delete()
                    .map_err(|e| platform("failed to delete keyring item", e))?;
            }
            Ok(true)
        })
    }
}
