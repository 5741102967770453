//! The persisted credential slot.

use crate::{SecureStorage, StorageKeys, StorageResult};
use std::fmt;
use tracing::{debug, warn};

/// Textual values that upstream serialization bugs leave behind instead of
/// a real token. Reading one of these yields absence.
const PLACEHOLDER_VALUES: &[&str] = &["undefined", "null"];

/// Opaque bearer token.
///
/// Never holds an empty string or one of the textual placeholders. The
/// `Debug` impl does not print the token.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Build a credential from raw text, returning `None` for blank values
    /// and placeholders.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if is_placeholder(&raw) {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential")
            .field(&format_args!("len={}", self.0.len()))
            .finish()
    }
}

/// Returns true for values that must be treated as "no credential".
pub fn is_placeholder(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || PLACEHOLDER_VALUES.contains(&trimmed)
}

/// Single-slot credential store over a storage backend.
pub struct CredentialStore {
    storage: Box<dyn SecureStorage>,
}

impl CredentialStore {
    /// Create a store over the given backend.
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    /// Read the persisted credential.
    ///
    /// A placeholder value is deleted from the backend and reported as
    /// absent.
    pub fn read(&self) -> StorageResult<Option<Credential>> {
        let Some(raw) = self.storage.get(StorageKeys::TOKEN)? else {
            return Ok(None);
        };

        match Credential::parse(raw) {
            Some(credential) => Ok(Some(credential)),
            None => {
                warn!("Discarding placeholder value found in credential slot");
                self.storage.delete(StorageKeys::TOKEN)?;
                Ok(None)
            }
        }
    }

    /// Persist a credential, replacing any previous one.
    pub fn write(&self, credential: &Credential) -> StorageResult<()> {
        debug!("Persisting credential");
        self.storage.set(StorageKeys::TOKEN, credential.as_str())
    }

    /// Remove the persisted credential. Clearing an empty slot is a no-op.
    pub fn clear(&self) -> StorageResult<()> {
        if self.storage.delete(StorageKeys::TOKEN)? {
            debug!("Credential cleared");
        }
        Ok(())
    }

    /// Whether a usable credential is persisted (sanitizes like `read`).
    pub fn is_present(&self) -> StorageResult<bool> {
        Ok(self.read()?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use std::sync::Arc;

    fn shared_store() -> (CredentialStore, Arc<MemoryStorage>) {
        let backend = Arc::new(MemoryStorage::new());
        let store = CredentialStore::new(Box::new(backend.clone()));
        (store, backend)
    }

    #[test]
    fn test_parse_rejects_placeholders() {
        assert!(Credential::parse("undefined").is_none());
        assert!(Credential::parse("null").is_none());
        assert!(Credential::parse(" null ").is_none());
        assert!(Credential::parse("").is_none());
        assert!(Credential::parse("   ").is_none());
        assert_eq!(Credential::parse("abc").unwrap().as_str(), "abc");
        // Only the exact placeholder words are rejected.
        assert!(Credential::parse("nullable-token").is_some());
    }

    #[test]
    fn test_debug_hides_token() {
        let credential = Credential::parse("super-secret").unwrap();
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("len=12"));
    }

    #[test]
    fn test_read_returns_written_credential() {
        let (store, _) = shared_store();
        assert_eq!(store.read().unwrap(), None);

        store.write(&Credential::parse("abc").unwrap()).unwrap();
        assert_eq!(store.read().unwrap().unwrap().as_str(), "abc");
        assert!(store.is_present().unwrap());

        store.write(&Credential::parse("def").unwrap()).unwrap();
        assert_eq!(store.read().unwrap().unwrap().as_str(), "def");
    }

    #[test]
    fn test_read_sanitizes_placeholders_and_deletes_them() {
        for placeholder in ["undefined", "null"] {
            let (store, backend) = shared_store();
            backend.set(StorageKeys::TOKEN, placeholder).unwrap();

            assert_eq!(store.read().unwrap(), None);
            assert_eq!(backend.get(StorageKeys::TOKEN).unwrap(), None);
        }
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (store, backend) = shared_store();
        store.write(&Credential::parse("abc").unwrap()).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();

        assert_eq!(backend.get(StorageKeys::TOKEN).unwrap(), None);
        assert_eq!(store.read().unwrap(), None);
    }
}
