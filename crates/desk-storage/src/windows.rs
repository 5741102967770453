//! Windows Credential Vault backend. The service name is the vault
//! resource and the storage key is the user name.

use crate::{SecureStorage, StorageError, StorageResult};
use tracing::debug;
use windows::core::HSTRING;
use windows::Security::Credentials::{PasswordCredential, PasswordVault};

/// ERROR_NOT_FOUND as an HRESULT.
const NOT_FOUND: u32 = 0x8007_0490;

fn is_not_found(error: &windows::core::Error) -> bool {
    error.code().0 as u32 == NOT_FOUND
}

fn platform(context: &str, error: windows::core::Error) -> StorageError {
    StorageError::Platform(format!("{context}: {error}"))
}

pub struct CredentialStorage {
    resource_name: String,
}

impl CredentialStorage {
    pub fn new(service_name: &str) -> StorageResult<Self> {
        PasswordVault::new().map_err(|e| platform("Credential Vault unavailable", e))?;
        Ok(Self {
            resource_name: service_name.to_string(),
        })
    }

    fn vault(&self) -> StorageResult<PasswordVault> {
        PasswordVault::new().map_err(|e| platform("Credential Vault unavailable", e))
    }

    fn find(&self, vault: &PasswordVault, key: &str) -> StorageResult<Option<PasswordCredential>> {
        let resource = HSTRING::from(self.resource_name.as_str());
        match vault.Retrieve(&resource, &HSTRING::from(key)) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(platform("failed to look up credential", e)),
        }
    }
}

impl SecureStorage for CredentialStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(resource = %self.resource_name, key = %key, "Storing vault credential");

        let vault = self.vault()?;
        // The vault keeps one password per (resource, user); replace it.
        if let Some(existing) = self.find(&vault, key)? {
            vault
                .Remove(&existing)
                .map_err(|e| platform("failed to replace credential", e))?;
        }

        let credential = PasswordCredential::CreatePasswordCredential(
            &HSTRING::from(self.resource_name.as_str()),
            &HSTRING::from(key),
            &HSTRING::from(value),
        )
        .map_err(|e| platform("failed to build credential", e))?;
        vault
            .Add(&credential)
            .map_err(|e| platform("failed to store credential", e))
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let vault = self.vault()?;
        let Some(credential) = self.find(&vault, key)? else {
            return Ok(None);
        };

        credential
            .RetrievePassword()
            .map_err(|e| platform("failed to unlock credential", e))?;
        let password = credential
            .Password()
            .map_err(|e| platform("failed to read credential", e))?;
        Ok(Some(password.to_string_lossy()))
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(resource = %self.resource_name, key = %key, "Deleting vault credential");

        let vault = self.vault()?;
        match self.find(&vault, key)? {
            Some(credential) => {
                vault
                    .Remove(&credential)
                    .map_err(|e| platform("failed to delete credential", e))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // touches the user's Credential Vault
    fn test_token_slot_in_vault() {
        let storage = CredentialStorage::new("dev.ordersdesk.credentials.test").unwrap();
        let _ = storage.delete("token");

        storage.set("token", "tok1").unwrap();
        storage.set("token", "tok2").unwrap();
        assert_eq!(storage.get("token").unwrap(), Some("tok2".to_string()));

        assert!(storage.delete("token").unwrap());
        assert!(!storage.delete("token").unwrap());
        assert_eq!(storage.get("token").unwrap(), None);
    }
}
