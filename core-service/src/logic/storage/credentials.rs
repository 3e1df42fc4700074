//! Credential Vault
//!
//! Secrets are sealed with AES-256-GCM before they reach the state store.
//! Stored format: hex(nonce || ciphertext) under `credential_<name>`.

use std::sync::Arc;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use sha2::{Digest, Sha256};

use super::{keys, StateStore, StoreError};

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("credential is corrupt or sealed with another key")]
    Corrupt,

    #[error("missing credential field: {0}")]
    Missing(&'static str),
}

/// Scoped secret storage
pub trait CredentialStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<String>, CredentialError>;
    fn set(&self, name: &str, value: &str) -> Result<(), CredentialError>;
}

pub struct EncryptedCredentialStore {
    store: Arc<dyn StateStore>,
    cipher: Aes256Gcm,
}

impl EncryptedCredentialStore {
    /// Derive the vault key from `secret`
    pub fn new(store: Arc<dyn StateStore>, secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);

        Self {
            store,
            cipher: Aes256Gcm::new(key),
        }
    }

    fn seal(&self, plaintext: &str) -> Result<String, CredentialError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CredentialError::Corrupt)?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(hex::encode(sealed))
    }

    fn open(&self, sealed: &str) -> Result<String, CredentialError> {
        let bytes = hex::decode(sealed).map_err(|_| CredentialError::Corrupt)?;
        if bytes.len() <= NONCE_LEN {
            return Err(CredentialError::Corrupt);
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CredentialError::Corrupt)?;

        String::from_utf8(plaintext).map_err(|_| CredentialError::Corrupt)
    }
}

impl CredentialStore for EncryptedCredentialStore {
    fn get(&self, name: &str) -> Result<Option<String>, CredentialError> {
        match self.store.get_raw(&keys::credential(name))? {
            Some(sealed) => self.open(&sealed).map(Some),
            None => Ok(None),
        }
    }

    fn set(&self, name: &str, value: &str) -> Result<(), CredentialError> {
        let sealed = self.seal(value)?;
        self.store.put_raw(&keys::credential(name), &sealed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::storage::MemoryStore;

    #[test]
    fn test_secret_is_not_stored_in_clear() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let vault = EncryptedCredentialStore::new(store.clone(), "unit-secret");

        vault.set("bb_token", "super-secret-token").unwrap();

        let raw = store.get_raw("credential_bb_token").unwrap().unwrap();
        assert!(!raw.contains("super-secret-token"));
        assert_eq!(vault.get("bb_token").unwrap().as_deref(), Some("super-secret-token"));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        EncryptedCredentialStore::new(store.clone(), "key-a").set("bb_token", "t").unwrap();

        let other = EncryptedCredentialStore::new(store, "key-b");
        assert!(matches!(other.get("bb_token"), Err(CredentialError::Corrupt)));
    }

    #[test]
    fn test_missing_credential_is_none() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let vault = EncryptedCredentialStore::new(store, "k");
        assert!(vault.get("bb_token").unwrap().is_none());
    }
}
