//! State Store - process-wide keyed pipeline state
//!
//! Pure storage: latest telemetry, per-ticket baseline/fix records, learned
//! flags, the knowledge base and encrypted credentials.
//!
//! # Components
//! - `sqlite.rs`: durable store (rusqlite)
//! - `memory.rs`: in-process store for tests and dry runs
//! - `credentials.rs`: AES-GCM credential vault layered on any store

pub mod credentials;
pub mod memory;
pub mod sqlite;

#[cfg(test)]
mod tests;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::logic::learning::KnowledgeEntry;

pub use credentials::{CredentialError, CredentialStore, EncryptedCredentialStore};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Logical key layout
pub mod keys {
    pub const LATEST_TELEMETRY: &str = "latest_telemetry";

    pub fn spec(ticket_id: &str) -> String {
        format!("spec_{}", ticket_id)
    }

    pub fn fix(ticket_id: &str) -> String {
        format!("fix_{}", ticket_id)
    }

    pub fn learned(ticket_id: &str) -> String {
        format!("learned_{}", ticket_id)
    }

    pub fn credential(name: &str) -> String {
        format!("credential_{}", name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Keyed last-write-wins storage plus the append-only knowledge base.
pub trait StateStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Knowledge base in append order
    fn knowledge_base(&self) -> Result<Vec<KnowledgeEntry>, StoreError>;

    /// Append `entry` and set `learned_<ticket>` atomically.
    ///
    /// Returns `false` without touching the knowledge base when the ticket
    /// was already learned.
    fn learn_once(&self, entry: &KnowledgeEntry) -> Result<bool, StoreError>;
}

impl dyn StateStore {
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.put_raw(key, &raw)
    }

    pub fn is_learned(&self, ticket_id: &str) -> Result<bool, StoreError> {
        Ok(self.get_raw(&keys::learned(ticket_id))?.is_some())
    }

    pub fn knowledge_size(&self) -> Result<usize, StoreError> {
        Ok(self.knowledge_base()?.len())
    }
}
