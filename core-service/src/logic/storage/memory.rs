//! In-memory state store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{keys, StateStore, StoreError};
use crate::logic::learning::KnowledgeEntry;

#[derive(Default)]
struct Inner {
    values: HashMap<String, String>,
    knowledge: Vec<KnowledgeEntry>,
}

/// HashMap-backed store; state is lost with the process.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.read().values.get(key).cloned())
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.write().values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.write().values.remove(key);
        Ok(())
    }

    fn knowledge_base(&self) -> Result<Vec<KnowledgeEntry>, StoreError> {
        Ok(self.inner.read().knowledge.clone())
    }

    fn learn_once(&self, entry: &KnowledgeEntry) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        let flag = keys::learned(&entry.ticket_id);

        if inner.values.contains_key(&flag) {
            return Ok(false);
        }

        inner.values.insert(flag, "true".to_string());
        inner.knowledge.push(entry.clone());
        Ok(true)
    }
}
