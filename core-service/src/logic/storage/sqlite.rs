//! SQLite-backed state store
//!
//! One `kv` table for the last-write-wins keys and one `knowledge_base`
//! table for the append-only learning log.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{keys, StateStore, StoreError};
use crate::logic::learning::KnowledgeEntry;

/// Database file name inside the data directory
pub const DB_FILE: &str = "pitwall.sqlite3";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS knowledge_base (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id TEXT NOT NULL UNIQUE,
    body TEXT NOT NULL
);
"#;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(SCHEMA_SQL)?;

        log::info!("State store opened: {:?}", path);
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open the store in the configured data directory
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(&crate::constants::get_data_dir().join(DB_FILE))
    }

    /// Private in-memory database (tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl StateStore for SqliteStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock();
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn knowledge_base(&self) -> Result<Vec<KnowledgeEntry>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT body FROM knowledge_base ORDER BY seq ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut entries = Vec::new();
        for body in rows {
            entries.push(serde_json::from_str(&body?)?);
        }
        Ok(entries)
    }

    fn learn_once(&self, entry: &KnowledgeEntry) -> Result<bool, StoreError> {
        let body = serde_json::to_string(entry)?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let claimed = tx.execute(
            "INSERT OR IGNORE INTO kv (key, value) VALUES (?1, 'true')",
            params![keys::learned(&entry.ticket_id)],
        )?;
        if claimed == 0 {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO knowledge_base (ticket_id, body) VALUES (?1, ?2)",
            params![entry.ticket_id, body],
        )?;
        tx.commit()?;
        Ok(true)
    }
}
