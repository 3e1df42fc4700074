use std::sync::Arc;

use chrono::Utc;

use super::*;
use crate::logic::learning::Scenario;
use crate::logic::telemetry::TelemetryFrame;

fn entry(ticket: &str) -> KnowledgeEntry {
    KnowledgeEntry {
        ticket_id: ticket.to_string(),
        scenario: Scenario {
            vibration: "80.00 Hz".to_string(),
            temperature: Some(86.0),
            anomaly_score: Some(0.8),
        },
        successful_fix: "Increase precision thickness to 8.0mm (Titanium Alloy).".to_string(),
        timestamp: Utc::now(),
    }
}

fn stores() -> Vec<(&'static str, Arc<dyn StateStore>)> {
    vec![
        ("memory", Arc::new(MemoryStore::new())),
        ("sqlite", Arc::new(SqliteStore::open_in_memory().unwrap())),
    ]
}

#[test]
fn test_last_write_wins() {
    for (name, store) in stores() {
        let first = TelemetryFrame { vibration: 50.0, temperature: 85.0, aero_load: 1500.0, timestamp: 1 };
        let second = TelemetryFrame { vibration: 70.0, ..first };

        store.put_json(keys::LATEST_TELEMETRY, &first).unwrap();
        store.put_json(keys::LATEST_TELEMETRY, &second).unwrap();

        let latest: Option<TelemetryFrame> = store.get_json(keys::LATEST_TELEMETRY).unwrap();
        assert_eq!(latest, Some(second), "{}", name);

        store.delete(keys::LATEST_TELEMETRY).unwrap();
        assert!(store.get_raw(keys::LATEST_TELEMETRY).unwrap().is_none(), "{}", name);
    }
}

#[test]
fn test_learn_once_is_idempotent() {
    for (name, store) in stores() {
        assert!(!store.is_learned("KAN-1").unwrap());
        assert!(store.learn_once(&entry("KAN-1")).unwrap(), "{}", name);
        assert!(!store.learn_once(&entry("KAN-1")).unwrap(), "{}", name);

        assert!(store.is_learned("KAN-1").unwrap());
        assert_eq!(store.knowledge_size().unwrap(), 1, "{}", name);
    }
}

#[test]
fn test_knowledge_keeps_append_order() {
    for (name, store) in stores() {
        for ticket in ["A-1", "A-2", "A-3"] {
            store.learn_once(&entry(ticket)).unwrap();
        }
        let ids: Vec<String> = store.knowledge_base().unwrap().into_iter().map(|e| e.ticket_id).collect();
        assert_eq!(ids, vec!["A-1", "A-2", "A-3"], "{}", name);
    }
}

#[test]
fn test_sqlite_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join(sqlite::DB_FILE);

    {
        let store: Arc<dyn StateStore> = Arc::new(SqliteStore::open(&path).unwrap());
        store.put_raw(&keys::spec("KAN-1"), "{}").unwrap();
        store.learn_once(&entry("KAN-1")).unwrap();
    }

    let store: Arc<dyn StateStore> = Arc::new(SqliteStore::open(&path).unwrap());
    assert_eq!(store.get_raw(&keys::spec("KAN-1")).unwrap().as_deref(), Some("{}"));
    assert!(store.is_learned("KAN-1").unwrap());
    assert!(!store.learn_once(&entry("KAN-1")).unwrap());

    let stored = store.knowledge_base().unwrap().remove(0);
    assert_eq!(stored, KnowledgeEntry { timestamp: stored.timestamp, ..entry("KAN-1") });
}

#[test]
fn test_concurrent_learning_appends_once() {
    let store: Arc<dyn StateStore> = Arc::new(SqliteStore::open_in_memory().unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || store.learn_once(&entry("KAN-1")).unwrap())
        })
        .collect();
    let claimed = handles.into_iter().map(|h| h.join().unwrap()).filter(|c| *c).count();

    assert_eq!(claimed, 1);
    assert_eq!(store.knowledge_size().unwrap(), 1);
}
