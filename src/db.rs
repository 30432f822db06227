use crate::error::ConsultError;
use crate::types::VehicleHistoryItem;
use failure::Error;
use log::{debug, error, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub const HISTORY_KEY: &str = "detran_ma_history";
pub const MAX_HISTORY: usize = 15;

pub fn open(path: &Path) -> Result<Connection, Error> {
    let conn = Connection::open(path)?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (key TEXT NOT NULL PRIMARY KEY, value TEXT NOT NULL) WITHOUT ROWID",
        [],
    )?;
    Ok(conn)
}

/// Recently consulted vehicles, most recent first, written through to SQLite
/// on every change.
pub struct HistoryStore {
    conn: Connection,
    items: Vec<VehicleHistoryItem>,
}

impl HistoryStore {
    pub fn new(conn: Connection) -> HistoryStore {
        let items = load(&conn);
        info!("Loaded {} history entries", items.len());
        HistoryStore { conn, items }
    }

    pub fn items(&self) -> &[VehicleHistoryItem] {
        &self.items
    }

    pub fn get(&self, plate: &str) -> Option<&VehicleHistoryItem> {
        self.items.iter().find(|item| item.plate == plate)
    }

    /// Puts `item` at the front, replacing any entry with the same plate.
    pub fn save(&mut self, item: VehicleHistoryItem) {
        self.items.retain(|existing| existing.plate != item.plate);
        self.items.insert(0, item);
        self.items.truncate(MAX_HISTORY);
        persist(&self.conn, &self.items);
    }

    /// Removes the entry for `plate`; a no-op when there is none.
    pub fn delete(&mut self, plate: &str) {
        let before = self.items.len();
        self.items.retain(|existing| existing.plate != plate);
        if self.items.len() == before {
            debug!("No history entry for plate {}", plate);
        }
        persist(&self.conn, &self.items);
    }
}

/// Reads the stored history. Absent or corrupt data yields an empty list.
pub fn load(conn: &Connection) -> Vec<VehicleHistoryItem> {
    match load_impl(conn) {
        Ok(items) => items,
        Err(e) => {
            error!("Discarding stored history: {}", e);
            Vec::new()
        }
    }
}

fn load_impl(conn: &Connection) -> Result<Vec<VehicleHistoryItem>, Error> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM kv WHERE key = ?1",
            params![HISTORY_KEY],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        Some(json) => serde_json::from_str(&json).map_err(|e| {
            ConsultError::StorageRead {
                reason: e.to_string(),
            }
            .into()
        }),
        None => Ok(Vec::new()),
    }
}

fn persist(conn: &Connection, items: &[VehicleHistoryItem]) {
    if let Err(e) = persist_impl(conn, items) {
        error!("Unable to persist {} history entries: {:?}", items.len(), e);
    }
}

fn persist_impl(conn: &Connection, items: &[VehicleHistoryItem]) -> Result<(), Error> {
    let json = serde_json::to_string(items)?;
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![HISTORY_KEY, json],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::NamedTempFile;

    fn entry(plate: &str, model: Option<&str>, minutes: i64) -> VehicleHistoryItem {
        VehicleHistoryItem {
            plate: plate.to_string(),
            registration_number: format!("{}-renavam", plate),
            vehicle_model: model.map(str::to_string),
            last_consulted: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[test]
    fn missing_history_is_empty() {
        let tmp = NamedTempFile::new().unwrap();
        let store = HistoryStore::new(open(tmp.path()).unwrap());
        assert!(store.items().is_empty());
    }

    #[test]
    fn save_survives_reopen() {
        let tmp = NamedTempFile::new().unwrap();
        {
            let mut store = HistoryStore::new(open(tmp.path()).unwrap());
            store.save(entry("ABC1D23", Some("GOL"), 0));
            store.save(entry("XYZ9Z99", None, 1));
        }
        let store = HistoryStore::new(open(tmp.path()).unwrap());
        let plates: Vec<&str> = store.items().iter().map(|i| i.plate.as_str()).collect();
        assert_eq!(plates, vec!["XYZ9Z99", "ABC1D23"]);
        assert_eq!(store.items()[1].vehicle_model.as_deref(), Some("GOL"));
    }

    #[test]
    fn reconsulting_moves_plate_to_front_and_updates_model() {
        let tmp = NamedTempFile::new().unwrap();
        let mut store = HistoryStore::new(open(tmp.path()).unwrap());
        store.save(entry("AAA0A00", Some("UNO"), 0));
        store.save(entry("BBB1B11", None, 1));
        store.save(entry("AAA0A00", Some("UNO WAY"), 2));

        assert_eq!(store.items().len(), 2);
        assert_eq!(store.items()[0].plate, "AAA0A00");
        assert_eq!(store.items()[0].vehicle_model.as_deref(), Some("UNO WAY"));
        assert_eq!(
            store.items().iter().filter(|i| i.plate == "AAA0A00").count(),
            1
        );
    }

    #[test]
    fn history_is_bounded() {
        let tmp = NamedTempFile::new().unwrap();
        let mut store = HistoryStore::new(open(tmp.path()).unwrap());
        for i in 0..20 {
            store.save(entry(&format!("PLT{:04}", i), None, i));
        }
        assert_eq!(store.items().len(), MAX_HISTORY);
        assert_eq!(store.items()[0].plate, "PLT0019");
        assert!(store.get("PLT0004").is_none());

        let reopened = HistoryStore::new(open(tmp.path()).unwrap());
        assert_eq!(reopened.items().len(), MAX_HISTORY);
    }

    #[test]
    fn delete_removes_entry_and_persists() {
        let tmp = NamedTempFile::new().unwrap();
        let mut store = HistoryStore::new(open(tmp.path()).unwrap());
        store.save(entry("ABC1D23", None, 0));
        store.save(entry("XYZ9Z99", None, 1));
        store.delete("ABC1D23");
        assert!(store.get("ABC1D23").is_none());

        let reopened = HistoryStore::new(open(tmp.path()).unwrap());
        assert_eq!(reopened.items().len(), 1);
        assert_eq!(reopened.items()[0].plate, "XYZ9Z99");
    }

    #[test]
    fn deleting_unknown_plate_is_noop() {
        let tmp = NamedTempFile::new().unwrap();
        let mut store = HistoryStore::new(open(tmp.path()).unwrap());
        store.save(entry("ABC1D23", None, 0));
        store.delete("NOPE000");
        assert_eq!(store.items().len(), 1);
    }

    #[test]
    fn corrupt_history_is_discarded() {
        let tmp = NamedTempFile::new().unwrap();
        let conn = open(tmp.path()).unwrap();
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)",
            params![HISTORY_KEY, "{not json"],
        )
        .unwrap();
        assert!(load_impl(&conn).is_err());

        let mut store = HistoryStore::new(conn);
        assert!(store.items().is_empty());
        store.save(entry("ABC1D23", None, 0));
        assert_eq!(load(&open(tmp.path()).unwrap()).len(), 1);
    }
}
