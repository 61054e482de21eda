use std::path::PathBuf;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Content-addressed entity lookup: numeric source ID -> display label.
/// The ingestion cycle is the single writer; labels self-heal via upsert as
/// newer pages carry fresher names for the same IDs.
#[derive(Debug, Clone)]
pub struct EntityLabelStore {
    path: PathBuf,
}

impl EntityLabelStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let store = Self { path };
        store.init_db()?;
        Ok(store)
    }

    fn conn(&self) -> Result<Connection> {
        Connection::open(&self.path)
            .with_context(|| format!("failed opening sqlite db at {}", self.path.display()))
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
CREATE TABLE IF NOT EXISTS entity_labels (
    entity_id INTEGER PRIMARY KEY,
    label TEXT NOT NULL
);
"#,
        )
        .context("failed creating entity_labels table")?;
        Ok(())
    }

    pub fn upsert(&self, entity_id: u64, label: &str) -> Result<()> {
        let label = label.trim();
        if entity_id == 0 || label.is_empty() {
            return Ok(());
        }
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO entity_labels (entity_id, label) VALUES (?1, ?2)",
            params![entity_id as i64, label],
        )
        .with_context(|| format!("failed upserting entity label for {entity_id}"))?;
        Ok(())
    }

    pub fn label_for(&self, entity_id: u64) -> Result<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT label FROM entity_labels WHERE entity_id = ?1",
            params![entity_id as i64],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .context("failed looking up entity label")
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM entity_labels", [], |row| row.get(0))
            .context("failed counting entity_labels rows")
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf, time::SystemTime};

    use super::EntityLabelStore;

    fn temp_db_path() -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("clock should be valid")
            .as_nanos();
        std::env::temp_dir().join(format!("killtracker_labels_{unique}.db"))
    }

    #[test]
    fn upsert_keeps_a_single_row_with_the_latest_label() {
        let path = temp_db_path();
        let store = EntityLabelStore::open(path.clone()).expect("store should open");

        store.upsert(268_946_627, "Haulmar").expect("first upsert");
        store
            .upsert(268_946_627, "Haulmar Renamed")
            .expect("second upsert");

        assert_eq!(store.count().expect("count"), 1);
        assert_eq!(
            store.label_for(268_946_627).expect("lookup").as_deref(),
            Some("Haulmar Renamed")
        );
        fs::remove_file(&path).ok();
    }

    #[test]
    fn blank_labels_and_zero_ids_are_ignored() {
        let path = temp_db_path();
        let store = EntityLabelStore::open(path.clone()).expect("store should open");

        store.upsert(0, "Nobody").expect("zero id is a no-op");
        store.upsert(42, "   ").expect("blank label is a no-op");

        assert_eq!(store.count().expect("count"), 0);
        assert_eq!(store.label_for(42).expect("lookup"), None);
        fs::remove_file(&path).ok();
    }
}
