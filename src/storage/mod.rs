//! Storage abstractions for schedule persistence.
//!
//! Every configured schedule gets its own directory. Inside it two
//! interchangeable dataset copies live side by side, one per [`Slot`], and a
//! separate control row (see [`switch`]) names the copy readers use:
//!
//! ```text
//! data/
//! └── aut2013/
//!     ├── switch.db        # Control row: active slot (A=1, B=2)
//!     ├── schedule_a.db    # Slot A: departments, classes, sections
//!     └── schedule_b.db    # Slot B: same schema
//! ```
//!
//! The crawler only ever writes to the inactive copy and flips the control
//! row once that copy is completely built.

pub mod memory;
pub mod sqlite;
pub mod switch;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DatabaseConfig, Filter, Record, RecordKind, Slot};

// Re-export for convenience
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use switch::SlotSwitch;

/// Persistence port for one dataset copy.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Drop and recreate every table, discarding the previous contents.
    async fn reset(&self) -> Result<()>;

    /// Insert one record. Duplicate keys are an error.
    async fn insert(&self, record: &Record) -> Result<()>;

    /// Records of `kind` matching the filter.
    async fn select(&self, kind: RecordKind, filter: &Filter) -> Result<Vec<Record>>;

    /// Number of stored records of `kind`.
    async fn count(&self, kind: RecordKind) -> Result<u64>;
}

/// The two dataset copies, addressed by slot.
#[derive(Clone)]
pub struct SlotStores {
    a: Arc<dyn ScheduleStore>,
    b: Arc<dyn ScheduleStore>,
}

impl SlotStores {
    pub fn new(a: Arc<dyn ScheduleStore>, b: Arc<dyn ScheduleStore>) -> Self {
        Self { a, b }
    }

    /// Open both SQLite copies of `schedule` under `base`.
    pub async fn open(db: &DatabaseConfig, base: &Path, schedule: &str) -> Result<Self> {
        let a = SqliteStore::open(&db.slot_a_path(base, schedule), db.max_connections).await?;
        let b = SqliteStore::open(&db.slot_b_path(base, schedule), db.max_connections).await?;
        Ok(Self::new(Arc::new(a), Arc::new(b)))
    }

    pub fn get(&self, slot: Slot) -> Arc<dyn ScheduleStore> {
        match slot {
            Slot::A => Arc::clone(&self.a),
            Slot::B => Arc::clone(&self.b),
        }
    }
}

/// Read path: every query resolves the active slot first.
#[derive(Clone)]
pub struct ScheduleReader {
    switch: SlotSwitch,
    stores: SlotStores,
}

impl ScheduleReader {
    pub fn new(switch: SlotSwitch, stores: SlotStores) -> Self {
        Self { switch, stores }
    }

    pub async fn select(&self, kind: RecordKind, filter: &Filter) -> Result<Vec<Record>> {
        let slot = self.switch.get_active_slot().await?;
        self.stores.get(slot).select(kind, filter).await
    }

    pub async fn count(&self, kind: RecordKind) -> Result<u64> {
        let slot = self.switch.get_active_slot().await?;
        self.stores.get(slot).count(kind).await
    }
}

/// Delete every database file of `schedule`, returning the paths removed.
///
/// Missing files are skipped, so tearing down twice is harmless. The
/// schedule directory goes too once it is empty.
pub async fn teardown(db: &DatabaseConfig, base: &Path, schedule: &str) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in [
        db.control_path(base, schedule),
        db.slot_a_path(base, schedule),
        db.slot_b_path(base, schedule),
    ] {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let file = PathBuf::from(file);
            match tokio::fs::remove_file(&file).await {
                Ok(()) => removed.push(file),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    let dir = db.schedule_dir(base, schedule);
    if let Err(e) = tokio::fs::remove_dir(&dir).await {
        log::debug!("Keeping {}: {e}", dir.display());
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Department;

    fn department(abbreviation: &str) -> Record {
        Record::from(Department {
            abbreviation: abbreviation.to_string(),
            name: format!("{abbreviation} department"),
            link: format!("https://example.edu/{abbreviation}.html"),
        })
    }

    #[tokio::test]
    async fn test_reader_follows_active_slot() {
        let switch = SlotSwitch::in_memory().await.unwrap();
        let stores = SlotStores::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()));
        stores.get(Slot::A).insert(&department("OLD")).await.unwrap();
        stores.get(Slot::B).insert(&department("NEW")).await.unwrap();

        let reader = ScheduleReader::new(switch.clone(), stores);
        let before = reader
            .select(RecordKind::Department, &Filter::new())
            .await
            .unwrap();
        assert_eq!(before[0].key(), "OLD");

        switch.flip_slot(Slot::A).await.unwrap();
        let after = reader
            .select(RecordKind::Department, &Filter::new())
            .await
            .unwrap();
        assert_eq!(after[0].key(), "NEW");
        assert_eq!(reader.count(RecordKind::Department).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_teardown_removes_schedule_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = temp_dir.path();
        let db = DatabaseConfig::default();

        for path in [
            db.control_path(base, "aut2013"),
            db.slot_a_path(base, "aut2013"),
            db.slot_b_path(base, "aut2013"),
            db.slot_a_path(base, "win2014"),
        ] {
            let store = SqliteStore::open(&path, 1).await.unwrap();
            store.insert(&department("CSE")).await.unwrap();
            store.close().await;
        }

        let removed = teardown(&db, base, "aut2013").await.unwrap();
        assert!(removed.contains(&db.control_path(base, "aut2013")));
        assert!(removed.contains(&db.slot_a_path(base, "aut2013")));
        assert!(removed.contains(&db.slot_b_path(base, "aut2013")));
        assert!(!db.slot_a_path(base, "aut2013").exists());
        assert!(db.slot_a_path(base, "win2014").exists());

        assert!(teardown(&db, base, "aut2013").await.unwrap().is_empty());
    }
}
