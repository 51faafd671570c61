//! In-memory dataset copy.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Filter, Record, RecordKind};
use crate::storage::ScheduleStore;

/// A [`ScheduleStore`] holding records in process memory.
///
/// Keys are unique per kind, as in the SQLite tables. Unfiltered selects
/// return records in key order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<(RecordKind, String), Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<(RecordKind, String), Record>>> {
        self.tables
            .lock()
            .map_err(|_| AppError::StoreUnavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn reset(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    async fn insert(&self, record: &Record) -> Result<()> {
        let mut tables = self.lock()?;
        let key = (record.kind(), record.key());
        if tables.contains_key(&key) {
            return Err(AppError::validation(format!(
                "duplicate {} key '{}'",
                key.0, key.1
            )));
        }
        tables.insert(key, record.clone());
        Ok(())
    }

    async fn select(&self, kind: RecordKind, filter: &Filter) -> Result<Vec<Record>> {
        filter.validate(kind.schema())?;
        let matched: Vec<Record> = self
            .lock()?
            .iter()
            .filter(|((k, _), record)| *k == kind && filter.matches(record))
            .map(|(_, record)| record.clone())
            .collect();
        Ok(filter.finish(matched))
    }

    async fn count(&self, kind: RecordKind) -> Result<u64> {
        let count = self.lock()?.keys().filter(|(k, _)| *k == kind).count();
        Ok(count as u64)
    }
}
