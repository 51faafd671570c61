//! SQLite-backed dataset copy.
//!
//! Tables are derived from the static [`TableSchema`] of each record kind.
//! WAL mode and a busy timeout let many insert tasks share one file.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::query::Query;
use sqlx::{Row, Sqlite};

use crate::error::{AppError, Result};
use crate::models::{Filter, Record, RecordKind, SqlType, TableSchema, Value};
use crate::storage::ScheduleStore;

/// Connections wait this long on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One dataset copy in a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database file and ensure the schema exists.
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    /// Private in-memory database for tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn create_tables(&self) -> Result<()> {
        for kind in RecordKind::ALL {
            let schema = kind.schema();
            sqlx::query(&schema.create_table_sql())
                .execute(&self.pool)
                .await?;
            for sql in schema.create_index_sql() {
                sqlx::query(&sql).execute(&self.pool).await?;
            }
        }
        Ok(())
    }
}

fn bind<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Integer(i) => query.bind(i),
        Value::Text(s) => query.bind(s),
    }
}

fn decode(schema: &TableSchema, row: &SqliteRow) -> Result<Vec<Value>> {
    schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| -> Result<Value> {
            let value = match column.sql_type {
                SqlType::Integer => Value::Integer(row.try_get::<i64, _>(i)?),
                SqlType::Text => Value::Text(row.try_get::<String, _>(i)?),
            };
            Ok(value)
        })
        .collect()
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    async fn reset(&self) -> Result<()> {
        for kind in RecordKind::ALL {
            sqlx::query(&kind.schema().drop_table_sql())
                .execute(&self.pool)
                .await?;
        }
        self.create_tables().await
    }

    async fn insert(&self, record: &Record) -> Result<()> {
        let sql = record.kind().schema().insert_sql();
        let query = record
            .values()
            .into_iter()
            .fold(sqlx::query(&sql), bind);
        query.execute(&self.pool).await?;
        Ok(())
    }

    async fn select(&self, kind: RecordKind, filter: &Filter) -> Result<Vec<Record>> {
        let schema = kind.schema();
        let sql = schema.select_sql(filter)?;
        let query = filter
            .conditions
            .iter()
            .map(|(_, value)| value.clone())
            .fold(sqlx::query(&sql), bind);

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Record::from_values(kind, decode(schema, row)?))
            .collect()
    }

    async fn count(&self, kind: RecordKind) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.schema().table);
        let count = sqlx::query_scalar::<_, i64>(&sql).fetch_one(&self.pool).await?;
        u64::try_from(count).map_err(|_| AppError::schema(format!("negative count {count}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Class, Department, Section};

    fn department() -> Record {
        Record::from(Department {
            abbreviation: "CSE".to_string(),
            name: "Computer Science & Engineering".to_string(),
            link: "https://example.edu/cse.html".to_string(),
        })
    }

    fn class(code: &str, start: usize) -> Record {
        Record::from(Class {
            department: "CSE".to_string(),
            abbreviation: "cse".to_string(),
            code: code.to_string(),
            title: format!("CLASS {code}"),
            start,
            end: start + 100,
        })
    }

    fn section(sln: &str) -> Record {
        Record::from(Section {
            class_key: "cse142".to_string(),
            sln: sln.to_string(),
            section: "A".to_string(),
            meeting_times: "[]".to_string(),
            taken_seats: 3,
            total_seats: 40,
            notes: "first line\nsecond line\n".to_string(),
            ..Section::default()
        })
    }

    #[tokio::test]
    async fn test_insert_and_select_round_trip() {
        let store = SqliteStore::in_memory().await.unwrap();
        let records = vec![department(), class("142", 10), section("12345")];
        for record in &records {
            store.insert(record).await.unwrap();
        }

        for record in &records {
            let found = store
                .select(record.kind(), &Filter::new())
                .await
                .unwrap();
            assert_eq!(found, vec![record.clone()]);
        }
    }

    #[tokio::test]
    async fn test_duplicate_key_is_rejected() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.insert(&department()).await.unwrap();
        let result = store.insert(&department()).await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(store.count(RecordKind::Department).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_select_with_filter_order_and_limit() {
        let store = SqliteStore::in_memory().await.unwrap();
        for (code, start) in [("311", 300), ("142", 10), ("143", 120)] {
            store.insert(&class(code, start)).await.unwrap();
        }

        let filter = Filter::new()
            .eq("department", "CSE")
            .order_by("start_offset")
            .limit(2);
        let keys: Vec<String> = store
            .select(RecordKind::Class, &filter)
            .await
            .unwrap()
            .iter()
            .map(Record::key)
            .collect();
        assert_eq!(keys, vec!["cse142", "cse143"]);

        let none = store
            .select(RecordKind::Class, &Filter::new().eq("department", "MATH"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_select_unknown_column_is_schema_error() {
        let store = SqliteStore::in_memory().await.unwrap();
        let result = store
            .select(RecordKind::Section, &Filter::new().order_by("color"))
            .await;
        assert!(matches!(result, Err(AppError::Schema(_))));
    }

    #[tokio::test]
    async fn test_reset_discards_rows() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.insert(&department()).await.unwrap();
        store.insert(&section("12345")).await.unwrap();

        store.reset().await.unwrap();
        for kind in RecordKind::ALL {
            assert_eq!(store.count(kind).await.unwrap(), 0);
        }
        store.insert(&department()).await.unwrap();
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("schedule_a.db");

        let store = SqliteStore::open(&path, 4).await.unwrap();
        store.insert(&class("142", 0)).await.unwrap();
        store.close().await;
        assert!(path.exists());

        let reopened = SqliteStore::open(&path, 4).await.unwrap();
        assert_eq!(reopened.count(RecordKind::Class).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&temp_dir.path().join("slot.db"), 4)
            .await
            .unwrap();

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(&section(&format!("1{i:04}"))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.count(RecordKind::Section).await.unwrap(), 20);
    }
}
