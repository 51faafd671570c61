//! Active-slot control row.
//!
//! A one-row table holds the slot readers should use. Only the rebuild loop
//! writes it, and only through a conditional update that names the slot it
//! expects to replace.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::error::{AppError, Result};
use crate::models::Slot;

const CREATE_SQL: &str = "CREATE TABLE IF NOT EXISTS switch (slot INTEGER NOT NULL)";
const SEED_SQL: &str = "INSERT INTO switch (slot) SELECT ? WHERE NOT EXISTS (SELECT 1 FROM switch)";
const READ_SQL: &str = "SELECT slot FROM switch LIMIT 1";
const FLIP_SQL: &str = "UPDATE switch SET slot = ? WHERE slot = ?";

/// Handle to the control store.
#[derive(Debug, Clone)]
pub struct SlotSwitch {
    pool: SqlitePool,
}

impl SlotSwitch {
    /// Open the control database, creating the table and seeding slot A when empty.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .map_err(|e| unavailable(path.display(), e))?;

        Self::init(pool).await
    }

    /// Control row in a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| unavailable("memory", e))?;

        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_SQL).execute(&pool).await?;
        sqlx::query(SEED_SQL)
            .bind(Slot::A.as_i64())
            .execute(&pool)
            .await?;
        Ok(Self { pool })
    }

    /// The slot readers currently use.
    pub async fn get_active_slot(&self) -> Result<Slot> {
        let value = sqlx::query_scalar::<_, i64>(READ_SQL)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| unavailable("control row", e))?;

        let value =
            value.ok_or_else(|| AppError::StoreUnavailable("control row missing".to_string()))?;
        Slot::from_i64(value)
            .ok_or_else(|| AppError::schema(format!("control row holds unknown slot {value}")))
    }

    /// The slot the next rebuild writes to.
    pub async fn inactive_slot(&self) -> Result<Slot> {
        Ok(self.get_active_slot().await?.complement())
    }

    /// Replace `expected` with its complement.
    ///
    /// Fails with [`AppError::SwitchConflict`] if the control row no longer
    /// holds `expected`. Returns the new active slot.
    pub async fn flip_slot(&self, expected: Slot) -> Result<Slot> {
        let next = expected.complement();
        let result = sqlx::query(FLIP_SQL)
            .bind(next.as_i64())
            .bind(expected.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| unavailable("control row", e))?;

        if result.rows_affected() != 1 {
            let found = match self.get_active_slot().await {
                Ok(slot) => slot.to_string(),
                Err(e) => e.to_string(),
            };
            return Err(AppError::SwitchConflict { expected, found });
        }

        log::info!("Active slot flipped {expected} -> {next}");
        Ok(next)
    }
}

fn unavailable(what: impl std::fmt::Display, e: sqlx::Error) -> AppError {
    AppError::StoreUnavailable(format!("{what}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_with_slot_a() {
        let switch = SlotSwitch::in_memory().await.unwrap();
        assert_eq!(switch.get_active_slot().await.unwrap(), Slot::A);
        assert_eq!(switch.inactive_slot().await.unwrap(), Slot::B);
    }

    #[tokio::test]
    async fn test_flip_and_flip_back() {
        let switch = SlotSwitch::in_memory().await.unwrap();
        assert_eq!(switch.flip_slot(Slot::A).await.unwrap(), Slot::B);
        assert_eq!(switch.get_active_slot().await.unwrap(), Slot::B);
        assert_eq!(switch.flip_slot(Slot::B).await.unwrap(), Slot::A);
        assert_eq!(switch.get_active_slot().await.unwrap(), Slot::A);
    }

    #[tokio::test]
    async fn test_stale_flip_is_conflict() {
        let switch = SlotSwitch::in_memory().await.unwrap();
        switch.flip_slot(Slot::A).await.unwrap();

        match switch.flip_slot(Slot::A).await {
            Err(AppError::SwitchConflict { expected, found }) => {
                assert_eq!(expected, Slot::A);
                assert_eq!(found, "B");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(switch.get_active_slot().await.unwrap(), Slot::B);
    }

    #[tokio::test]
    async fn test_state_persists_across_open() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("switch.db");

        let switch = SlotSwitch::open(&path).await.unwrap();
        switch.flip_slot(Slot::A).await.unwrap();
        drop(switch);

        let reopened = SlotSwitch::open(&path).await.unwrap();
        assert_eq!(reopened.get_active_slot().await.unwrap(), Slot::B);
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let switch = SlotSwitch::in_memory().await.unwrap();
        switch.pool.close().await;
        assert!(matches!(
            switch.get_active_slot().await,
            Err(AppError::StoreUnavailable(_))
        ));
    }
}
