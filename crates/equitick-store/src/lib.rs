//! # Equitick Store
//!
//! `DuckDB`-backed snapshot persistence for equitick. Implements the
//! core [`SnapshotStore`] seam so the service layer can serve recent
//! data across process restarts when every live source is down.
//!
//! The database holds one append-only `snapshots` table; reads always
//! take the most recently written row per domain key.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ::duckdb::ToSql;
use ::duckdb::{Connection, Error as DuckDbError};
use thiserror::Error;

use equitick_core::{SnapshotRecord, SnapshotStore, StoreError, TradeDate, UtcDateTime};

/// Errors local to opening and preparing the database.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error(transparent)]
    DuckDb(#[from] DuckDbError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Location of the snapshot database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: resolve_equitick_home().join("snapshots.duckdb"),
        }
    }
}

fn resolve_equitick_home() -> PathBuf {
    if let Ok(home) = std::env::var("EQUITICK_HOME") {
        return PathBuf::from(home);
    }
    std::env::var("HOME")
        .map(|home| Path::new(&home).join(".equitick"))
        .unwrap_or_else(|_| PathBuf::from(".equitick"))
}

/// Durable snapshot store over a single `DuckDB` file.
///
/// The connection is serialized behind a mutex; snapshot traffic is a
/// handful of writes per fetch, so contention is not a concern.
pub struct DuckDbSnapshotStore {
    connection: Mutex<Connection>,
}

impl DuckDbSnapshotStore {
    /// Opens (creating if needed) the database at the configured path
    /// and ensures the schema exists.
    pub fn open(config: &StoreConfig) -> Result<Self, OpenError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let connection = Connection::open(&config.db_path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// In-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, OpenError> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> Result<(), DuckDbError> {
        connection.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS snapshots (
                domain TEXT NOT NULL,
                trade_date TEXT NOT NULL,
                saved_at TEXT NOT NULL,
                payload TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_snapshots_domain
                ON snapshots (domain, saved_at);
            ",
        )
    }
}

impl SnapshotStore for DuckDbSnapshotStore {
    fn save_snapshot(
        &self,
        domain: &str,
        date: TradeDate,
        payload: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let trade_date = date.format_compact();
        let saved_at = UtcDateTime::now().format_rfc3339();
        let body = payload.to_string();

        let connection = self
            .connection
            .lock()
            .expect("snapshot connection lock should not be poisoned");
        let params: [&dyn ToSql; 4] = [&domain, &trade_date, &saved_at, &body];
        connection
            .execute(
                "INSERT INTO snapshots (domain, trade_date, saved_at, payload)
                 VALUES (?, ?, ?, ?)",
                params.as_slice(),
            )
            .map_err(|error| StoreError::Backend(error.to_string()))?;
        Ok(())
    }

    fn latest(&self, domain: &str) -> Result<Option<SnapshotRecord>, StoreError> {
        let connection = self
            .connection
            .lock()
            .expect("snapshot connection lock should not be poisoned");

        let params: [&dyn ToSql; 1] = [&domain];
        let row: Result<(String, String, String), DuckDbError> = connection.query_row(
            "SELECT trade_date, saved_at, payload
             FROM snapshots
             WHERE domain = ?
             ORDER BY saved_at DESC
             LIMIT 1",
            params.as_slice(),
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        );

        let (trade_date, saved_at, body) = match row {
            Ok(values) => values,
            Err(DuckDbError::QueryReturnedNoRows) => return Ok(None),
            Err(error) => return Err(StoreError::Backend(error.to_string())),
        };

        let date = TradeDate::parse(&trade_date)
            .map_err(|error| StoreError::Backend(format!("stored trade_date invalid: {error}")))?;
        let saved_at = UtcDateTime::parse(&saved_at)
            .map_err(|error| StoreError::Backend(format!("stored saved_at invalid: {error}")))?;
        let payload = serde_json::from_str(&body)?;

        Ok(Some(SnapshotRecord {
            domain: domain.to_owned(),
            date,
            saved_at,
            payload,
        }))
    }
}
