mod audit;
mod links;
mod programs;
pub mod schema;
mod templates;

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{types::Type, Connection, Row};
use uuid::Uuid;

use crate::error::{LinkError, LinkResult};

/// Shared handle to the SQLite store.
///
/// Cloning is cheap; all clones serialize on the same connection, so every
/// [`Database::transaction`] call observes a consistent view.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> LinkResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens the database in the platform data directory.
    pub fn open_default() -> anyhow::Result<Self> {
        let dirs = directories::ProjectDirs::from("dev", "curricula", "curricula")
            .context("could not determine a data directory")?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("creating {}", data_dir.display()))?;
        let path = data_dir.join("curricula.db");
        tracing::debug!("Opening database at {}", path.display());
        Ok(Self::open(path)?)
    }

    pub fn open_memory() -> LinkResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> LinkResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> LinkResult<()> {
        self.with_connection(|conn| {
            conn.execute_batch(schema::SCHEMA)?;
            Ok(())
        })
    }

    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> LinkResult<T>,
    ) -> LinkResult<T> {
        let conn = self.conn.lock().map_err(|_| LinkError::Poisoned)?;
        f(&conn)
    }

    /// Runs `f` inside one transaction. Any error rolls the whole unit back.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Connection) -> LinkResult<T>,
    ) -> LinkResult<T> {
        let mut conn = self.conn.lock().map_err(|_| LinkError::Poisoned)?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

pub(crate) fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e.to_string())))
        .transpose()
}

pub(crate) fn datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_datetime_at(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_datetime(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}
