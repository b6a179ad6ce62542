//! Local persistence for logbook reports and pending alerts.
//!
//! One `SQLite` database holds the pipeline's output tables
//! (`logbook_reports`, `logbook_raw_messages`, `pending_alerts`) and the
//! collaborator tables it reads (`silenced_alerts`, `positions`,
//! `risk_factors`). The core only leans on two primitives: delete rows
//! where column = value, and append rows with JSON-text columns.

mod alerts;
mod logbook;

use std::path::Path;
use std::{fs, io};

use rusqlite::Connection;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("alert config name must be a plain non-empty label, got {0:?}")]
    InvalidConfigName(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Database-backed storage for the pipeline.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (creating as needed) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// An in-memory database with the full schema. Test-friendly.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS logbook_reports (
            id INTEGER PRIMARY KEY,
            operation_number TEXT NOT NULL,
            operation_datetime_utc TEXT,
            operation_type TEXT NOT NULL,
            report_id TEXT,
            referenced_report_id TEXT,
            report_datetime_utc TEXT,
            cfr TEXT,
            ircs TEXT,
            external_identification TEXT,
            vessel_name TEXT,
            flag_state TEXT,
            log_type TEXT,
            value TEXT,
            software TEXT,
            transmission_format TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS logbook_raw_messages (
            operation_number TEXT NOT NULL,
            xml_message TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pending_alerts (
            id INTEGER PRIMARY KEY,
            vessel_name TEXT,
            internal_reference_number TEXT,
            external_reference_number TEXT,
            ircs TEXT,
            vessel_identifier TEXT NOT NULL,
            creation_date TEXT NOT NULL,
            value TEXT NOT NULL,
            alert_config_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS silenced_alerts (
            id INTEGER PRIMARY KEY,
            internal_reference_number TEXT,
            external_reference_number TEXT,
            ircs TEXT,
            facade TEXT,
            type TEXT NOT NULL,
            silenced_before_date TEXT NOT NULL,
            silenced_after_date TEXT
        );

        CREATE TABLE IF NOT EXISTS positions (
            id INTEGER PRIMARY KEY,
            internal_reference_number TEXT,
            external_reference_number TEXT,
            ircs TEXT,
            vessel_name TEXT,
            flag_state TEXT,
            facade TEXT,
            date_time TEXT NOT NULL,
            is_at_port INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS risk_factors (
            cfr TEXT PRIMARY KEY,
            risk_factor REAL NOT NULL
        );",
    )
}
