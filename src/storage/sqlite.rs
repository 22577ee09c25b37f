//! SQLite record store implementation

use std::path::Path;
use std::time::Duration;
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use crate::{Error, Result};
use crate::artifact::ArtifactType;
use super::{schema, ArtifactRecord, RecordStore, ScanPage};

/// SQLite-backed record store: one table, one row per artifact id
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteRecordStore {
    /// Open a database file (creates the file if it doesn't exist).
    ///
    /// With `create_table == false` the table must already exist; if it
    /// doesn't, every operation fails with `ResourceMissing`.
    pub fn open(path: &Path, table: &str, create_table: bool) -> Result<Self> {
        schema::validate_table_name(table)?;
        let conn = Connection::open(path).map_err(|source| Error::Storage {
            operation: "open",
            id: None,
            source,
        })?;
        let store = Self { conn: Mutex::new(conn), table: table.to_string() };
        if create_table {
            store.initialize_schema()?;
        }
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(table: &str) -> Result<Self> {
        schema::validate_table_name(table)?;
        let conn = Connection::open_in_memory().map_err(|source| Error::Storage {
            operation: "open",
            id: None,
            source,
        })?;
        let store = Self { conn: Mutex::new(conn), table: table.to_string() };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// How long a statement waits on another connection's lock before
    /// failing as `Transient`
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn
            .lock()
            .busy_timeout(timeout)
            .map_err(|e| self.classify("busy_timeout", None, e))
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn
            .lock()
            .execute(&schema::create_table(&self.table), [])
            .map_err(|e| self.classify("create_table", None, e))?;
        Ok(())
    }

    /// Map a backend failure onto the registry's error taxonomy
    fn classify(&self, operation: &'static str, id: Option<&str>, err: rusqlite::Error) -> Error {
        if let rusqlite::Error::SqliteFailure(ffi_err, message) = &err {
            if matches!(ffi_err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
                return Error::Transient {
                    operation,
                    id: id.map(str::to_string),
                    message: err.to_string(),
                };
            }
            if message.as_deref().is_some_and(|m| m.contains("no such table")) {
                return Error::ResourceMissing { operation, table: self.table.clone() };
            }
        }
        Error::Storage { operation, id: id.map(str::to_string), source: err }
    }

    fn scan_rows(&self, cursor: Option<&str>, limit: usize) -> rusqlite::Result<Vec<RawRow>> {
        let conn = self.conn.lock();
        let rows = match cursor {
            Some(after) => {
                let mut stmt = conn.prepare(&schema::scan_after(&self.table))?;
                stmt.query_map(params![after, limit as i64], RawRow::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&schema::scan_first(&self.table))?;
                stmt.query_map(params![limit as i64], RawRow::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(rows)
    }
}

impl RecordStore for SqliteRecordStore {
    fn get(&self, id: &str) -> Result<Option<ArtifactRecord>> {
        let raw = self
            .conn
            .lock()
            .query_row(&schema::select_by_id(&self.table), [id], RawRow::from_row)
            .optional()
            .map_err(|e| self.classify("get", Some(id), e))?;
        raw.map(RawRow::into_record).transpose()
    }

    fn put(&self, record: &ArtifactRecord) -> Result<()> {
        let artifact = json_text(&record.artifact);
        let rating = record.rating.as_ref().map(json_text);
        self.conn
            .lock()
            .execute(
                &schema::upsert(&self.table),
                params![
                    record.id,
                    record.artifact_type.as_str(),
                    artifact,
                    record.url,
                    record.name_normalized,
                    rating,
                    record.dataset_id,
                    record.dataset_name,
                    record.dataset_url,
                    record.code_id,
                    record.code_name,
                    record.code_url,
                ],
            )
            .map_err(|e| self.classify("put", Some(&record.id), e))?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .lock()
            .execute(&schema::delete_by_id(&self.table), [id])
            .map_err(|e| self.classify("delete", Some(id), e))?;
        Ok(())
    }

    fn scan_page(&self, cursor: Option<&str>, limit: usize) -> Result<ScanPage> {
        let limit = limit.max(1);
        let rows = self
            .scan_rows(cursor, limit)
            .map_err(|e| self.classify("scan", None, e))?;

        // A short page means the table is exhausted
        let next_cursor = if rows.len() == limit {
            rows.last().map(|r| r.id.clone())
        } else {
            None
        };
        let records = rows
            .into_iter()
            .map(RawRow::into_record)
            .collect::<Result<Vec<_>>>()?;

        Ok(ScanPage { records, next_cursor })
    }
}

/// Serialize a stored document as text; string values are stored verbatim
fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Row as read from SQLite, before type validation
struct RawRow {
    id: String,
    artifact_type: String,
    artifact: String,
    url: String,
    name_normalized: String,
    rating: Option<String>,
    dataset_id: Option<String>,
    dataset_name: Option<String>,
    dataset_url: Option<String>,
    code_id: Option<String>,
    code_name: Option<String>,
    code_url: Option<String>,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            artifact_type: row.get(1)?,
            artifact: row.get(2)?,
            url: row.get(3)?,
            name_normalized: row.get(4)?,
            rating: row.get(5)?,
            dataset_id: row.get(6)?,
            dataset_name: row.get(7)?,
            dataset_url: row.get(8)?,
            code_id: row.get(9)?,
            code_name: row.get(10)?,
            code_url: row.get(11)?,
        })
    }

    fn into_record(self) -> Result<ArtifactRecord> {
        let artifact_type: ArtifactType = self
            .artifact_type
            .parse()
            .map_err(|_| Error::corrupt(&self.id, format!("unknown artifact type {:?}", self.artifact_type)))?;

        Ok(ArtifactRecord {
            id: self.id,
            artifact_type,
            artifact: serde_json::Value::String(self.artifact),
            url: self.url,
            name_normalized: self.name_normalized,
            rating: self.rating.map(serde_json::Value::String),
            dataset_id: self.dataset_id,
            dataset_name: self.dataset_name,
            dataset_url: self.dataset_url,
            code_id: self.code_id,
            code_name: self.code_name,
            code_url: self.code_url,
        })
    }
}
