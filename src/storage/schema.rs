//! Database schema definitions
//!
//! The record table is deliberately index-free apart from its primary key;
//! every non-id lookup goes through the scan engine.

use crate::{Error, Result};

/// Column list shared by every statement, in row-mapping order
pub const COLUMNS: &str = "artifact_id, artifact_type, artifact, url, name_normalized, rating, \
     dataset_id, dataset_name, dataset_url, code_id, code_name, code_url";

/// Default table name
pub const DEFAULT_TABLE: &str = "artifacts_metadata";

/// Reject anything that is not a plain SQL identifier; table names are
/// interpolated into statements.
pub fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(Error::Config(format!("Invalid table name: {:?}", table)))
    }
}

/// SQL to create the record table
pub fn create_table(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    artifact_id TEXT PRIMARY KEY,
    artifact_type TEXT NOT NULL,
    artifact TEXT NOT NULL,
    url TEXT NOT NULL,
    name_normalized TEXT NOT NULL,
    rating TEXT,
    dataset_id TEXT,
    dataset_name TEXT,
    dataset_url TEXT,
    code_id TEXT,
    code_name TEXT,
    code_url TEXT
)
"#
    )
}

pub fn select_by_id(table: &str) -> String {
    format!("SELECT {COLUMNS} FROM {table} WHERE artifact_id = ?1")
}

pub fn upsert(table: &str) -> String {
    format!(
        "INSERT OR REPLACE INTO {table} ({COLUMNS}) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    )
}

pub fn delete_by_id(table: &str) -> String {
    format!("DELETE FROM {table} WHERE artifact_id = ?1")
}

/// First page of a key-ordered scan
pub fn scan_first(table: &str) -> String {
    format!("SELECT {COLUMNS} FROM {table} ORDER BY artifact_id LIMIT ?1")
}

/// Page following the cursor (exclusive)
pub fn scan_after(table: &str) -> String {
    format!("SELECT {COLUMNS} FROM {table} WHERE artifact_id > ?1 ORDER BY artifact_id LIMIT ?2")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("artifacts_metadata").is_ok());
        assert!(validate_table_name("_t1").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1abc").is_err());
        assert!(validate_table_name("a; DROP TABLE x").is_err());
    }
}
