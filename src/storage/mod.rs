//! Storage Layer - flat key-value record persistence
//!
//! The registry needs only four primitives from its backing store:
//! atomic single-item get/put/delete keyed by artifact id, and a paginated
//! full-table scan. Backends classify their own failures into
//! `ResourceMissing` / `Transient` and carry no business logic.
//!
//! - `SqliteRecordStore`: one table, one row per artifact
//! - `MemoryRecordStore`: ordered map, for tests and embedders

pub mod schema;
pub mod sqlite;
pub mod memory;

pub use sqlite::SqliteRecordStore;
pub use memory::MemoryRecordStore;

use crate::artifact::{ArtifactId, ArtifactType};
use crate::Result;
use std::sync::Arc;

/// Flattened on-disk projection of one artifact.
///
/// `artifact` and `rating` hold the encoded documents; depending on the
/// backend they are either JSON text (`Value::String`) or already-parsed
/// structures. Only model records populate `rating` and the `dataset_*` /
/// `code_*` link fields. Absent optional fields are omitted, not null.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRecord {
    pub id: ArtifactId,
    pub artifact_type: ArtifactType,
    pub artifact: serde_json::Value,
    pub url: String,
    /// Always `normalize_name(metadata.name)` of the encoded artifact
    pub name_normalized: String,
    pub rating: Option<serde_json::Value>,
    pub dataset_id: Option<ArtifactId>,
    pub dataset_name: Option<String>,
    pub dataset_url: Option<String>,
    pub code_id: Option<ArtifactId>,
    pub code_name: Option<String>,
    pub code_url: Option<String>,
}

impl ArtifactRecord {
    pub fn is_model(&self) -> bool {
        self.artifact_type == ArtifactType::Model
    }

    /// Drop every model-only attribute (rating, hints, links)
    pub fn clear_model_fields(&mut self) {
        self.rating = None;
        self.dataset_id = None;
        self.dataset_name = None;
        self.dataset_url = None;
        self.code_id = None;
        self.code_name = None;
        self.code_url = None;
    }
}

/// One page of a full-table scan.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub records: Vec<ArtifactRecord>,
    /// Continuation cursor; `None` once the table is exhausted
    pub next_cursor: Option<String>,
}

/// Key-value primitives the registry is built on.
///
/// Single-item operations are atomic; nothing spanning several calls is.
pub trait RecordStore: Send + Sync {
    /// Fetch one record. A missing item is `Ok(None)`, not an error.
    fn get(&self, id: &str) -> Result<Option<ArtifactRecord>>;

    /// Insert or fully replace the record keyed by `record.id`.
    fn put(&self, record: &ArtifactRecord) -> Result<()>;

    /// Remove one record. Deleting a missing item succeeds.
    fn delete(&self, id: &str) -> Result<()>;

    /// Read up to `limit` records following `cursor` (exclusive).
    fn scan_page(&self, cursor: Option<&str>, limit: usize) -> Result<ScanPage>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn get(&self, id: &str) -> Result<Option<ArtifactRecord>> {
        (**self).get(id)
    }

    fn put(&self, record: &ArtifactRecord) -> Result<()> {
        (**self).put(record)
    }

    fn delete(&self, id: &str) -> Result<()> {
        (**self).delete(id)
    }

    fn scan_page(&self, cursor: Option<&str>, limit: usize) -> Result<ScanPage> {
        (**self).scan_page(cursor, limit)
    }
}
