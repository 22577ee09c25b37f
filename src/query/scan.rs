//! Scan & filter engine
//!
//! Without secondary indexes every non-id lookup is a full, paginated
//! table scan with an in-memory predicate. Results are fully materialized;
//! the corpus is assumed to fit in memory.

use crate::Result;
use crate::artifact::{normalize_name, ArtifactType};
use crate::storage::{ArtifactRecord, RecordStore};

/// Default number of records requested per scan page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Predicate-based lookup. Callers depend on this rather than on scanning,
/// so an indexed implementation can replace `ScanEngine`.
pub trait RecordLookup {
    fn find_by_predicate(&self, predicate: &dyn Fn(&ArtifactRecord) -> bool) -> Result<Vec<ArtifactRecord>>;
}

/// The in-memory predicates the registry needs.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordFilter {
    All,
    ByType(ArtifactType),
    /// Exact source URL within one type
    ByUrl(ArtifactType, String),
    /// Normalized name within one type; the name is normalized on construction
    ByName(ArtifactType, String),
    /// Models whose stored dataset hint normalizes to the given name
    ModelsHintingDataset(String),
    /// Models whose stored code hint normalizes to the given name
    ModelsHintingCode(String),
    /// Models currently linked to the given dataset id
    ModelsLinkedToDataset(String),
    /// Models currently linked to the given code id
    ModelsLinkedToCode(String),
}

impl RecordFilter {
    pub fn by_name(artifact_type: ArtifactType, name: &str) -> Self {
        RecordFilter::ByName(artifact_type, normalize_name(name))
    }

    pub fn matches(&self, record: &ArtifactRecord) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::ByType(t) => record.artifact_type == *t,
            RecordFilter::ByUrl(t, url) => record.artifact_type == *t && record.url == *url,
            RecordFilter::ByName(t, name) => record.artifact_type == *t && record.name_normalized == *name,
            RecordFilter::ModelsHintingDataset(name) => {
                record.is_model() && hint_matches(record.dataset_name.as_deref(), name)
            }
            RecordFilter::ModelsHintingCode(name) => {
                record.is_model() && hint_matches(record.code_name.as_deref(), name)
            }
            RecordFilter::ModelsLinkedToDataset(id) => {
                record.is_model() && record.dataset_id.as_deref() == Some(id.as_str())
            }
            RecordFilter::ModelsLinkedToCode(id) => {
                record.is_model() && record.code_id.as_deref() == Some(id.as_str())
            }
        }
    }
}

fn hint_matches(hint: Option<&str>, normalized: &str) -> bool {
    hint.is_some_and(|h| normalize_name(h) == normalized)
}

/// Full-table scanner over a record store
pub struct ScanEngine<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    page_size: usize,
}

impl<'a, S: RecordStore + ?Sized> ScanEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_page_size(store, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(store: &'a S, page_size: usize) -> Self {
        Self { store, page_size: page_size.max(1) }
    }

    /// Drive `scan_page` until the cursor is exhausted, keeping the records
    /// that satisfy `predicate`.
    pub fn scan_all(&self, predicate: impl Fn(&ArtifactRecord) -> bool) -> Result<Vec<ArtifactRecord>> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.store.scan_page(cursor.as_deref(), self.page_size)?;
            pages += 1;
            out.extend(page.records.into_iter().filter(|r| predicate(r)));

            match page.next_cursor {
                // A repeated cursor would loop forever
                Some(next) if cursor.as_deref() != Some(next.as_str()) => {
                    cursor = Some(next);
                }
                Some(next) => {
                    tracing::warn!("Scan cursor repeated ({}), stopping after {} pages", next, pages);
                    break;
                }
                None => break,
            }
        }

        tracing::debug!("Scanned {} pages, {} records matched", pages, out.len());
        Ok(out)
    }

    pub fn scan_filter(&self, filter: &RecordFilter) -> Result<Vec<ArtifactRecord>> {
        self.scan_all(|r| filter.matches(r))
    }

    /// Every record in the table
    pub fn snapshot(&self) -> Result<Vec<ArtifactRecord>> {
        self.scan_all(|_| true)
    }
}

impl<S: RecordStore + ?Sized> RecordLookup for ScanEngine<'_, S> {
    fn find_by_predicate(&self, predicate: &dyn Fn(&ArtifactRecord) -> bool) -> Result<Vec<ArtifactRecord>> {
        self.scan_all(predicate)
    }
}
