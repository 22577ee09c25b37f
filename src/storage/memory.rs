//! In-memory record store

use std::collections::BTreeMap;
use std::ops::Bound;
use parking_lot::RwLock;
use crate::Result;
use super::{ArtifactRecord, RecordStore, ScanPage};

/// Ordered in-memory store with the same paging contract as the SQLite one.
///
/// Records are kept exactly as they were put, so structured documents stay
/// structured (the pre-parsed form of the wire encoding).
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<String, ArtifactRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, id: &str) -> Result<Option<ArtifactRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn put(&self, record: &ArtifactRecord) -> Result<()> {
        self.records.write().insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.records.write().remove(id);
        Ok(())
    }

    fn scan_page(&self, cursor: Option<&str>, limit: usize) -> Result<ScanPage> {
        let limit = limit.max(1);
        let records = self.records.read();
        let lower = match cursor {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };

        let page: Vec<ArtifactRecord> = records
            .range::<str, _>((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect();

        let next_cursor = if page.len() == limit {
            page.last().map(|r| r.id.clone())
        } else {
            None
        };

        Ok(ScanPage { records: page, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactType;

    fn record(id: &str) -> ArtifactRecord {
        ArtifactRecord {
            id: id.to_string(),
            artifact_type: ArtifactType::Code,
            artifact: serde_json::json!({}),
            url: String::new(),
            name_normalized: String::new(),
            rating: None,
            dataset_id: None,
            dataset_name: None,
            dataset_url: None,
            code_id: None,
            code_name: None,
            code_url: None,
        }
    }

    #[test]
    fn test_scan_follows_cursor() {
        let store = MemoryRecordStore::new();
        for id in ["c", "a", "b"] {
            store.put(&record(id)).unwrap();
        }

        let first = store.scan_page(None, 2).unwrap();
        let ids: Vec<_> = first.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let rest = store.scan_page(first.next_cursor.as_deref(), 2).unwrap();
        assert_eq!(rest.records.len(), 1);
        assert_eq!(rest.records[0].id, "c");
        assert!(rest.next_cursor.is_none());
    }

    #[test]
    fn test_put_replaces() {
        let store = MemoryRecordStore::new();
        store.put(&record("a")).unwrap();
        let mut updated = record("a");
        updated.url = "http://new".to_string();
        store.put(&updated).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().unwrap().url, "http://new");
    }
}
