//! Query engine implementation
//!
//! Provides the read-side operations layered on the scan engine:
//! - Metadata listing by artifact type
//! - Name queries (exact normalized match or `*`), deduplicated by id
//! - URL existence checks
//! - Dataset/code lookup by normalized name

use std::collections::HashSet;
use crate::Result;
use crate::artifact::{
    normalize_name, Artifact, ArtifactId, ArtifactMetadata, ArtifactQuery, ArtifactType, CodeRecord,
    DatasetRecord,
};
use crate::codec;
use crate::linker::pick_target;
use super::scan::{RecordFilter, RecordLookup};

/// Query engine over any predicate lookup
pub struct QueryEngine<'a, L: RecordLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: RecordLookup + ?Sized> QueryEngine<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    fn find(&self, filter: &RecordFilter) -> Result<Vec<crate::storage::ArtifactRecord>> {
        self.lookup.find_by_predicate(&|r| filter.matches(r))
    }

    /// Metadata of every artifact of one type
    pub fn list_metadata(&self, artifact_type: ArtifactType) -> Result<Vec<ArtifactMetadata>> {
        self.find(&RecordFilter::ByType(artifact_type))?
            .iter()
            .map(|r| codec::record_artifact(r).map(|a| a.metadata))
            .collect()
    }

    /// Run several name queries against one table snapshot.
    ///
    /// Each artifact appears at most once, in first-match order.
    pub fn query_artifacts(&self, queries: &[ArtifactQuery]) -> Result<Vec<ArtifactMetadata>> {
        let records = self.lookup.find_by_predicate(&|_| true)?;
        let mut seen: HashSet<ArtifactId> = HashSet::new();
        let mut results = Vec::new();

        for query in queries {
            let wanted = normalize_name(&query.name);
            for artifact_type in query.effective_types() {
                for record in records.iter().filter(|r| r.artifact_type == artifact_type) {
                    if !query.is_wildcard() && record.name_normalized != wanted {
                        continue;
                    }
                    if seen.insert(record.id.clone()) {
                        results.push(codec::record_artifact(record)?.metadata);
                    }
                }
            }
        }

        tracing::debug!("Query matched {} artifacts across {} queries", results.len(), queries.len());
        Ok(results)
    }

    /// Id of an artifact of `artifact_type` whose source URL is exactly `url`
    pub fn find_by_url(&self, artifact_type: ArtifactType, url: &str) -> Result<Option<ArtifactId>> {
        let matches = self.find(&RecordFilter::ByUrl(artifact_type, url.to_string()))?;
        Ok(matches.into_iter().map(|r| r.id).min())
    }

    pub fn artifact_exists(&self, artifact_type: ArtifactType, url: &str) -> Result<bool> {
        Ok(self.find_by_url(artifact_type, url)?.is_some())
    }

    /// Artifact of `artifact_type` whose normalized name equals the
    /// normalized `name`; duplicates resolve to the lowest id.
    pub fn find_by_name(&self, artifact_type: ArtifactType, name: &str) -> Result<Option<Artifact>> {
        let candidates = self.find(&RecordFilter::by_name(artifact_type, name))?;
        match pick_target(candidates.iter(), artifact_type, &normalize_name(name)) {
            Some(record) => Ok(Some(codec::record_artifact(record)?)),
            None => Ok(None),
        }
    }

    pub fn find_dataset_by_name(&self, name: &str) -> Result<Option<DatasetRecord>> {
        Ok(self
            .find_by_name(ArtifactType::Dataset, name)?
            .map(|artifact| DatasetRecord { artifact }))
    }

    pub fn find_code_by_name(&self, name: &str) -> Result<Option<CodeRecord>> {
        Ok(self
            .find_by_name(ArtifactType::Code, name)?
            .map(|artifact| CodeRecord { artifact }))
    }
}
