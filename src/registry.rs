//! Artifact store facade
//!
//! The public operation set consumed by callers. Every operation is a
//! composition of record store primitives, the codec, the scan engine, and
//! the relationship linker; none of them is transactional.

use std::fmt;
use parking_lot::{Mutex, MutexGuard};
use crate::{Error, Result};
use crate::artifact::{
    Artifact, ArtifactId, ArtifactMetadata, ArtifactQuery, ArtifactType, CodeRecord, DatasetRecord,
    LinkHints,
};
use crate::codec;
use crate::config::{ensure_db_dir, RegistryConfig};
use crate::linker::{LinkKind, LinkState, RelationshipLinker};
use crate::query::{QueryEngine, ScanEngine, DEFAULT_PAGE_SIZE};
use crate::rating::ModelRating;
use crate::storage::{ArtifactRecord, RecordStore, SqliteRecordStore};

/// Fresh collision-resistant artifact id
pub fn generate_id() -> ArtifactId {
    uuid::Uuid::new_v4().to_string()
}

/// Registry of models, datasets, and code over one record store
pub struct ArtifactRegistry<S: RecordStore> {
    store: S,
    page_size: usize,
    write_lock: Option<Mutex<()>>,
}

impl ArtifactRegistry<SqliteRecordStore> {
    /// Open the SQLite-backed registry described by `config`
    pub fn open(config: &RegistryConfig) -> Result<Self> {
        config.validate()?;
        ensure_db_dir(&config.database)?;
        let store = SqliteRecordStore::open(&config.database, &config.table, config.create_table)?;
        tracing::debug!("Opened registry {:?} (table {})", config.database, config.table);
        Ok(Self::with_config(store, config))
    }
}

impl<S: RecordStore> ArtifactRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store, page_size: DEFAULT_PAGE_SIZE, write_lock: None }
    }

    /// Use `config`'s scan page size and write serialization on `store`
    pub fn with_config(store: S, config: &RegistryConfig) -> Self {
        Self {
            store,
            page_size: config.scan_page_size.max(1),
            write_lock: config.serialize_writes.then(|| Mutex::new(())),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn write_guard(&self) -> Option<MutexGuard<'_, ()>> {
        self.write_lock.as_ref().map(|lock| lock.lock())
    }

    fn scan(&self) -> ScanEngine<'_, S> {
        ScanEngine::with_page_size(&self.store, self.page_size)
    }

    fn linker(&self) -> RelationshipLinker<'_, S> {
        RelationshipLinker::new(&self.store, self.page_size)
    }

    /// Fetch a record and check its type
    fn load(&self, id: &str, expected: ArtifactType) -> Result<Option<ArtifactRecord>> {
        match self.store.get(id)? {
            Some(record) if record.artifact_type != expected => Err(Error::TypeMismatch {
                id: id.to_string(),
                expected,
                found: record.artifact_type,
            }),
            other => Ok(other),
        }
    }

    fn load_existing(&self, id: &str, expected: ArtifactType) -> Result<ArtifactRecord> {
        self.load(id, expected)?.ok_or_else(|| {
            tracing::debug!("{} {} not found", expected, id);
            Error::NotFound { id: id.to_string() }
        })
    }

    /// Persist an artifact, resolving links in both directions.
    ///
    /// An empty id is replaced by a generated one. For a model, omitted
    /// hints and an omitted rating are carried over from the stored record.
    /// For a dataset or code package, every model waiting on its name is
    /// relinked after it is written.
    pub fn save(&self, artifact: &Artifact, rating: Option<&ModelRating>, hints: LinkHints) -> Result<ArtifactId> {
        let _guard = self.write_guard();

        let mut artifact = artifact.clone();
        if artifact.metadata.id.is_empty() {
            artifact.metadata.id = generate_id();
        }
        let id = artifact.metadata.id.clone();
        let artifact_type = artifact.artifact_type();

        if rating.is_some() && artifact_type != ArtifactType::Model {
            return Err(Error::TypeMismatch { id, expected: ArtifactType::Model, found: artifact_type });
        }

        // Ids share one namespace across types
        let existing = self.load(&id, artifact_type)?;
        let mut record = codec::to_record(&artifact)?;

        if artifact_type == ArtifactType::Model {
            apply_model_inputs(&mut record, existing.as_ref(), rating, hints)?;
            self.linker().link_model(&mut record)?;
            self.store.put(&record)?;
        } else {
            if hints != LinkHints::default() {
                tracing::debug!("Ignoring link hints on {} {}", artifact_type, id);
            }
            self.store.put(&record)?;
            let stats = self.linker().propagate_target(&record)?;
            if stats.relinked + stats.cleared > 0 {
                tracing::info!(
                    "{} {} relinked {} models, cleared {}",
                    artifact_type,
                    id,
                    stats.relinked,
                    stats.cleared
                );
            }
        }

        tracing::info!(
            "Saved {} {} ({})",
            artifact_type,
            id,
            if existing.is_some() { "updated" } else { "created" }
        );
        Ok(id)
    }

    pub fn get(&self, id: &str, expected: ArtifactType) -> Result<Artifact> {
        let record = self.load_existing(id, expected)?;
        codec::record_artifact(&record)
    }

    /// Current links of a model
    pub fn model_links(&self, id: &str) -> Result<LinkState> {
        let record = self.load_existing(id, ArtifactType::Model)?;
        Ok(LinkState {
            dataset: LinkKind::Dataset.current(&record),
            code: LinkKind::Code.current(&record),
        })
    }

    /// Delete an artifact; returns whether a record was removed.
    ///
    /// Models linked to a deleted dataset or code package are unlinked
    /// first; if any of them cannot be updated the target is kept and the
    /// failure is returned, so a retry finishes the cascade.
    pub fn delete(&self, id: &str, expected: ArtifactType) -> Result<bool> {
        let _guard = self.write_guard();

        if self.load(id, expected)?.is_none() {
            tracing::debug!("Delete of absent {} {}", expected, id);
            return Ok(false);
        }

        if expected != ArtifactType::Model {
            let stats = self.linker().scrub_target(id, expected)?;
            if stats.cleared > 0 {
                tracing::info!("Unlinked {} models from {} {}", stats.cleared, expected, id);
            }
        }

        self.store.delete(id)?;
        tracing::info!("Deleted {} {}", expected, id);
        Ok(true)
    }

    pub fn list_metadata(&self, artifact_type: ArtifactType) -> Result<Vec<ArtifactMetadata>> {
        let scan = self.scan();
        QueryEngine::new(&scan).list_metadata(artifact_type)
    }

    /// Metadata matching any of `queries`, each artifact at most once
    pub fn query_artifacts(&self, queries: &[ArtifactQuery]) -> Result<Vec<ArtifactMetadata>> {
        let scan = self.scan();
        QueryEngine::new(&scan).query_artifacts(queries)
    }

    /// Delete every record, one at a time.
    ///
    /// Keeps going past failures and returns the first one; on success
    /// returns the number of records removed.
    pub fn reset(&self) -> Result<usize> {
        let _guard = self.write_guard();

        let ids: Vec<ArtifactId> = self.scan().snapshot()?.into_iter().map(|r| r.id).collect();
        let mut removed = 0;
        let mut first_error: Option<Error> = None;

        for id in &ids {
            match self.store.delete(id) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!("Reset failed to delete {}: {}", id, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        tracing::info!("Reset removed {} of {} records", removed, ids.len());
        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    pub fn artifact_exists(&self, artifact_type: ArtifactType, url: &str) -> Result<bool> {
        let scan = self.scan();
        QueryEngine::new(&scan).artifact_exists(artifact_type, url)
    }

    pub fn find_by_url(&self, artifact_type: ArtifactType, url: &str) -> Result<Option<ArtifactId>> {
        let scan = self.scan();
        QueryEngine::new(&scan).find_by_url(artifact_type, url)
    }

    /// Replace the rating stored on a model
    pub fn set_model_rating(&self, id: &str, rating: &ModelRating) -> Result<()> {
        let _guard = self.write_guard();

        let mut record = self.load_existing(id, ArtifactType::Model)?;
        record.rating = Some(codec::encode_rating(rating)?);
        self.store.put(&record)?;
        tracing::info!("Rated model {} (net score {:.3})", id, rating.net_score);
        Ok(())
    }

    /// Rating stored on a model; `None` if it was never rated
    pub fn get_model_rating(&self, id: &str) -> Result<Option<ModelRating>> {
        let record = self.load_existing(id, ArtifactType::Model)?;
        codec::decode_rating(id, record.rating.as_ref())
    }

    pub fn find_dataset_by_name(&self, name: &str) -> Result<Option<DatasetRecord>> {
        let scan = self.scan();
        QueryEngine::new(&scan).find_dataset_by_name(name)
    }

    pub fn find_code_by_name(&self, name: &str) -> Result<Option<CodeRecord>> {
        let scan = self.scan();
        QueryEngine::new(&scan).find_code_by_name(name)
    }

    /// Counts over one table snapshot
    pub fn stats(&self) -> Result<RegistryStats> {
        let mut stats = RegistryStats::default();
        for record in self.scan().snapshot()? {
            match record.artifact_type {
                ArtifactType::Model => {
                    stats.models += 1;
                    if record.dataset_id.is_some() {
                        stats.models_with_dataset += 1;
                    } else if record.dataset_name.is_some() {
                        stats.pending_links += 1;
                    }
                    if record.code_id.is_some() {
                        stats.models_with_code += 1;
                    } else if record.code_name.is_some() {
                        stats.pending_links += 1;
                    }
                    if record.rating.is_some() {
                        stats.rated_models += 1;
                    }
                }
                ArtifactType::Dataset => stats.datasets += 1,
                ArtifactType::Code => stats.code += 1,
            }
        }
        Ok(stats)
    }
}

/// Fill the model-only attributes of a fresh record from the caller's
/// inputs, falling back to what `existing` already stores.
fn apply_model_inputs(
    record: &mut ArtifactRecord,
    existing: Option<&ArtifactRecord>,
    rating: Option<&ModelRating>,
    hints: LinkHints,
) -> Result<()> {
    record.rating = match rating {
        Some(rating) => Some(codec::encode_rating(rating)?),
        None => existing.and_then(|e| e.rating.clone()),
    };

    // Blank hints count as omitted
    let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let LinkHints { dataset_name, dataset_url, code_name, code_url } = hints;
    let (dataset_name, dataset_url) = (present(dataset_name), present(dataset_url));
    let (code_name, code_url) = (present(code_name), present(code_url));

    // A stored url is only a fallback while its slot is unlinked
    let (kept_dataset_name, kept_dataset_url) = match existing {
        Some(e) if dataset_name.is_none() => {
            (e.dataset_name.clone(), e.dataset_id.is_none().then(|| e.dataset_url.clone()).flatten())
        }
        _ => (None, None),
    };
    let (kept_code_name, kept_code_url) = match existing {
        Some(e) if code_name.is_none() => {
            (e.code_name.clone(), e.code_id.is_none().then(|| e.code_url.clone()).flatten())
        }
        _ => (None, None),
    };

    record.dataset_name = dataset_name.or(kept_dataset_name);
    record.dataset_url = dataset_url.or(kept_dataset_url);
    record.code_name = code_name.or(kept_code_name);
    record.code_url = code_url.or(kept_code_url);
    Ok(())
}

/// Registry-wide counts
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RegistryStats {
    pub models: usize,
    pub datasets: usize,
    pub code: usize,
    pub models_with_dataset: usize,
    pub models_with_code: usize,
    /// Name hints that have not resolved to a record yet
    pub pending_links: usize,
    pub rated_models: usize,
}

impl RegistryStats {
    pub fn total(&self) -> usize {
        self.models + self.datasets + self.code
    }
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Artifacts: {}", self.total())?;
        writeln!(f, "  Models: {}", self.models)?;
        writeln!(f, "  Datasets: {}", self.datasets)?;
        writeln!(f, "  Code: {}", self.code)?;
        writeln!(f, "Links:")?;
        writeln!(f, "  Models -> dataset: {}", self.models_with_dataset)?;
        writeln!(f, "  Models -> code: {}", self.models_with_code)?;
        writeln!(f, "  Pending name hints: {}", self.pending_links)?;
        write!(f, "Rated models: {}", self.rated_models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRecordStore;

    fn registry() -> ArtifactRegistry<MemoryRecordStore> {
        ArtifactRegistry::new(MemoryRecordStore::new())
    }

    fn model(name: &str) -> Artifact {
        Artifact::new(ArtifactType::Model, name, format!("https://hf.co/{}", name))
    }

    #[test]
    fn test_generate_id_unique() {
        let a = generate_id();
        assert_ne!(a, generate_id());
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_save_assigns_id_and_get_roundtrips() {
        let registry = registry();
        let id = registry.save(&model("bert"), None, LinkHints::none()).unwrap();
        assert!(!id.is_empty());

        let fetched = registry.get(&id, ArtifactType::Model).unwrap();
        assert_eq!(fetched.metadata.name, "bert");
        assert_eq!(fetched.id(), id);
    }

    #[test]
    fn test_get_errors() {
        let registry = registry();
        let id = registry.save(&model("bert"), None, LinkHints::none()).unwrap();

        assert!(registry.get("missing", ArtifactType::Model).unwrap_err().is_not_found());
        assert!(matches!(
            registry.get(&id, ArtifactType::Dataset),
            Err(Error::TypeMismatch { expected: ArtifactType::Dataset, found: ArtifactType::Model, .. })
        ));
    }

    #[test]
    fn test_save_rejects_cross_type_id_reuse() {
        let registry = registry();
        registry.save(&model("bert").with_id("x1"), None, LinkHints::none()).unwrap();

        let dataset = Artifact::new(ArtifactType::Dataset, "squad", "u").with_id("x1");
        assert!(matches!(
            registry.save(&dataset, None, LinkHints::none()),
            Err(Error::TypeMismatch { .. })
        ));
        assert_eq!(registry.get("x1", ArtifactType::Model).unwrap().metadata.name, "bert");
    }

    #[test]
    fn test_rating_on_non_model_rejected() {
        let registry = registry();
        let code = Artifact::new(ArtifactType::Code, "timm", "u");
        let rating = ModelRating::zeroed("timm");
        assert!(matches!(
            registry.save(&code, Some(&rating), LinkHints::none()),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(registry.store().is_empty());
    }

    #[test]
    fn test_update_keeps_hints_and_rating() {
        let registry = registry();
        let mut rating = ModelRating::zeroed("bert");
        rating.net_score = 0.8;

        let id = registry
            .save(&model("bert"), Some(&rating), LinkHints::none().dataset("squad").dataset_url("https://d/squad"))
            .unwrap();
        registry.save(&model("bert").with_id(&id), None, LinkHints::none()).unwrap();

        let record = registry.store().get(&id).unwrap().unwrap();
        assert_eq!(record.dataset_name.as_deref(), Some("squad"));
        assert_eq!(record.dataset_url.as_deref(), Some("https://d/squad"));
        assert_eq!(registry.get_model_rating(&id).unwrap(), Some(rating));
    }

    #[test]
    fn test_blank_hints_keep_stored_ones() {
        let registry = registry();
        let id = registry
            .save(&model("bert"), None, LinkHints::none().dataset("squad").code("transformers"))
            .unwrap();
        registry
            .save(&model("bert").with_id(&id), None, LinkHints::none().dataset("").code("   ").code_url(""))
            .unwrap();

        let record = registry.store().get(&id).unwrap().unwrap();
        assert_eq!(record.dataset_name.as_deref(), Some("squad"));
        assert_eq!(record.code_name.as_deref(), Some("transformers"));
        assert!(record.code_url.is_none());
    }

    #[test]
    fn test_new_hint_replaces_old_fallback_url() {
        let registry = registry();
        let id = registry
            .save(&model("bert"), None, LinkHints::none().dataset("squad").dataset_url("https://d/squad"))
            .unwrap();
        registry.save(&model("bert").with_id(&id), None, LinkHints::none().dataset("glue")).unwrap();

        let record = registry.store().get(&id).unwrap().unwrap();
        assert_eq!(record.dataset_name.as_deref(), Some("glue"));
        assert!(record.dataset_url.is_none());
    }

    #[test]
    fn test_delete_absent_and_wrong_type() {
        let registry = registry();
        assert!(!registry.delete("nope", ArtifactType::Dataset).unwrap());

        let id = registry.save(&model("bert"), None, LinkHints::none()).unwrap();
        assert!(registry.delete(&id, ArtifactType::Code).is_err());
        assert!(registry.delete(&id, ArtifactType::Model).unwrap());
        assert!(!registry.delete(&id, ArtifactType::Model).unwrap());
    }

    #[test]
    fn test_stats_counts() {
        let registry = registry();
        registry
            .save(&model("a"), None, LinkHints::none().dataset("squad").code("timm"))
            .unwrap();
        registry
            .save(&Artifact::new(ArtifactType::Dataset, "Squad", "u"), None, LinkHints::none())
            .unwrap();

        let stats = registry.stats().unwrap();
        assert_eq!(stats.total(), 2);
        assert_eq!(stats.models_with_dataset, 1);
        assert_eq!(stats.models_with_code, 0);
        assert_eq!(stats.pending_links, 1);
        assert!(stats.to_string().contains("Datasets: 1"));
    }

    #[test]
    fn test_serialized_writes() {
        let config = RegistryConfig { serialize_writes: true, scan_page_size: 2, ..Default::default() };
        let registry = ArtifactRegistry::with_config(MemoryRecordStore::new(), &config);
        let id = registry.save(&model("bert"), None, LinkHints::none()).unwrap();
        registry.set_model_rating(&id, &ModelRating::zeroed("bert")).unwrap();
        assert_eq!(registry.reset().unwrap(), 1);
    }
}
