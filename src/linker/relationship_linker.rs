use crate::{Error, Result};
use crate::artifact::{normalize_name, ArtifactId, ArtifactType};
use crate::query::scan::{RecordFilter, ScanEngine};
use crate::storage::{ArtifactRecord, RecordStore};
use std::fmt;

/// The two link slots a model record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Dataset,
    Code,
}

impl LinkKind {
    pub fn all() -> &'static [LinkKind] {
        &[LinkKind::Dataset, LinkKind::Code]
    }

    /// Artifact type a link of this kind points at
    pub fn target_type(self) -> ArtifactType {
        match self {
            LinkKind::Dataset => ArtifactType::Dataset,
            LinkKind::Code => ArtifactType::Code,
        }
    }

    /// Link kind whose targets have this type (models are never targets)
    pub fn for_target(artifact_type: ArtifactType) -> Option<LinkKind> {
        match artifact_type {
            ArtifactType::Dataset => Some(LinkKind::Dataset),
            ArtifactType::Code => Some(LinkKind::Code),
            ArtifactType::Model => None,
        }
    }

    /// Normalized name hint stored on a model, if any
    pub fn hint(self, model: &ArtifactRecord) -> Option<String> {
        let raw = match self {
            LinkKind::Dataset => model.dataset_name.as_deref(),
            LinkKind::Code => model.code_name.as_deref(),
        };
        raw.map(normalize_name).filter(|h| !h.is_empty())
    }

    /// Link currently stored on a model
    pub fn current(self, model: &ArtifactRecord) -> Option<LinkTarget> {
        let (id, url) = match self {
            LinkKind::Dataset => (&model.dataset_id, &model.dataset_url),
            LinkKind::Code => (&model.code_id, &model.code_url),
        };
        id.as_ref().map(|id| LinkTarget {
            id: id.clone(),
            url: url.clone().unwrap_or_default(),
        })
    }

    /// Write `target` into the model's slot. Unlinking clears the id; the
    /// url is cleared too when it belonged to the old link, otherwise it is
    /// the caller's fallback url and stays. Returns whether anything changed.
    pub fn apply(self, model: &mut ArtifactRecord, target: Option<&LinkTarget>) -> bool {
        let (id, url) = match self {
            LinkKind::Dataset => (&mut model.dataset_id, &mut model.dataset_url),
            LinkKind::Code => (&mut model.code_id, &mut model.code_url),
        };
        match target {
            Some(t) => {
                let changed = id.as_deref() != Some(t.id.as_str()) || url.as_deref() != Some(t.url.as_str());
                *id = Some(t.id.clone());
                *url = Some(t.url.clone());
                changed
            }
            None if id.is_some() => {
                *id = None;
                *url = None;
                true
            }
            None => false,
        }
    }

    fn hinting(self, normalized: &str) -> RecordFilter {
        match self {
            LinkKind::Dataset => RecordFilter::ModelsHintingDataset(normalized.to_string()),
            LinkKind::Code => RecordFilter::ModelsHintingCode(normalized.to_string()),
        }
    }

    fn linked_to(self, id: &str) -> RecordFilter {
        match self {
            LinkKind::Dataset => RecordFilter::ModelsLinkedToDataset(id.to_string()),
            LinkKind::Code => RecordFilter::ModelsLinkedToCode(id.to_string()),
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target_type())
    }
}

/// Resolved endpoint of a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub id: ArtifactId,
    pub url: String,
}

impl LinkTarget {
    fn of(record: &ArtifactRecord) -> Self {
        Self { id: record.id.clone(), url: record.url.clone() }
    }
}

/// Derived link attributes of one model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkState {
    pub dataset: Option<LinkTarget>,
    pub code: Option<LinkTarget>,
}

impl LinkState {
    pub fn get(&self, kind: LinkKind) -> Option<&LinkTarget> {
        match kind {
            LinkKind::Dataset => self.dataset.as_ref(),
            LinkKind::Code => self.code.as_ref(),
        }
    }

    fn set(&mut self, kind: LinkKind, target: Option<LinkTarget>) {
        match kind {
            LinkKind::Dataset => self.dataset = target,
            LinkKind::Code => self.code = target,
        }
    }
}

/// Pick the record of `target_type` named `normalized`. Duplicate names
/// resolve to the lowest id so the choice does not depend on scan order.
pub fn pick_target<'r>(
    records: impl IntoIterator<Item = &'r ArtifactRecord>,
    target_type: ArtifactType,
    normalized: &str,
) -> Option<&'r ArtifactRecord> {
    records
        .into_iter()
        .filter(|r| r.artifact_type == target_type && r.name_normalized == normalized)
        .min_by(|a, b| a.id.cmp(&b.id))
}

/// Compute a model's links from its name hints against a set of records.
///
/// Pure; every save and delete path derives links through this function.
pub fn resolve_link(model: &ArtifactRecord, records: &[ArtifactRecord]) -> LinkState {
    let mut state = LinkState::default();
    for &kind in LinkKind::all() {
        let target = kind
            .hint(model)
            .and_then(|hint| pick_target(records, kind.target_type(), &hint))
            .map(LinkTarget::of);
        state.set(kind, target);
    }
    state
}

/// Outcome of one linking pass
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LinkerStats {
    /// Model records examined
    pub examined: usize,
    /// Models whose link was set or moved
    pub relinked: usize,
    /// Models whose link was removed
    pub cleared: usize,
    /// Models whose update failed to persist
    pub failed: usize,
}

impl fmt::Display for LinkerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Linker Stats:")?;
        writeln!(f, "  Examined: {}", self.examined)?;
        writeln!(f, "  Relinked: {}", self.relinked)?;
        writeln!(f, "  Cleared: {}", self.cleared)?;
        writeln!(f, "  Failed: {}", self.failed)
    }
}

/// Keeps model links coherent as models, datasets, and code are written.
///
/// None of these passes are transactional: each is a scan, a decision, and
/// independent single-item writes.
pub struct RelationshipLinker<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    scan: ScanEngine<'a, S>,
}

impl<'a, S: RecordStore + ?Sized> RelationshipLinker<'a, S> {
    pub fn new(store: &'a S, page_size: usize) -> Self {
        Self { store, scan: ScanEngine::with_page_size(store, page_size) }
    }

    /// Resolve a model's hints against a fresh scan and write the result
    /// into `model` (not persisted). Unresolved hints leave the slot
    /// unlinked; they may resolve when the target is saved later.
    pub fn link_model(&self, model: &mut ArtifactRecord) -> Result<LinkState> {
        let dataset_hint = LinkKind::Dataset.hint(model);
        let code_hint = LinkKind::Code.hint(model);

        let candidates = if dataset_hint.is_none() && code_hint.is_none() {
            Vec::new()
        } else {
            self.scan.scan_all(|r| {
                (r.artifact_type == ArtifactType::Dataset && dataset_hint.as_deref() == Some(r.name_normalized.as_str()))
                    || (r.artifact_type == ArtifactType::Code && code_hint.as_deref() == Some(r.name_normalized.as_str()))
            })?
        };

        let state = resolve_link(model, &candidates);
        for &kind in LinkKind::all() {
            kind.apply(model, state.get(kind));
        }

        tracing::debug!(
            "Model {} links: dataset={:?} code={:?}",
            model.id,
            state.dataset.as_ref().map(|t| &t.id),
            state.code.as_ref().map(|t| &t.id)
        );
        Ok(state)
    }

    /// After a dataset/code record was persisted, recompute the link of
    /// every model that hints at its name or is currently linked to it.
    pub fn propagate_target(&self, target: &ArtifactRecord) -> Result<LinkerStats> {
        let Some(kind) = LinkKind::for_target(target.artifact_type) else {
            return Ok(LinkerStats::default());
        };

        // Every record of the target type stays a candidate: a model
        // unlinked by a rename may still match another same-named record.
        let hinting = kind.hinting(&target.name_normalized);
        let linked = kind.linked_to(&target.id);
        let snapshot = self
            .scan
            .scan_all(|r| r.artifact_type == target.artifact_type || hinting.matches(r) || linked.matches(r))?;

        let models: Vec<&ArtifactRecord> = snapshot.iter().filter(|r| r.is_model()).collect();
        let targets: Vec<ArtifactRecord> = snapshot.iter().filter(|r| !r.is_model()).cloned().collect();

        self.rewrite(models, kind, |model| resolve_link(model, &targets).get(kind).cloned())
    }

    /// Before a dataset/code record is deleted, clear the link of every
    /// model pointing at it. Name hints are left in place for relinking.
    pub fn scrub_target(&self, target_id: &str, target_type: ArtifactType) -> Result<LinkerStats> {
        let Some(kind) = LinkKind::for_target(target_type) else {
            return Ok(LinkerStats::default());
        };

        let models = self.scan.scan_filter(&kind.linked_to(target_id))?;
        self.rewrite(models.iter().collect(), kind, |_| None)
    }

    /// Apply `decide` to each model and persist the ones that changed.
    ///
    /// Every model is attempted; the first persistence failure is returned
    /// after the pass completes.
    fn rewrite(
        &self,
        models: Vec<&ArtifactRecord>,
        kind: LinkKind,
        decide: impl Fn(&ArtifactRecord) -> Option<LinkTarget>,
    ) -> Result<LinkerStats> {
        let mut stats = LinkerStats { examined: models.len(), ..Default::default() };
        let mut first_error: Option<Error> = None;

        for model in models {
            let target = decide(model);
            let mut updated = model.clone();
            if !kind.apply(&mut updated, target.as_ref()) {
                continue;
            }

            match self.store.put(&updated) {
                Ok(()) => {
                    if target.is_some() {
                        stats.relinked += 1;
                    } else {
                        stats.cleared += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to update {} link of model {}: {}", kind, model.id, e);
                    stats.failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        tracing::debug!(
            "{} link pass: {} relinked, {} cleared, {} failed",
            kind,
            stats.relinked,
            stats.cleared,
            stats.failed
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }
}
