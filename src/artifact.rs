//! Artifact types - the three supply-chain artifact kinds
//!
//! Every stored artifact is one of:
//! - `Model`: a trained model, the only kind that carries links and a rating
//! - `Dataset`: training/evaluation data a model may reference by name
//! - `Code`: a source repository a model may reference by name
//!
//! All three kinds share a single id namespace in the record store.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Opaque artifact identifier, unique across all artifact kinds.
pub type ArtifactId = String;

/// Artifact kinds stored in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// Trained model; links to at most one dataset and one code artifact
    Model,
    /// Dataset a model was trained or evaluated on
    Dataset,
    /// Code repository backing a model
    Code,
}

impl ArtifactType {
    /// Get the string representation stored in the `artifact_type` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Model => "model",
            ArtifactType::Dataset => "dataset",
            ArtifactType::Code => "code",
        }
    }

    /// Get all artifact types
    pub fn all() -> &'static [ArtifactType] {
        &[ArtifactType::Model, ArtifactType::Dataset, ArtifactType::Code]
    }
}

impl FromStr for ArtifactType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "model" | "models" => Ok(ArtifactType::Model),
            "dataset" | "datasets" | "data" => Ok(ArtifactType::Dataset),
            "code" | "repo" | "repository" => Ok(ArtifactType::Code),
            _ => Err(Error::Config(format!("Unknown artifact type: {}", s))),
        }
    }
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized matching key: lowercase, surrounding whitespace trimmed.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Descriptive half of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Display name; its normalized form is the linking key
    pub name: String,
    /// Store-assigned id (empty until first save)
    #[serde(default)]
    pub id: ArtifactId,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Where the artifact lives plus any kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactData {
    /// Source URL
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Kind-specific nested data (model card fields, dataset schema, ...)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

/// A stored model, dataset, or code package description.
///
/// Artifacts are replaced wholesale on save; there is no field-level merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub metadata: ArtifactMetadata,
    pub data: ArtifactData,
}

impl Artifact {
    /// Create an artifact without an id; the registry assigns one on first save
    pub fn new(artifact_type: ArtifactType, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            metadata: ArtifactMetadata {
                name: name.into(),
                id: String::new(),
                artifact_type,
                version: None,
            },
            data: ArtifactData {
                url: url.into(),
                download_url: None,
                payload: serde_json::Value::Null,
            },
        }
    }

    pub fn with_id(mut self, id: impl Into<ArtifactId>) -> Self {
        self.metadata.id = id.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.metadata.version = Some(version.into());
        self
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.data.download_url = Some(url.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.data.payload = payload;
        self
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn artifact_type(&self) -> ArtifactType {
        self.metadata.artifact_type
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.metadata.name)
    }
}

/// A dataset found by name lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    pub artifact: Artifact,
}

/// A code package found by name lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeRecord {
    pub artifact: Artifact,
}

/// One name query: exact normalized-name match, or `*` for everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactQuery {
    pub name: String,
    /// Empty means all artifact types
    #[serde(default)]
    pub types: Vec<ArtifactType>,
}

impl ArtifactQuery {
    pub const WILDCARD: &'static str = "*";

    pub fn new(name: impl Into<String>, types: Vec<ArtifactType>) -> Self {
        Self { name: name.into(), types }
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == Self::WILDCARD
    }

    /// Types this query covers, expanding the empty list to all types
    pub fn effective_types(&self) -> Vec<ArtifactType> {
        if self.types.is_empty() {
            ArtifactType::all().to_vec()
        } else {
            self.types.clone()
        }
    }
}

/// Caller-supplied relationship hints for a model save.
///
/// Names are matched after normalization; URLs are kept on the model record
/// as a fallback until the link resolves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkHints {
    pub dataset_name: Option<String>,
    pub dataset_url: Option<String>,
    pub code_name: Option<String>,
    pub code_url: Option<String>,
}

impl LinkHints {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn dataset(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = Some(name.into());
        self
    }

    pub fn dataset_url(mut self, url: impl Into<String>) -> Self {
        self.dataset_url = Some(url.into());
        self
    }

    pub fn code(mut self, name: impl Into<String>) -> Self {
        self.code_name = Some(name.into());
        self
    }

    pub fn code_url(mut self, url: impl Into<String>) -> Self {
        self.code_url = Some(url.into());
        self
    }
}
