//! # Artifact Registry - supply-chain artifact store
//!
//! Persists models, datasets, and code packages in one flat key-value
//! record store and keeps lazy, name-based links from models to the
//! datasets and code they depend on.
//!
//! Artifact Registry provides:
//! - A record store abstraction with SQLite and in-memory backends
//! - A serialization boundary between artifacts and flat records
//! - A scan & filter engine standing in for secondary indexes
//! - A relationship linker that attaches and scrubs model links on every write
//! - The `ArtifactRegistry` facade composing all of the above

pub mod artifact;
pub mod rating;
pub mod codec;
pub mod storage;
pub mod query;
pub mod linker;
pub mod registry;
pub mod config;

// Re-exports for convenient access
pub use artifact::{
    normalize_name, Artifact, ArtifactData, ArtifactId, ArtifactMetadata, ArtifactQuery,
    ArtifactType, CodeRecord, DatasetRecord, LinkHints,
};
pub use rating::{ModelRating, SizeScore};
pub use storage::{ArtifactRecord, MemoryRecordStore, RecordStore, ScanPage, SqliteRecordStore};
pub use linker::{LinkState, LinkTarget};
pub use registry::{generate_id, ArtifactRegistry, RegistryStats};
pub use config::RegistryConfig;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for registry operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backing table is absent. Configuration problem, never retried.
    #[error("{operation}: backing table '{table}' does not exist")]
    ResourceMissing { operation: &'static str, table: String },

    /// Network/contention failure; the caller may retry.
    #[error("{operation} failed transiently{suffix}: {message}", suffix = fmt_id(.id))]
    Transient {
        operation: &'static str,
        id: Option<String>,
        message: String,
    },

    #[error("Artifact not found: {id}")]
    NotFound { id: String },

    #[error("Artifact {id} is a {found}, not a {expected}")]
    TypeMismatch {
        id: String,
        expected: artifact::ArtifactType,
        found: artifact::ArtifactType,
    },

    /// Stored payload failed to decode. Never repaired automatically.
    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    /// Backend failure that is neither transient nor a missing table
    #[error("{operation} failed{suffix}: {source}", suffix = fmt_id(.id))]
    Storage {
        operation: &'static str,
        id: Option<String>,
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn fmt_id(id: &Option<String>) -> String {
    id.as_ref().map(|id| format!(" for {}", id)).unwrap_or_default()
}

impl Error {
    /// Whether the failed operation may succeed if the caller retries it
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub(crate) fn corrupt(id: &str, reason: impl std::fmt::Display) -> Self {
        Error::CorruptRecord {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}
