//! Relationship linking between models and the datasets/code they use
//!
//! Links are derived attributes on model records, resolved by exact match
//! of normalized names. There is no link table and no index.

pub mod relationship_linker;

pub use relationship_linker::{
    pick_target, resolve_link, LinkKind, LinkState, LinkTarget, LinkerStats, RelationshipLinker,
};
