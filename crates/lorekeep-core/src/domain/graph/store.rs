//! Storage contract for the knowledge graph
//!
//! Two backends implement this trait: the embedded snapshot store and the
//! transactional SQLite store (`infrastructure::graph`). Both must provide
//! the same merge semantics: create-or-attach nodes with alias set-union,
//! deduplicated predicate edges, first-writer-wins `source_uid`.

use async_trait::async_trait;

use crate::error::Result;

use super::entity::EntityNode;
use super::relation::{GraphStats, Relation};

/// Candidates returned per lookup, at most
pub const MAX_CANDIDATES: usize = 5;

/// Candidates must be strictly closer than this edit distance
pub const MAX_EDIT_DISTANCE: usize = 4;

/// Outcome of a candidate lookup for a new mention
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateLookup {
    /// The mention exactly equals a stored alias; resolution is done
    Match(String),
    /// Plausible canonical labels, ranked, possibly empty
    Candidates(Vec<String>),
}

/// Polymorphic graph store interface.
///
/// All mutation goes through `merge_node`/`merge_edge`; each call is
/// independently idempotent and safe to retry, so a batch interrupted
/// mid-way leaves valid (partially merged) state.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Look up a node by canonical label
    async fn get_node(&self, canonical_label: &str) -> Result<Option<EntityNode>>;

    /// Find candidate canonical labels for a new mention.
    ///
    /// Exact-alias matches (case-sensitive as stored) short-circuit to
    /// [`CandidateLookup::Match`]. Otherwise, stores with an edit-distance
    /// primitive return labels within [`MAX_EDIT_DISTANCE`]; stores
    /// without degrade to case-insensitive substring containment. Capped
    /// at `limit`.
    async fn find_candidates(&self, label: &str, limit: usize) -> Result<CandidateLookup>;

    /// Create the node if absent; attach `raw_alias` to its alias set
    /// if not already present.
    async fn merge_node(&self, canonical_label: &str, raw_alias: &str) -> Result<()>;

    /// Create the edge `(subject) -[predicate]-> (object)` unless an edge
    /// with that exact predicate already exists between the endpoints.
    /// An existing edge keeps its original `source_uid`.
    async fn merge_edge(
        &self,
        subject: &str,
        predicate: &str,
        object: &str,
        source_uid: Option<&str>,
    ) -> Result<()>;

    /// Every relation where the matched node is either endpoint.
    ///
    /// The label matches under: the exact label, spaces substituted for
    /// underscores or vice versa, or any stored alias compared
    /// case-insensitively. Unknown labels yield an empty list.
    async fn relations_of(&self, label: &str) -> Result<Vec<Relation>>;

    /// Node and edge counts
    async fn stats(&self) -> Result<GraphStats>;
}
