//! Relation edges and graph statistics

use serde::{Deserialize, Serialize};

/// A directed, labeled edge between two entity nodes, as returned by
/// relation queries. Labels carry the entities' original casing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    /// Identifier of the document that first asserted this relation.
    /// Set once at creation, never overwritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uid: Option<String>,
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.subject, self.predicate, self.object)
    }
}

/// Node and edge counts for a graph store
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: u64,
    pub edge_count: u64,
}
