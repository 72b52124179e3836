//! Entity nodes of the knowledge graph

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A canonicalized real-world thing.
///
/// `canonical_label` is the node's identity and is unique per store.
/// `aliases` is the set of every raw mention ever resolved to this node,
/// including the canonical label itself; it grows, never shrinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityNode {
    pub canonical_label: String,
    pub aliases: BTreeSet<String>,
}

impl EntityNode {
    /// Create a node whose first alias is its own canonical label
    pub fn new(canonical_label: impl Into<String>) -> Self {
        let canonical_label = canonical_label.into();
        let mut aliases = BTreeSet::new();
        aliases.insert(canonical_label.clone());
        Self {
            canonical_label,
            aliases,
        }
    }

    /// Record a raw mention; returns true if the alias was new
    pub fn add_alias(&mut self, alias: impl Into<String>) -> bool {
        self.aliases.insert(alias.into())
    }

    /// Case-insensitive alias membership test
    pub fn has_alias_ignore_case(&self, label: &str) -> bool {
        self.aliases
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(label))
    }
}
