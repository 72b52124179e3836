//! Embedded graph store: in-process multigraph with JSON snapshots
//!
//! Node identity is the normalized label; the original-cased label and
//! the alias set are node attributes. On every successful mutation the
//! whole graph is re-serialized and the snapshot file fully overwritten.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::graph::{
    label_variants, levenshtein, normalize_label, CandidateLookup, EntityNode, GraphStats,
    GraphStore, Relation, MAX_EDIT_DISTANCE,
};
use crate::error::{Error, Result};

/// Node attributes: display label plus every raw mention resolved here
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeRecord {
    label: String,
    #[serde(default)]
    aliases: BTreeSet<String>,
}

/// Edge attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EdgeRecord {
    predicate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_uid: Option<String>,
}

/// Snapshot file format: all nodes (identity + attributes) and all edges
/// (endpoint identities + attributes)
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    nodes: Vec<SnapshotNode>,
    edges: Vec<SnapshotEdge>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotNode {
    id: String,
    label: String,
    #[serde(default)]
    aliases: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEdge {
    source: String,
    target: String,
    predicate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_uid: Option<String>,
}

#[derive(Default)]
struct Inner {
    graph: DiGraph<NodeRecord, EdgeRecord>,
    index: HashMap<String, NodeIndex>,
}

/// In-process directed multigraph with JSON snapshot persistence
pub struct EmbeddedGraphStore {
    inner: RwLock<Inner>,
    snapshot_path: Option<PathBuf>,
}

impl EmbeddedGraphStore {
    /// Create a store with no persistence (tests, scratch graphs)
    pub fn ephemeral() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            snapshot_path: None,
        }
    }

    /// Open a store backed by a snapshot file.
    ///
    /// A missing file starts an empty graph; an unreadable or malformed
    /// snapshot is fatal.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let inner = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let snapshot: Snapshot = serde_json::from_str(&contents).map_err(|e| {
                Error::SnapshotError(format!("Malformed snapshot {}: {}", path.display(), e))
            })?;
            Self::restore(snapshot)
        } else {
            Inner::default()
        };

        debug!(path = %path.display(), "Embedded graph store opened");
        Ok(Self {
            inner: RwLock::new(inner),
            snapshot_path: Some(path),
        })
    }

    fn restore(snapshot: Snapshot) -> Inner {
        let mut inner = Inner::default();
        for node in snapshot.nodes {
            let idx = inner.graph.add_node(NodeRecord {
                label: node.label,
                aliases: node.aliases,
            });
            inner.index.insert(node.id, idx);
        }
        for edge in snapshot.edges {
            // Edges referencing unknown nodes are materialization
            // artifacts and are dropped.
            let (Some(&src), Some(&tgt)) =
                (inner.index.get(&edge.source), inner.index.get(&edge.target))
            else {
                continue;
            };
            inner.graph.add_edge(
                src,
                tgt,
                EdgeRecord {
                    predicate: edge.predicate,
                    source_uid: edge.source_uid,
                },
            );
        }
        inner
    }

    fn persist(&self, inner: &Inner) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let mut snapshot = Snapshot::default();
        let mut ids: HashMap<NodeIndex, &String> = HashMap::new();
        for (id, idx) in &inner.index {
            ids.insert(*idx, id);
            let record = &inner.graph[*idx];
            snapshot.nodes.push(SnapshotNode {
                id: id.clone(),
                label: record.label.clone(),
                aliases: record.aliases.clone(),
            });
        }
        for edge_idx in inner.graph.edge_indices() {
            let (Some((src, tgt)), Some(record)) = (
                inner.graph.edge_endpoints(edge_idx),
                inner.graph.edge_weight(edge_idx),
            ) else {
                continue;
            };
            let (Some(source), Some(target)) = (ids.get(&src), ids.get(&tgt)) else {
                continue;
            };
            snapshot.edges.push(SnapshotEdge {
                source: (*source).clone(),
                target: (*target).clone(),
                predicate: record.predicate.clone(),
                source_uid: record.source_uid.clone(),
            });
        }

        let contents = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| Error::SnapshotError(format!("Failed to serialize snapshot: {}", e)))?;
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Locate a node by label variants, then by case-insensitive alias
    fn locate(inner: &Inner, label: &str) -> Option<NodeIndex> {
        for variant in label_variants(label) {
            if let Some(idx) = inner.index.get(&normalize_label(&variant)) {
                return Some(*idx);
            }
        }
        inner.graph.node_indices().find(|idx| {
            inner.graph[*idx]
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(label))
        })
    }
}

#[async_trait]
impl GraphStore for EmbeddedGraphStore {
    async fn get_node(&self, canonical_label: &str) -> Result<Option<EntityNode>> {
        let inner = self.read();
        Ok(inner
            .index
            .get(&normalize_label(canonical_label))
            .map(|idx| {
                let record = &inner.graph[*idx];
                EntityNode {
                    canonical_label: record.label.clone(),
                    aliases: record.aliases.clone(),
                }
            }))
    }

    async fn find_candidates(&self, label: &str, limit: usize) -> Result<CandidateLookup> {
        let inner = self.read();

        // Exact-alias short circuit, case-sensitive as stored
        for idx in inner.graph.node_indices() {
            let record = &inner.graph[idx];
            if record.aliases.contains(label) {
                return Ok(CandidateLookup::Match(record.label.clone()));
            }
        }

        // Edit distance over normalized labels, nearest first
        let needle = normalize_label(label);
        let mut scored: Vec<(usize, String)> = inner
            .graph
            .node_indices()
            .filter_map(|idx| {
                let record = &inner.graph[idx];
                let distance = levenshtein(&needle, &normalize_label(&record.label));
                (distance < MAX_EDIT_DISTANCE).then(|| (distance, record.label.clone()))
            })
            .collect();
        scored.sort();

        Ok(CandidateLookup::Candidates(
            scored.into_iter().take(limit).map(|(_, label)| label).collect(),
        ))
    }

    async fn merge_node(&self, canonical_label: &str, raw_alias: &str) -> Result<()> {
        let mut inner = self.write();
        let key = normalize_label(canonical_label);

        let idx = match inner.index.get(&key) {
            Some(idx) => *idx,
            None => {
                let idx = inner.graph.add_node(NodeRecord {
                    label: canonical_label.to_string(),
                    aliases: BTreeSet::from([canonical_label.to_string()]),
                });
                inner.index.insert(key, idx);
                idx
            }
        };

        inner.graph[idx].aliases.insert(raw_alias.to_string());
        self.persist(&inner)
    }

    async fn merge_edge(
        &self,
        subject: &str,
        predicate: &str,
        object: &str,
        source_uid: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.write();

        let node_for = |inner: &mut Inner, label: &str| {
            let key = normalize_label(label);
            match inner.index.get(&key) {
                Some(idx) => *idx,
                None => {
                    let idx = inner.graph.add_node(NodeRecord {
                        label: label.to_string(),
                        aliases: BTreeSet::from([label.to_string()]),
                    });
                    inner.index.insert(key, idx);
                    idx
                }
            }
        };

        let src = node_for(&mut inner, subject);
        let tgt = node_for(&mut inner, object);

        let duplicate = inner
            .graph
            .edges_connecting(src, tgt)
            .any(|edge| edge.weight().predicate == predicate);
        if duplicate {
            // First writer wins: existing source_uid untouched
            return Ok(());
        }

        inner.graph.add_edge(
            src,
            tgt,
            EdgeRecord {
                predicate: predicate.to_string(),
                source_uid: source_uid.map(str::to_string),
            },
        );
        self.persist(&inner)
    }

    async fn relations_of(&self, label: &str) -> Result<Vec<Relation>> {
        let inner = self.read();
        let Some(idx) = Self::locate(&inner, label) else {
            return Ok(Vec::new());
        };

        let mut relations = Vec::new();

        for edge in inner.graph.edges_directed(idx, Direction::Outgoing) {
            relations.push(Relation {
                subject: inner.graph[idx].label.clone(),
                predicate: edge.weight().predicate.clone(),
                object: inner.graph[edge.target()].label.clone(),
                source_uid: edge.weight().source_uid.clone(),
            });
        }
        for edge in inner.graph.edges_directed(idx, Direction::Incoming) {
            // Self-loops already reported as outgoing
            if edge.source() == idx {
                continue;
            }
            relations.push(Relation {
                subject: inner.graph[edge.source()].label.clone(),
                predicate: edge.weight().predicate.clone(),
                object: inner.graph[idx].label.clone(),
                source_uid: edge.weight().source_uid.clone(),
            });
        }

        relations.retain(|rel| {
            !rel.predicate.trim().is_empty()
                && !rel.subject.trim().is_empty()
                && !rel.object.trim().is_empty()
        });
        Ok(relations)
    }

    async fn stats(&self) -> Result<GraphStats> {
        let inner = self.read();
        Ok(GraphStats {
            node_count: inner.graph.node_count() as u64,
            edge_count: inner.graph.edge_count() as u64,
        })
    }
}
