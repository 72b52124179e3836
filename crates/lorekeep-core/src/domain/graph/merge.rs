//! Idempotent graph merge
//!
//! Takes one document's extracted triples and applies them to the store
//! as create-or-attach writes. Each triple's merge step is independently
//! idempotent, so a batch interrupted mid-way can be retried without
//! creating duplicate nodes or edges.

use std::sync::Arc;

use tracing::{info, warn};

use super::resolver::{EntityResolver, ResolutionCache};
use super::store::GraphStore;
use super::triple::Triple;

/// Merges resolved triples into a graph store.
pub struct MergeEngine {
    store: Arc<dyn GraphStore>,
    resolver: EntityResolver,
}

/// What a merge batch actually did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Triples whose nodes and edge were merged
    pub applied: usize,
    /// Triples skipped because a store write failed
    pub failed: usize,
}

impl MergeReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

impl MergeEngine {
    pub fn new(store: Arc<dyn GraphStore>, resolver: EntityResolver) -> Self {
        Self { store, resolver }
    }

    /// Merge one document's triples into the graph.
    ///
    /// Every distinct raw label is resolved exactly once per batch via a
    /// fresh resolution cache. Store failures on individual triples are
    /// logged and counted, never propagated; partial application is valid
    /// state.
    pub async fn merge(&self, triples: &[Triple], source_uid: Option<&str>) -> MergeReport {
        let mut cache = ResolutionCache::new();
        let mut report = MergeReport::default();

        for triple in triples {
            let subject = self.resolver.resolve(&triple.subject, &mut cache).await;
            let object = self.resolver.resolve(&triple.object, &mut cache).await;

            if subject.is_empty() || object.is_empty() {
                continue;
            }

            match self
                .merge_one(&subject, &triple.subject, &triple.predicate, &object, &triple.object, source_uid)
                .await
            {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    warn!(triple = %triple, error = %e, "Triple merge failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            applied = report.applied,
            failed = report.failed,
            source_uid = source_uid.unwrap_or("-"),
            "Merge batch finished"
        );
        report
    }

    async fn merge_one(
        &self,
        subject: &str,
        raw_subject: &str,
        predicate: &str,
        object: &str,
        raw_object: &str,
        source_uid: Option<&str>,
    ) -> crate::error::Result<()> {
        self.store.merge_node(subject, raw_subject).await?;
        self.store.merge_node(object, raw_object).await?;
        self.store
            .merge_edge(subject, predicate, object, source_uid)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::graph::EmbeddedGraphStore;

    fn engine(store: Arc<EmbeddedGraphStore>) -> MergeEngine {
        let resolver = EntityResolver::new(store.clone());
        MergeEngine::new(store, resolver)
    }

    #[tokio::test]
    async fn test_merge_creates_nodes_and_edges() {
        let store = Arc::new(EmbeddedGraphStore::ephemeral());
        let engine = engine(store.clone());

        let triples = vec![Triple::new("Alice", "OWNS", "Car")];
        let report = engine.merge(&triples, Some("doc-1")).await;

        assert_eq!(report.applied, 1);
        assert!(report.is_complete());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.edge_count, 1);
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let store = Arc::new(EmbeddedGraphStore::ephemeral());
        let engine = engine(store.clone());

        let triples = vec![
            Triple::new("Alice", "OWNS", "Car"),
            Triple::new("Bob", "KNOWS", "Alice"),
        ];

        engine.merge(&triples, Some("doc-1")).await;
        let stats_once = store.stats().await.unwrap();

        engine.merge(&triples, Some("doc-1")).await;
        let stats_twice = store.stats().await.unwrap();

        assert_eq!(stats_once.node_count, stats_twice.node_count);
        assert_eq!(stats_once.edge_count, stats_twice.edge_count);
    }

    #[tokio::test]
    async fn test_distinct_predicates_distinct_edges() {
        let store = Arc::new(EmbeddedGraphStore::ephemeral());
        let engine = engine(store.clone());

        let triples = vec![
            Triple::new("A", "KNOWS", "B"),
            Triple::new("A", "KNOWS", "B"),
            Triple::new("A", "LIKES", "B"),
        ];
        engine.merge(&triples, None).await;

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.edge_count, 2);
    }

    #[tokio::test]
    async fn test_empty_labels_skipped() {
        let store = Arc::new(EmbeddedGraphStore::ephemeral());
        let engine = engine(store.clone());

        // The parser would drop these, but the engine guards anyway
        let triples = vec![Triple::new("", "OWNS", "Car")];
        let report = engine.merge(&triples, None).await;

        assert_eq!(report.applied, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(store.stats().await.unwrap().node_count, 0);
    }
}
