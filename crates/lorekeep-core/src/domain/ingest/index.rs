//! Document index: raw-text recall alongside the graph
//!
//! Documents are stored before extraction, so the original text survives
//! any downstream failure. The trait is the seam for a real similarity
//! store; [`InMemoryDocumentIndex`] is the deterministic reference
//! implementation used by the CLI and tests.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A stored document with its ingestion metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Uid minted at ingestion, `{doc_type}-{uuid}`
    pub uid: String,
    pub doc_type: String,
    pub content: String,
    pub ingested_at: DateTime<Utc>,
}

/// A scored search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub uid: String,
    pub content: String,
    pub score: f32,
}

/// Similarity-recall store for ingested documents.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Store a document; uids are unique by construction
    async fn store(&self, record: DocumentRecord) -> Result<()>;

    /// The `k` best-matching documents for `query`, best first.
    /// Non-matching documents are omitted.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;
}

/// In-memory document index with token-overlap scoring.
///
/// Score is the fraction of distinct query tokens present in the document,
/// case-insensitive. Deterministic: ties break on uid.
#[derive(Default)]
pub struct InMemoryDocumentIndex {
    records: RwLock<Vec<DocumentRecord>>,
}

impl InMemoryDocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl DocumentIndex for InMemoryDocumentIndex {
    async fn store(&self, record: DocumentRecord) -> Result<()> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.push(record);
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut hits: Vec<SearchHit> = records
            .iter()
            .filter_map(|record| {
                let doc_tokens = tokenize(&record.content);
                let overlap = query_tokens.intersection(&doc_tokens).count();
                if overlap == 0 {
                    return None;
                }
                Some(SearchHit {
                    uid: record.uid.clone(),
                    content: record.content.clone(),
                    score: overlap as f32 / query_tokens.len() as f32,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.uid.cmp(&b.uid))
        });
        hits.truncate(k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(uid: &str, content: &str) -> DocumentRecord {
        DocumentRecord {
            uid: uid.to_string(),
            doc_type: "document".to_string(),
            content: content.to_string(),
            ingested_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_search_ranks_by_overlap() {
        let index = InMemoryDocumentIndex::new();
        index.store(record("a", "Jane works on Project Alpha")).await.unwrap();
        index.store(record("b", "The weather was nice")).await.unwrap();
        index.store(record("c", "Project Alpha has a deadline")).await.unwrap();

        let hits = index.search("project alpha deadline", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].uid, "c");
        assert_eq!(hits[1].uid, "a");
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let index = InMemoryDocumentIndex::new();
        index.store(record("a", "JANE SMITH")).await.unwrap();

        let hits = index.search("jane", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].uid, "a");
    }

    #[tokio::test]
    async fn test_search_respects_k() {
        let index = InMemoryDocumentIndex::new();
        for uid in ["a", "b", "c"] {
            index.store(record(uid, "shared token")).await.unwrap();
        }

        let hits = index.search("token", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        // Equal scores tie-break on uid
        assert_eq!(hits[0].uid, "a");
        assert_eq!(hits[1].uid, "b");
    }

    #[tokio::test]
    async fn test_empty_query_yields_nothing() {
        let index = InMemoryDocumentIndex::new();
        index.store(record("a", "content")).await.unwrap();
        assert!(index.search("  !? ", 10).await.unwrap().is_empty());
    }
}
