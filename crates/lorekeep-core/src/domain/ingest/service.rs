//! Ingestion service: store → extract → merge
//!
//! Merges run single-writer: one async mutex is held across the whole
//! resolve-and-merge step, so concurrent ingests cannot interleave
//! resolution reads with another batch's writes.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::domain::graph::{GraphStats, GraphStore, MergeEngine, Relation};
use crate::error::Result;

use super::extractor::TripleExtractor;
use super::index::{DocumentIndex, DocumentRecord, SearchHit};

const DEFAULT_DOC_TYPE: &str = "document";

/// What an ingest call produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReceipt {
    /// Uid of the stored document, `{doc_type}-{uuid}`
    pub doc_uid: String,
    /// Triples the extraction service produced
    pub extracted: usize,
    /// Triples merged into the graph
    pub applied: usize,
    /// Triples whose merge failed (logged, not fatal)
    pub failed: usize,
}

/// Front door of the engine: ingestion plus the read operations the CLI
/// exposes.
pub struct IngestService {
    store: Arc<dyn GraphStore>,
    extractor: TripleExtractor,
    merge: MergeEngine,
    index: Arc<dyn DocumentIndex>,
    write_lock: Mutex<()>,
}

impl IngestService {
    pub fn new(
        store: Arc<dyn GraphStore>,
        extractor: TripleExtractor,
        merge: MergeEngine,
        index: Arc<dyn DocumentIndex>,
    ) -> Self {
        Self {
            store,
            extractor,
            merge,
            index,
            write_lock: Mutex::new(()),
        }
    }

    /// Ingest a document: store its text, extract triples, merge them.
    ///
    /// The document is stored before extraction, so its uid comes back even
    /// when the extraction service is down or every merge fails. Only a
    /// document-store failure is an error.
    pub async fn ingest_text(&self, content: &str, doc_type: Option<&str>) -> Result<IngestReceipt> {
        let doc_type = doc_type.unwrap_or(DEFAULT_DOC_TYPE);
        let doc_uid = format!("{}-{}", doc_type, Uuid::new_v4());

        self.index
            .store(DocumentRecord {
                uid: doc_uid.clone(),
                doc_type: doc_type.to_string(),
                content: content.to_string(),
                ingested_at: Utc::now(),
            })
            .await?;

        let triples = self.extractor.extract(content).await;

        let report = {
            let _guard = self.write_lock.lock().await;
            self.merge.merge(&triples, Some(&doc_uid)).await
        };

        info!(
            doc_uid = %doc_uid,
            extracted = triples.len(),
            applied = report.applied,
            "Document ingested"
        );

        Ok(IngestReceipt {
            doc_uid,
            extracted: triples.len(),
            applied: report.applied,
            failed: report.failed,
        })
    }

    /// Relations where the labelled entity is either endpoint
    pub async fn relations(&self, label: &str) -> Result<Vec<Relation>> {
        self.store.relations_of(label).await
    }

    /// Similarity recall over stored documents
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        self.index.search(query, k).await
    }

    /// Graph node and edge counts
    pub async fn stats(&self) -> Result<GraphStats> {
        self.store.stats().await
    }
}
