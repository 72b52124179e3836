//! Document ingestion
//!
//! The ingest pipeline: store the raw document first, then extract triples
//! via the text-generation service, then merge them into the graph. The
//! document is always recallable even when extraction or merge fails.

mod extractor;
mod index;
mod service;

pub use extractor::TripleExtractor;
pub use index::{DocumentIndex, DocumentRecord, InMemoryDocumentIndex, SearchHit};
pub use service::{IngestReceipt, IngestService};
