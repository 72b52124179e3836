//! LLM-backed triple extraction
//!
//! Extraction failure is never fatal to ingestion: a service outage or a
//! garbage reply degrades to zero triples, and the parser already drops
//! malformed lines silently.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::graph::{parse_triples, Triple};
use crate::llm::{triple_extraction_prompt, TextGenerator, TRIPLE_EXTRACTION_SYSTEM_PROMPT};

/// Extracts subject|predicate|object triples from unstructured text.
pub struct TripleExtractor {
    generator: Arc<dyn TextGenerator>,
    max_triples: usize,
}

impl TripleExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>, max_triples: usize) -> Self {
        Self {
            generator,
            max_triples,
        }
    }

    /// Extract triples from `text`. Never fails; outages yield an empty list.
    pub async fn extract(&self, text: &str) -> Vec<Triple> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let prompt = triple_extraction_prompt(text, self.max_triples);
        let reply = match self
            .generator
            .generate(TRIPLE_EXTRACTION_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Triple extraction unavailable, continuing without triples");
                return Vec::new();
            }
        };

        let triples = parse_triples(&reply);
        debug!(count = triples.len(), "Triples extracted");
        triples
    }
}
