//! Entity resolution
//!
//! Decides which canonical entity a raw mention denotes:
//! alias short-circuit → candidate lookup → delegated disambiguation.
//! Resolution never fails; every downstream outage degrades to treating
//! the mention as its own entity, so ingestion is never blocked.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{disambiguation_prompt, TextGenerator, DISAMBIGUATION_SYSTEM_PROMPT};

use super::store::{CandidateLookup, GraphStore, MAX_CANDIDATES};

/// Per-batch mapping from raw label to resolved canonical label.
///
/// Owned by one merge call and discarded at its end; repeated mentions
/// within a document resolve identically and cost one disambiguation call.
pub type ResolutionCache = HashMap<String, String>;

/// Outcome of a disambiguation attempt, kept explicit so callers and
/// tests can assert on degradation paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The mention denotes this known canonical label
    Resolved(String),
    /// The service answered, but the mention is a new entity
    Unresolved,
    /// The service was unreachable or not configured
    Unavailable,
}

/// Resolves raw mentions to canonical labels against a graph store.
pub struct EntityResolver {
    store: Arc<dyn GraphStore>,
    disambiguator: Option<Arc<dyn TextGenerator>>,
    candidate_limit: usize,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            disambiguator: None,
            candidate_limit: MAX_CANDIDATES,
        }
    }

    /// Configure the disambiguation service. Without one, every unmatched
    /// mention becomes its own entity.
    pub fn with_disambiguator(mut self, disambiguator: Arc<dyn TextGenerator>) -> Self {
        self.disambiguator = Some(disambiguator);
        self
    }

    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit;
        self
    }

    /// Resolve a raw mention to its canonical label. Never fails.
    pub async fn resolve(&self, label: &str, cache: &mut ResolutionCache) -> String {
        if label.trim().is_empty() {
            return String::new();
        }

        if let Some(cached) = cache.get(label) {
            return cached.clone();
        }

        let resolved = self.resolve_uncached(label).await;
        cache.insert(label.to_string(), resolved.clone());
        resolved
    }

    async fn resolve_uncached(&self, label: &str) -> String {
        // Lookup failures degrade to "no candidates", not errors.
        let lookup = match self.store.find_candidates(label, self.candidate_limit).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(label = %label, error = %e, "Candidate lookup failed, treating as no match");
                CandidateLookup::Candidates(Vec::new())
            }
        };

        match lookup {
            CandidateLookup::Match(canonical) => {
                debug!(label = %label, canonical = %canonical, "Alias short-circuit");
                canonical
            }
            CandidateLookup::Candidates(candidates) if candidates.is_empty() => {
                // First sighting: the label is itself canonical.
                label.to_string()
            }
            CandidateLookup::Candidates(candidates) => {
                match self.disambiguate(label, &candidates).await {
                    Resolution::Resolved(canonical) => {
                        debug!(label = %label, canonical = %canonical, "Disambiguated");
                        canonical
                    }
                    Resolution::Unresolved | Resolution::Unavailable => label.to_string(),
                }
            }
        }
    }

    /// Ask the external service which candidate (if any) the mention denotes.
    ///
    /// Only a reply that, after normalization, equals a candidate-list
    /// member is trusted; anything else is treated as no-match.
    pub async fn disambiguate(&self, label: &str, candidates: &[String]) -> Resolution {
        let Some(disambiguator) = &self.disambiguator else {
            return Resolution::Unavailable;
        };

        let prompt = disambiguation_prompt(label, candidates);
        let reply = match disambiguator
            .generate(DISAMBIGUATION_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(label = %label, error = %e, "Disambiguation unavailable");
                return Resolution::Unavailable;
            }
        };

        let cleaned = clean_reply(&reply);
        if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("NONE") {
            return Resolution::Unresolved;
        }

        match candidates
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(&cleaned))
        {
            Some(candidate) => Resolution::Resolved(candidate.clone()),
            None => {
                debug!(label = %label, reply = %cleaned, "Reply is not a candidate, treating as no match");
                Resolution::Unresolved
            }
        }
    }
}

/// Normalize a disambiguation reply before comparing it to candidates:
/// trim, strip surrounding quotes, drop trailing punctuation.
fn clean_reply(reply: &str) -> String {
    let mut cleaned = reply.trim();
    cleaned = cleaned
        .trim_start_matches(['"', '\'', '`'])
        .trim_end_matches(['"', '\'', '`']);
    cleaned = cleaned.trim_end_matches(['.', ',', ';', ':', '!', '?']);
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::infrastructure::graph::EmbeddedGraphStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Generator that always answers with a fixed reply
    struct FixedGenerator {
        reply: String,
        calls: AtomicUsize,
    }

    impl FixedGenerator {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    /// Generator that always fails, simulating a service outage
    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
            Err(Error::GenerationError("service unreachable".into()))
        }
    }

    async fn store_with(labels: &[&str]) -> Arc<EmbeddedGraphStore> {
        let store = EmbeddedGraphStore::ephemeral();
        for label in labels {
            store.merge_node(label, label).await.unwrap();
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_empty_label() {
        let store = store_with(&[]).await;
        let resolver = EntityResolver::new(store);
        let mut cache = ResolutionCache::new();
        assert_eq!(resolver.resolve("", &mut cache).await, "");
        assert_eq!(resolver.resolve("   ", &mut cache).await, "");
    }

    #[tokio::test]
    async fn test_first_sighting_is_canonical() {
        let store = store_with(&[]).await;
        let resolver = EntityResolver::new(store);
        let mut cache = ResolutionCache::new();
        assert_eq!(resolver.resolve("Jane Smith", &mut cache).await, "Jane Smith");
        assert_eq!(cache.get("Jane Smith").unwrap(), "Jane Smith");
    }

    #[tokio::test]
    async fn test_alias_short_circuit_skips_disambiguation() {
        let store = store_with(&["Jane Smith"]).await;
        let generator = Arc::new(FixedGenerator::new("NONE"));
        let resolver = EntityResolver::new(store).with_disambiguator(generator.clone());

        let mut cache = ResolutionCache::new();
        let resolved = resolver.resolve("Jane Smith", &mut cache).await;

        assert_eq!(resolved, "Jane Smith");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_avoids_repeat_calls() {
        let store = store_with(&["Jane Smith"]).await;
        let generator = Arc::new(FixedGenerator::new("Jane Smith"));
        let resolver = EntityResolver::new(store).with_disambiguator(generator.clone());

        let mut cache = ResolutionCache::new();
        let first = resolver.resolve("Jane Smyth", &mut cache).await;
        let second = resolver.resolve("Jane Smyth", &mut cache).await;

        assert_eq!(first, second);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disambiguation_accepts_candidate() {
        let store = store_with(&["Jane Smith"]).await;
        let generator = Arc::new(FixedGenerator::new("Jane Smith"));
        let resolver = EntityResolver::new(store).with_disambiguator(generator);

        let mut cache = ResolutionCache::new();
        // One edit away from the stored label, so it becomes a candidate
        assert_eq!(resolver.resolve("Jane Smyth", &mut cache).await, "Jane Smith");
    }

    #[tokio::test]
    async fn test_disambiguation_none_creates_new_entity() {
        let store = store_with(&["Jane Smith"]).await;
        let generator = Arc::new(FixedGenerator::new("NONE"));
        let resolver = EntityResolver::new(store).with_disambiguator(generator);

        let mut cache = ResolutionCache::new();
        assert_eq!(resolver.resolve("Jane Smyth", &mut cache).await, "Jane Smyth");
    }

    #[tokio::test]
    async fn test_untrusted_reply_treated_as_no_match() {
        let store = store_with(&["Jane Smith"]).await;
        // Reply is not in the candidate list
        let generator = Arc::new(FixedGenerator::new("Janet Smithers"));
        let resolver = EntityResolver::new(store).with_disambiguator(generator);

        let mut cache = ResolutionCache::new();
        assert_eq!(resolver.resolve("Jane Smyth", &mut cache).await, "Jane Smyth");
    }

    #[tokio::test]
    async fn test_reply_normalization() {
        let store = store_with(&["Jane Smith"]).await;
        let resolver = EntityResolver::new(store);

        let candidates = vec!["Jane Smith".to_string()];

        let gen: Arc<dyn TextGenerator> = Arc::new(FixedGenerator::new("\"jane smith\"."));
        let resolver = resolver.with_disambiguator(gen);
        let outcome = resolver.disambiguate("Jane Smyth", &candidates).await;

        // Differently-cased, quoted, punctuated reply still resolves to
        // the stored spelling.
        assert_eq!(outcome, Resolution::Resolved("Jane Smith".to_string()));
    }

    #[tokio::test]
    async fn test_service_outage_degrades_gracefully() {
        let store = store_with(&["Jane Smith"]).await;
        let resolver = EntityResolver::new(store).with_disambiguator(Arc::new(FailingGenerator));

        let mut cache = ResolutionCache::new();
        assert_eq!(resolver.resolve("Jane Smyth", &mut cache).await, "Jane Smyth");

        let outcome = resolver
            .disambiguate("Jane Smyth", &["Jane Smith".to_string()])
            .await;
        assert_eq!(outcome, Resolution::Unavailable);
    }

    #[tokio::test]
    async fn test_no_disambiguator_is_unavailable() {
        let store = store_with(&[]).await;
        let resolver = EntityResolver::new(store);
        let outcome = resolver.disambiguate("x", &["y".to_string()]).await;
        assert_eq!(outcome, Resolution::Unavailable);
    }

    #[test]
    fn test_clean_reply() {
        assert_eq!(clean_reply("Jane Smith"), "Jane Smith");
        assert_eq!(clean_reply("  Jane Smith.  "), "Jane Smith");
        assert_eq!(clean_reply("\"Jane Smith\""), "Jane Smith");
        assert_eq!(clean_reply("'NONE'."), "NONE");
        assert_eq!(clean_reply(""), "");
    }
}
