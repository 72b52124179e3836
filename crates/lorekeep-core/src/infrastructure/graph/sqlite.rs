//! Transactional SQLite graph store
//!
//! Canonical labels keep their original spelling; the NOCASE primary key
//! folds case at query time. Aliases are a JSON array on the node row and
//! unioned in Rust inside the merge transaction. Edge uniqueness is a
//! database constraint, so a replayed merge is a no-op by construction.
//!
//! Fuzzy candidate matching uses `editdist3` when the spellfix extension
//! is loaded (probed once at construction); otherwise the store falls back
//! to case-insensitive substring containment in either direction.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::domain::graph::{
    label_variants, CandidateLookup, EntityNode, GraphStats, GraphStore, Relation,
    MAX_EDIT_DISTANCE,
};
use crate::error::{Error, Result};
use crate::storage::Database;

/// spellfix edit operations cost roughly 100 each, so the candidate cutoff
/// of `MAX_EDIT_DISTANCE` edits becomes a cost ceiling.
const FUZZY_COST_CEILING: i64 = (MAX_EDIT_DISTANCE as i64) * 100;

/// SQLite-backed graph store
pub struct SqliteGraphStore {
    pool: SqlitePool,
    fuzzy: bool,
}

impl SqliteGraphStore {
    /// Build a store over an initialized database
    pub async fn new(db: &Database) -> Result<Self> {
        Self::from_pool(db.pool().clone()).await
    }

    /// Build a store over an existing pool. Probes once for `editdist3`.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let fuzzy = sqlx::query("SELECT editdist3('probe', 'probe')")
            .fetch_one(&pool)
            .await
            .is_ok();
        if fuzzy {
            debug!("editdist3 available, using edit-distance candidate matching");
        } else {
            debug!("editdist3 unavailable, using substring candidate matching");
        }
        Ok(Self { pool, fuzzy })
    }

    /// Whether edit-distance candidate matching is active
    pub fn fuzzy_matching(&self) -> bool {
        self.fuzzy
    }

    fn parse_aliases(raw: &str) -> Result<BTreeSet<String>> {
        serde_json::from_str(raw)
            .map_err(|e| Error::StoreError(format!("Malformed alias column: {}", e)))
    }

    fn encode_aliases(aliases: &BTreeSet<String>) -> Result<String> {
        serde_json::to_string(aliases)
            .map_err(|e| Error::StoreError(format!("Failed to encode aliases: {}", e)))
    }

    /// Resolve a query label to the stored canonical label, or None
    async fn canonical_for(&self, label: &str) -> Result<Option<String>> {
        for variant in label_variants(label) {
            let row: Option<(String,)> =
                sqlx::query_as("SELECT canonical_label FROM entities WHERE canonical_label = ?")
                    .bind(&variant)
                    .fetch_optional(&self.pool)
                    .await?;
            if let Some((canonical,)) = row {
                return Ok(Some(canonical));
            }
        }

        // Alias match, case-insensitive
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT e.canonical_label FROM entities e, json_each(e.aliases) a \
             WHERE lower(a.value) = lower(?) LIMIT 1",
        )
        .bind(label)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(canonical,)| canonical))
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn get_node(&self, canonical_label: &str) -> Result<Option<EntityNode>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT canonical_label, aliases FROM entities WHERE canonical_label = ?",
        )
        .bind(canonical_label)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((label, aliases)) => Ok(Some(EntityNode {
                canonical_label: label,
                aliases: Self::parse_aliases(&aliases)?,
            })),
            None => Ok(None),
        }
    }

    async fn find_candidates(&self, label: &str, limit: usize) -> Result<CandidateLookup> {
        // Exact-alias short circuit, case-sensitive as stored
        let exact: Option<(String,)> = sqlx::query_as(
            "SELECT e.canonical_label FROM entities e, json_each(e.aliases) a \
             WHERE a.value = ? LIMIT 1",
        )
        .bind(label)
        .fetch_optional(&self.pool)
        .await?;
        if let Some((canonical,)) = exact {
            return Ok(CandidateLookup::Match(canonical));
        }

        let rows: Vec<(String,)> = if self.fuzzy {
            sqlx::query_as(
                "SELECT canonical_label FROM entities \
                 WHERE editdist3(lower(canonical_label), lower(?1)) < ?2 \
                 ORDER BY editdist3(lower(canonical_label), lower(?1)) \
                 LIMIT ?3",
            )
            .bind(label)
            .bind(FUZZY_COST_CEILING)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                "SELECT canonical_label FROM entities \
                 WHERE instr(lower(canonical_label), lower(?1)) > 0 \
                    OR instr(lower(?1), lower(canonical_label)) > 0 \
                 ORDER BY length(canonical_label) \
                 LIMIT ?2",
            )
            .bind(label)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(CandidateLookup::Candidates(
            rows.into_iter().map(|(label,)| label).collect(),
        ))
    }

    async fn merge_node(&self, canonical_label: &str, raw_alias: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO entities (canonical_label, aliases) VALUES (?, json_array(?)) \
             ON CONFLICT(canonical_label) DO NOTHING",
        )
        .bind(canonical_label)
        .bind(canonical_label)
        .execute(&mut *tx)
        .await?;

        let (raw,): (String,) =
            sqlx::query_as("SELECT aliases FROM entities WHERE canonical_label = ?")
                .bind(canonical_label)
                .fetch_one(&mut *tx)
                .await?;

        let mut aliases = Self::parse_aliases(&raw)?;
        if aliases.insert(raw_alias.to_string()) {
            sqlx::query(
                "UPDATE entities SET aliases = ?, updated_at = CURRENT_TIMESTAMP \
                 WHERE canonical_label = ?",
            )
            .bind(Self::encode_aliases(&aliases)?)
            .bind(canonical_label)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn merge_edge(
        &self,
        subject: &str,
        predicate: &str,
        object: &str,
        source_uid: Option<&str>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for label in [subject, object] {
            sqlx::query(
                "INSERT INTO entities (canonical_label, aliases) VALUES (?, json_array(?)) \
                 ON CONFLICT(canonical_label) DO NOTHING",
            )
            .bind(label)
            .bind(label)
            .execute(&mut *tx)
            .await?;
        }

        // First writer wins: a conflicting insert leaves the original row,
        // source_uid included, untouched.
        sqlx::query(
            "INSERT INTO relations (id, subject, predicate, object, source_uid) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(subject, predicate, object) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(subject)
        .bind(predicate)
        .bind(object)
        .bind(source_uid)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn relations_of(&self, label: &str) -> Result<Vec<Relation>> {
        let Some(canonical) = self.canonical_for(label).await? else {
            return Ok(Vec::new());
        };

        let rows: Vec<(String, String, String, Option<String>)> = sqlx::query_as(
            "SELECT subject, predicate, object, source_uid FROM relations \
             WHERE subject = ?1 OR object = ?1 \
             ORDER BY created_at",
        )
        .bind(&canonical)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(subject, predicate, object, source_uid)| Relation {
                subject,
                predicate,
                object,
                source_uid,
            })
            .filter(|rel| {
                !rel.predicate.trim().is_empty()
                    && !rel.subject.trim().is_empty()
                    && !rel.object.trim().is_empty()
            })
            .collect())
    }

    async fn stats(&self) -> Result<GraphStats> {
        let (node_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entities")
            .fetch_one(&self.pool)
            .await?;
        let (edge_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM relations")
            .fetch_one(&self.pool)
            .await?;
        Ok(GraphStats {
            node_count: node_count as u64,
            edge_count: edge_count as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteGraphStore {
        let db = Database::in_memory().await.expect("Failed to create database");
        SqliteGraphStore::new(&db).await.expect("Failed to create store")
    }

    #[tokio::test]
    async fn test_probe_falls_back_without_spellfix() {
        let store = test_store().await;
        // Stock SQLite has no spellfix extension loaded
        assert!(!store.fuzzy_matching());
    }

    #[tokio::test]
    async fn test_merge_node_accumulates_aliases() {
        let store = test_store().await;

        store.merge_node("Jane Smith", "Jane Smith").await.unwrap();
        store.merge_node("Jane Smith", "Dr. Jane").await.unwrap();
        store.merge_node("Jane Smith", "Dr. Jane").await.unwrap();

        let node = store.get_node("Jane Smith").await.unwrap().unwrap();
        assert_eq!(node.canonical_label, "Jane Smith");
        assert_eq!(node.aliases.len(), 2);
        assert!(node.aliases.contains("Dr. Jane"));
    }

    #[tokio::test]
    async fn test_node_lookup_folds_case() {
        let store = test_store().await;
        store.merge_node("Jane Smith", "Jane Smith").await.unwrap();

        let node = store.get_node("JANE SMITH").await.unwrap().unwrap();
        // Stored spelling preserved
        assert_eq!(node.canonical_label, "Jane Smith");

        // And no duplicate node under a different case
        store.merge_node("jane smith", "jane smith").await.unwrap();
        assert_eq!(store.stats().await.unwrap().node_count, 1);
    }

    #[tokio::test]
    async fn test_edge_dedup_and_first_writer_wins() {
        let store = test_store().await;

        store.merge_edge("A", "KNOWS", "B", Some("doc-1")).await.unwrap();
        store.merge_edge("A", "KNOWS", "B", Some("doc-2")).await.unwrap();
        store.merge_edge("A", "LIKES", "B", Some("doc-2")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.edge_count, 2);

        let relations = store.relations_of("A").await.unwrap();
        let knows = relations.iter().find(|r| r.predicate == "KNOWS").unwrap();
        assert_eq!(knows.source_uid.as_deref(), Some("doc-1"));
    }

    #[tokio::test]
    async fn test_exact_alias_match_is_case_sensitive() {
        let store = test_store().await;
        store.merge_node("Jane Smith", "Dr. Jane").await.unwrap();

        let lookup = store.find_candidates("Dr. Jane", 5).await.unwrap();
        assert_eq!(lookup, CandidateLookup::Match("Jane Smith".to_string()));

        // Differently-cased alias is not an exact match; substring fallback
        // still surfaces the node as a candidate, not a match.
        let lookup = store.find_candidates("dr. jane", 5).await.unwrap();
        assert!(matches!(lookup, CandidateLookup::Candidates(_)));
    }

    #[tokio::test]
    async fn test_substring_candidates() {
        let store = test_store().await;
        for label in ["Jane Smith", "John Smith", "Project Alpha"] {
            store.merge_node(label, label).await.unwrap();
        }

        // Query contained in stored label
        let lookup = store.find_candidates("Jane", 5).await.unwrap();
        let CandidateLookup::Candidates(candidates) = lookup else {
            panic!("expected candidates");
        };
        assert_eq!(candidates, vec!["Jane Smith".to_string()]);

        // Stored label contained in query
        let lookup = store.find_candidates("Dr. Jane Smith, PhD", 5).await.unwrap();
        let CandidateLookup::Candidates(candidates) = lookup else {
            panic!("expected candidates");
        };
        assert!(candidates.contains(&"Jane Smith".to_string()));

        // Limit respected
        let lookup = store.find_candidates("Smith", 1).await.unwrap();
        let CandidateLookup::Candidates(candidates) = lookup else {
            panic!("expected candidates");
        };
        assert_eq!(candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_relations_variants_and_aliases() {
        let store = test_store().await;
        store
            .merge_edge("Project Alpha", "HAS_DEADLINE", "Friday", None)
            .await
            .unwrap();
        store.merge_node("Project Alpha", "the alpha project").await.unwrap();

        for query in ["Project Alpha", "project_alpha", "PROJECT ALPHA", "The Alpha Project"] {
            let relations = store.relations_of(query).await.unwrap();
            assert_eq!(relations.len(), 1, "query {:?}", query);
            assert_eq!(relations[0].subject, "Project Alpha");
            assert_eq!(relations[0].object, "Friday");
        }
    }

    #[tokio::test]
    async fn test_unknown_label_empty() {
        let store = test_store().await;
        assert!(store.relations_of("nobody").await.unwrap().is_empty());
    }
}
