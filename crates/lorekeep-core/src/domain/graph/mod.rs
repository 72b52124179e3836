//! Knowledge graph domain module
//!
//! The entity-resolution and graph-merge engine:
//!
//! - **Triple parsing**: structured facts out of raw extraction output
//! - **Entity resolution**: alias short-circuit, candidate ranking, and
//!   delegated disambiguation, degrading gracefully on outages
//! - **Graph merge**: idempotent create-or-attach writes with edge dedup
//! - **Relation query**: incident edges under alias and spacing variants
//!
//! Storage is abstracted behind [`GraphStore`], with two interchangeable
//! backends in `infrastructure::graph` (embedded snapshot, SQLite).

mod entity;
mod label;
mod merge;
mod relation;
mod resolver;
mod store;
mod triple;

pub use entity::EntityNode;
pub use label::{label_variants, levenshtein, normalize_label};
pub use merge::{MergeEngine, MergeReport};
pub use relation::{GraphStats, Relation};
pub use resolver::{EntityResolver, Resolution, ResolutionCache};
pub use store::{CandidateLookup, GraphStore, MAX_CANDIDATES, MAX_EDIT_DISTANCE};
pub use triple::{parse_triples, Triple};
