//! Lorekeep Core Library
//!
//! This crate provides the core functionality for Lorekeep, including:
//! - Triple extraction from unstructured text via an LLM
//! - Entity resolution (alias matching, candidate ranking, disambiguation)
//! - Idempotent graph merge over two interchangeable store backends
//! - Relation queries with alias and spacing-variant matching
//! - Document ingestion that never fails on extraction outages

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod llm;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::graph::{
        EntityNode, EntityResolver, GraphStore, MergeEngine, Relation, Triple,
    };
    pub use crate::domain::ingest::IngestService;
    pub use crate::error::{Error, Result};
}
