//! Graph store backends
//!
//! Two interchangeable implementations of `domain::graph::GraphStore`:
//!
//! - [`EmbeddedGraphStore`]: in-process directed multigraph with JSON
//!   snapshot persistence; node identity is the normalized label.
//! - [`SqliteGraphStore`]: transactional SQLite store; original-cased
//!   canonical labels with case folding at query time, aliases kept as a
//!   JSON node property.

mod embedded;
mod sqlite;

pub use embedded::EmbeddedGraphStore;
pub use sqlite::SqliteGraphStore;
