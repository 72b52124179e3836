//! Domain modules

pub mod graph;
pub mod ingest;
