//! Infrastructure implementations of domain contracts

pub mod graph;
