//! Storage layer - SQLite pool construction and migrations
//!
//! # Architecture
//!
//! - `database`: Connection pool management and initialization
//! - `migrations`: Schema versioning and automatic migration
//!
//! # Usage
//!
//! ```ignore
//! use lorekeep_core::storage::Database;
//!
//! // Create an in-memory database for testing
//! let db = Database::in_memory().await?;
//!
//! // Or open the on-disk graph database
//! let db = Database::new(DatabaseConfig::with_path(path)).await?;
//! ```

pub mod database;
pub mod migrations;

pub use database::{Database, DatabaseConfig};
pub use migrations::{migration_status, run_migrations, MigrationStatus, CURRENT_VERSION};
