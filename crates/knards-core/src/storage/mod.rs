//! Storage Module
//!
//! SQLite-based reference store with:
//! - Versioned schema migrations
//! - Per-statement unique series positions
//! - Point-in-time snapshots read in one transaction
//! - Transactional two-phase series renumbering

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{Result, Storage, StorageError, DB_PATH_ENV};
