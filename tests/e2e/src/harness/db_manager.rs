//! Test Database Manager
//!
//! Provides isolated database instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - A default owner created with every database
//! - Reopening the same file to check persistence

use knards_core::{CardSnapshot, Owner, OwnerId, Storage};
use std::path::PathBuf;
use tempfile::TempDir;

/// Name of the owner every test database starts with
pub const DEFAULT_OWNER: &str = "tester";

/// Manager for test databases
///
/// Creates isolated database instances for each test to prevent interference.
/// Automatically cleans up temporary databases when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
///
/// // Use the storage
/// db.storage.create_card(db.owner(), NewCard::default())?;
///
/// // Database is automatically deleted when `db` goes out of scope
/// ```
pub struct TestDatabaseManager {
    /// The storage instance
    pub storage: Storage,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: Option<TempDir>,
    /// Path to the database file
    db_path: PathBuf,
    owner: Owner,
}

impl TestDatabaseManager {
    /// Create a new test database in a temporary directory
    ///
    /// The database is automatically deleted when the manager is dropped.
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_knards.db");

        let mut manager = Self::open(db_path);
        manager._temp_dir = Some(temp_dir);
        manager
    }

    /// Create a test database at a specific path
    ///
    /// The database is NOT automatically deleted.
    pub fn new_at_path(path: PathBuf) -> Self {
        Self::open(path)
    }

    fn open(db_path: PathBuf) -> Self {
        let storage = Storage::new(Some(db_path.clone())).expect("Failed to create test storage");
        let owner = match storage.owner_by_name(DEFAULT_OWNER).expect("Failed to look up owner") {
            Some(owner) => owner,
            None => storage
                .create_owner(DEFAULT_OWNER)
                .expect("Failed to create test owner"),
        };

        Self {
            storage,
            _temp_dir: None,
            db_path,
            owner,
        }
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// The default owner
    pub fn owner(&self) -> OwnerId {
        self.owner.id
    }

    /// Add another owner
    pub fn add_owner(&self, name: &str) -> OwnerId {
        self.storage
            .create_owner(name)
            .expect("Failed to create owner")
            .id
    }

    /// Snapshot of the default owner's collection
    pub fn snapshot(&self) -> CardSnapshot {
        self.storage
            .snapshot(self.owner.id)
            .expect("Failed to take snapshot")
    }

    /// Number of cards the default owner has
    pub fn card_count(&self) -> usize {
        self.snapshot().cards().len()
    }

    /// Check if the default owner has no cards
    pub fn is_empty(&self) -> bool {
        self.card_count() == 0
    }

    /// Close and reopen the store on the same file
    pub fn reopen(&mut self) {
        self.storage = Storage::new(Some(self.db_path.clone())).expect("Failed to reopen storage");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_database_starts_empty() {
        let db = TestDatabaseManager::new_temp();
        assert!(db.is_empty());
        assert!(db.path().exists());
        assert_eq!(
            db.snapshot().owner_info(db.owner()).map(|o| o.name.as_str()),
            Some(DEFAULT_OWNER)
        );
    }

    #[test]
    fn test_reopen_keeps_owner() {
        let mut db = TestDatabaseManager::new_temp();
        let owner = db.owner();
        db.reopen();
        assert_eq!(db.snapshot().owner(), Some(owner));
    }
}
