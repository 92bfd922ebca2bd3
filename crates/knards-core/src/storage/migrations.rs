//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: owners, series, tags, cards, scores",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Standalone cards sit at position 1, score lookup index",
        up: MIGRATION_V2_UP,
    },
    Migration {
        version: 3,
        description: "Card partials: ordered text and code blocks of a card body",
        up: MIGRATION_V3_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS owners (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS card_series (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    owner_id INTEGER NOT NULL REFERENCES owners(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_series_owner ON card_series(owner_id);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- Positions are checked on every statement: reordering a series has to go
-- through negative placeholders (see renumber.rs)
CREATE TABLE IF NOT EXISTS cards (
    id INTEGER PRIMARY KEY,
    title TEXT,
    card_series_id INTEGER REFERENCES card_series(id) ON DELETE CASCADE,
    n_in_series INTEGER NOT NULL DEFAULT 1,
    owner_id INTEGER NOT NULL REFERENCES owners(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (card_series_id, n_in_series)
);

CREATE INDEX IF NOT EXISTS idx_cards_owner ON cards(owner_id);
CREATE INDEX IF NOT EXISTS idx_cards_created ON cards(created_at);

-- Tag attachment keeps the order tags were added in
CREATE TABLE IF NOT EXISTS card_tags (
    card_id INTEGER NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    PRIMARY KEY (card_id, tag_id)
);

CREATE TABLE IF NOT EXISTS card_scores (
    id INTEGER PRIMARY KEY,
    card_id INTEGER NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    owner_id INTEGER NOT NULL REFERENCES owners(id) ON DELETE CASCADE,
    score INTEGER NOT NULL DEFAULT 0 CHECK (score BETWEEN 0 AND 255),
    last_revised_at TEXT NOT NULL,
    UNIQUE (card_id, owner_id)
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Normalize standalone positions, index scores by owner
const MIGRATION_V2_UP: &str = r#"
UPDATE cards SET n_in_series = 1 WHERE card_series_id IS NULL;

CREATE INDEX IF NOT EXISTS idx_scores_owner ON card_scores(owner_id);

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// V3: Card partials
const MIGRATION_V3_UP: &str = r#"
CREATE TABLE IF NOT EXISTS card_partials (
    id INTEGER PRIMARY KEY,
    card_id INTEGER NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    partial_type TEXT NOT NULL DEFAULT 'text' CHECK (partial_type IN ('text', 'code')),
    content TEXT NOT NULL,
    position INTEGER NOT NULL,
    UNIQUE (card_id, position)
);

UPDATE schema_version SET version = 3, applied_at = datetime('now');
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            // Use execute_batch to handle multi-statement SQL
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
