//! SQLite Storage Implementation
//!
//! Reference store for owners, series, tags, cards and scores. Positions are
//! unique per series on every statement, so reordering goes through the
//! two-phase protocol in [`crate::renumber`].

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::card::{
    Card, CardId, CardPartial, CardScore, CardSeries, CardSnapshot, NewCard, NewPartial, Owner,
    OwnerId, PartialId, PartialType, ScoreId, SeriesId, Tag, TagId,
};
use crate::filter::{paginate, CardFilter, Page};
use crate::renumber::{
    resume_from_placeholders, PositionWriter, RenumberError, RenumberPlan, RenumberRequest,
    RenumberState,
};
use crate::revision::{
    apply_grade, CardsetAndStatistics, Grade, RevisionPlanner, TAGS_KEY_SEPARATOR,
};

/// Environment variable overriding the default database location
pub const DB_PATH_ENV: &str = "KNARDS_DB_PATH";

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// Rejected input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Series renumbering failed
    #[error("Renumbering failed: {0}")]
    Renumber(#[from] RenumberError),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// ROW HELPERS
// ============================================================================

/// Card row before timestamps are parsed and tags attached
struct CardRow {
    id: i64,
    title: Option<String>,
    series: Option<i64>,
    n_in_series: i64,
    owner: i64,
    created_at: String,
    updated_at: String,
}

const CARD_COLUMNS: &str =
    "id, title, card_series_id, n_in_series, owner_id, created_at, updated_at";

impl CardRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            series: row.get("card_series_id")?,
            n_in_series: row.get("n_in_series")?,
            owner: row.get("owner_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_card(self, tags: Vec<TagId>) -> Result<Card> {
        Ok(Card {
            id: CardId(self.id),
            title: self.title,
            series: self.series.map(SeriesId),
            n_in_series: self.n_in_series,
            tags,
            owner: OwnerId(self.owner),
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}

/// Parse RFC3339 timestamp
fn parse_timestamp(value: &str, field_name: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StorageError::InvalidTimestamp(format!(
                "Invalid {} timestamp '{}': {}",
                field_name, value, e
            ))
        })
}

fn score_from_row(
    id: i64,
    card: i64,
    owner: i64,
    score: i64,
    last_revised_at: &str,
) -> Result<CardScore> {
    let score = u8::try_from(score)
        .map_err(|_| StorageError::InvalidInput(format!("Stored score {} out of range", score)))?;
    Ok(CardScore {
        id: ScoreId(id),
        card: CardId(card),
        owner: OwnerId(owner),
        score,
        last_revised_at: parse_timestamp(last_revised_at, "last_revised_at")?,
    })
}

fn load_card(conn: &Connection, id: CardId) -> Result<Option<Card>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS),
            params![id.0],
            CardRow::from_row,
        )
        .optional()?;
    let Some(row) = row else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT tag_id FROM card_tags WHERE card_id = ?1 ORDER BY position")?;
    let tags = stmt
        .query_map(params![id.0], |row| row.get::<_, i64>(0).map(TagId))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    row.into_card(tags).map(Some)
}

fn partial_from_row(row: &rusqlite::Row) -> rusqlite::Result<(i64, i64, String, String, i64)> {
    Ok((
        row.get("id")?,
        row.get("card_id")?,
        row.get("partial_type")?,
        row.get("content")?,
        row.get("position")?,
    ))
}

fn into_partial(
    (id, card, partial_type, content, position): (i64, i64, String, String, i64),
) -> Result<CardPartial> {
    let partial_type = partial_type
        .parse::<PartialType>()
        .map_err(StorageError::InvalidInput)?;
    Ok(CardPartial {
        id: PartialId(id),
        card: CardId(card),
        partial_type,
        content,
        position,
    })
}

fn load_score(conn: &Connection, card: CardId, owner: OwnerId) -> Result<Option<CardScore>> {
    let row = conn
        .query_row(
            "SELECT id, card_id, owner_id, score, last_revised_at
             FROM card_scores WHERE card_id = ?1 AND owner_id = ?2",
            params![card.0, owner.0],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;
    row.map(|(id, card, owner, score, at)| score_from_row(id, card, owner, score, &at))
        .transpose()
}

fn load_positions(conn: &Connection, series: SeriesId) -> Result<Vec<(CardId, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT id, n_in_series FROM cards WHERE card_series_id = ?1 ORDER BY n_in_series, id",
    )?;
    let positions = stmt
        .query_map(params![series.0], |row| {
            Ok((CardId(row.get(0)?), row.get::<_, i64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(positions)
}

fn series_exists(conn: &Connection, series: SeriesId) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM card_series WHERE id = ?1",
            params![series.0],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

// ============================================================================
// POSITION WRITER
// ============================================================================

/// Writes series positions one statement at a time
struct SeriesWriter<'a> {
    conn: &'a Connection,
    series: SeriesId,
    updated_at: String,
}

impl PositionWriter for SeriesWriter<'_> {
    type Error = rusqlite::Error;

    fn write_position(&mut self, card: CardId, position: i64) -> rusqlite::Result<()> {
        let changed = self.conn.execute(
            "UPDATE cards SET n_in_series = ?1, updated_at = ?2
             WHERE id = ?3 AND card_series_id = ?4",
            params![position, self.updated_at, card.0, self.series.0],
        )?;
        if changed == 0 {
            return Err(rusqlite::Error::QueryReturnedNoRows);
        }
        Ok(())
    }
}

// ============================================================================
// STORAGE
// ============================================================================

/// SQLite card store
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, so one `Storage` can be shared behind an `Arc`.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl Storage {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Default database location: `KNARDS_DB_PATH`, else the platform data dir
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(DB_PATH_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }

        let proj_dirs = ProjectDirs::from("com", "knards", "knards").ok_or_else(|| {
            StorageError::Init("Could not determine project directories".to_string())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(data_dir, perms);
        }
        Ok(data_dir.join("knards.db"))
    }

    /// Create new storage instance
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => Self::default_path()?,
        };

        // Open writer connection
        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        super::migrations::apply_migrations(&writer_conn)?;

        // Open reader connection to same path
        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        tracing::debug!(path = %path.display(), "Storage opened");

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    fn writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))
    }

    fn reader(&self) -> Result<MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))
    }

    // ========================================================================
    // OWNERS, SERIES, TAGS
    // ========================================================================

    pub fn create_owner(&self, name: &str) -> Result<Owner> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::InvalidInput("Owner name is empty".into()));
        }
        let writer = self.writer()?;
        writer.execute("INSERT INTO owners (name) VALUES (?1)", params![name])?;
        Ok(Owner {
            id: OwnerId(writer.last_insert_rowid()),
            name: name.to_string(),
        })
    }

    pub fn owner_by_name(&self, name: &str) -> Result<Option<Owner>> {
        let reader = self.reader()?;
        let owner = reader
            .query_row(
                "SELECT id, name FROM owners WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Owner {
                        id: OwnerId(row.get(0)?),
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(owner)
    }

    /// Create a series for `owner`
    ///
    /// Series of the same owner that hold no cards are removed first.
    pub fn create_series(&self, owner: OwnerId, name: &str) -> Result<CardSeries> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;

        let removed = tx.execute(
            "DELETE FROM card_series
             WHERE owner_id = ?1
               AND NOT EXISTS (SELECT 1 FROM cards WHERE cards.card_series_id = card_series.id)",
            params![owner.0],
        )?;
        if removed > 0 {
            tracing::debug!(%owner, removed, "Removed empty series");
        }

        tx.execute(
            "INSERT INTO card_series (name, owner_id) VALUES (?1, ?2)",
            params![name, owner.0],
        )?;
        let id = SeriesId(tx.last_insert_rowid());
        tx.commit()?;

        Ok(CardSeries {
            id,
            name: name.to_string(),
            owner,
        })
    }

    /// Create a tag, or return the existing one with that name
    pub fn create_tag(&self, name: &str) -> Result<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::InvalidInput("Tag name is empty".into()));
        }
        if name.contains(TAGS_KEY_SEPARATOR) {
            return Err(StorageError::InvalidInput(format!(
                "Tag name {:?} contains {:?}",
                name, TAGS_KEY_SEPARATOR
            )));
        }
        let writer = self.writer()?;
        writer.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![name])?;
        let id: i64 =
            writer.query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
                row.get(0)
            })?;
        Ok(Tag {
            id: TagId(id),
            name: name.to_string(),
        })
    }

    // ========================================================================
    // CARDS
    // ========================================================================

    pub fn create_card(&self, owner: OwnerId, input: NewCard) -> Result<Card> {
        self.create_card_at(owner, input, Utc::now())
    }

    /// Create a card with an explicit creation time
    ///
    /// Standalone cards sit at position 1. Series cards are appended after
    /// the highest position currently in the series.
    pub fn create_card_at(
        &self,
        owner: OwnerId,
        input: NewCard,
        created_at: DateTime<Utc>,
    ) -> Result<Card> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;

        let n_in_series = match input.series {
            None => 1,
            Some(series) => {
                let series_owner: Option<i64> = tx
                    .query_row(
                        "SELECT owner_id FROM card_series WHERE id = ?1",
                        params![series.0],
                        |row| row.get(0),
                    )
                    .optional()?;
                match series_owner {
                    None => return Err(StorageError::NotFound(format!("series {}", series))),
                    Some(id) if id != owner.0 => {
                        return Err(StorageError::InvalidInput(format!(
                            "Series {} belongs to another owner",
                            series
                        )));
                    }
                    Some(_) => {}
                }
                let last: i64 = tx.query_row(
                    "SELECT COALESCE(MAX(n_in_series), 0) FROM cards WHERE card_series_id = ?1",
                    params![series.0],
                    |row| row.get(0),
                )?;
                last + 1
            }
        };

        let stamp = created_at.to_rfc3339();
        tx.execute(
            "INSERT INTO cards (title, card_series_id, n_in_series, owner_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![input.title, input.series.map(|s| s.0), n_in_series, owner.0, stamp],
        )?;
        let id = CardId(tx.last_insert_rowid());

        for (position, tag) in input.tags.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO card_tags (card_id, tag_id, position) VALUES (?1, ?2, ?3)",
                params![id.0, tag.0, position as i64],
            )?;
        }

        let card = load_card(&tx, id)?
            .ok_or_else(|| StorageError::NotFound(format!("card {}", id)))?;
        tx.commit()?;

        tracing::debug!(card = %id, series = ?card.series, n_in_series, "Card created");
        Ok(card)
    }

    pub fn get_card(&self, id: CardId) -> Result<Option<Card>> {
        let reader = self.reader()?;
        load_card(&reader, id)
    }

    /// Delete a card; returns whether it existed
    pub fn delete_card(&self, id: CardId) -> Result<bool> {
        let writer = self.writer()?;
        let removed = writer.execute("DELETE FROM cards WHERE id = ?1", params![id.0])?;
        Ok(removed > 0)
    }

    /// Replace the tags of a card, keeping the given order
    pub fn set_tags(&self, card: CardId, tags: &[TagId]) -> Result<()> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;

        let changed = tx.execute(
            "UPDATE cards SET updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), card.0],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("card {}", card)));
        }

        tx.execute("DELETE FROM card_tags WHERE card_id = ?1", params![card.0])?;
        for (position, tag) in tags.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO card_tags (card_id, tag_id, position) VALUES (?1, ?2, ?3)",
                params![card.0, tag.0, position as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    // ========================================================================
    // PARTIALS
    // ========================================================================

    /// Append a partial after the card's last one
    pub fn add_partial(&self, card: CardId, input: NewPartial) -> Result<CardPartial> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;

        let changed = tx.execute(
            "UPDATE cards SET updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), card.0],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("card {}", card)));
        }

        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM card_partials WHERE card_id = ?1",
            params![card.0],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO card_partials (card_id, partial_type, content, position)
             VALUES (?1, ?2, ?3, ?4)",
            params![card.0, input.partial_type.as_str(), input.content, position],
        )?;
        let partial = CardPartial {
            id: PartialId(tx.last_insert_rowid()),
            card,
            partial_type: input.partial_type,
            content: input.content,
            position,
        };
        tx.commit()?;

        tracing::debug!(%card, partial = %partial.id, position, "Partial added");
        Ok(partial)
    }

    /// Partials of a card in display order
    pub fn partials(&self, card: CardId) -> Result<Vec<CardPartial>> {
        let reader = self.reader()?;
        if load_card(&reader, card)?.is_none() {
            return Err(StorageError::NotFound(format!("card {}", card)));
        }
        let mut stmt = reader.prepare(
            "SELECT id, card_id, partial_type, content, position
             FROM card_partials WHERE card_id = ?1 ORDER BY position, id",
        )?;
        let rows = stmt
            .query_map(params![card.0], partial_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(into_partial).collect()
    }

    // ========================================================================
    // SCORES
    // ========================================================================

    /// Store `score` as the owner's current score for `card`
    pub fn record_score(
        &self,
        card: CardId,
        owner: OwnerId,
        score: u8,
        at: DateTime<Utc>,
    ) -> Result<CardScore> {
        let writer = self.writer()?;
        Self::upsert_score(&writer, card, owner, score, at)
    }

    fn upsert_score(
        conn: &Connection,
        card: CardId,
        owner: OwnerId,
        score: u8,
        at: DateTime<Utc>,
    ) -> Result<CardScore> {
        if load_card(conn, card)?.is_none() {
            return Err(StorageError::NotFound(format!("card {}", card)));
        }
        conn.execute(
            "INSERT INTO card_scores (card_id, owner_id, score, last_revised_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (card_id, owner_id)
             DO UPDATE SET score = excluded.score, last_revised_at = excluded.last_revised_at",
            params![card.0, owner.0, score, at.to_rfc3339()],
        )?;
        load_score(conn, card, owner)?
            .ok_or_else(|| StorageError::NotFound(format!("score of card {}", card)))
    }

    pub fn score(&self, card: CardId, owner: OwnerId) -> Result<Option<CardScore>> {
        let reader = self.reader()?;
        load_score(&reader, card, owner)
    }

    /// Grade a self-review and persist the resulting score
    pub fn review(
        &self,
        card: CardId,
        owner: OwnerId,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> Result<CardScore> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;

        let current = load_score(&tx, card, owner)?.map_or(0, |s| s.score);
        let next = apply_grade(current, grade);
        let stored = Self::upsert_score(&tx, card, owner, next, now)?;
        tx.commit()?;

        tracing::info!(%card, %owner, ?grade, from = current, to = next, "Card reviewed");
        Ok(stored)
    }

    // ========================================================================
    // SNAPSHOTS
    // ========================================================================

    /// Everything the revision engine needs for `owner`, read in one transaction
    pub fn snapshot(&self, owner: OwnerId) -> Result<CardSnapshot> {
        let mut reader = self.reader()?;
        let tx = reader.transaction()?;

        let owner_row = tx
            .query_row(
                "SELECT id, name FROM owners WHERE id = ?1",
                params![owner.0],
                |row| {
                    Ok(Owner {
                        id: OwnerId(row.get(0)?),
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("owner {}", owner)))?;

        let mut snapshot = CardSnapshot::new(owner).with_owner(owner_row);

        {
            let mut stmt =
                tx.prepare("SELECT id, name, owner_id FROM card_series WHERE owner_id = ?1")?;
            let series = stmt
                .query_map(params![owner.0], |row| {
                    Ok(CardSeries {
                        id: SeriesId(row.get(0)?),
                        name: row.get(1)?,
                        owner: OwnerId(row.get(2)?),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for s in series {
                snapshot = snapshot.with_series(s);
            }
        }

        {
            let mut stmt = tx.prepare("SELECT id, name FROM tags")?;
            let tags = stmt
                .query_map([], |row| {
                    Ok(Tag {
                        id: TagId(row.get(0)?),
                        name: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for tag in tags {
                snapshot = snapshot.with_tag(tag);
            }
        }

        let mut card_tags: HashMap<i64, Vec<TagId>> = HashMap::new();
        {
            let mut stmt = tx.prepare(
                "SELECT ct.card_id, ct.tag_id FROM card_tags ct
                 JOIN cards c ON c.id = ct.card_id
                 WHERE c.owner_id = ?1
                 ORDER BY ct.card_id, ct.position",
            )?;
            let rows = stmt.query_map(params![owner.0], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (card, tag) = row?;
                card_tags.entry(card).or_default().push(TagId(tag));
            }
        }

        {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM cards WHERE owner_id = ?1 ORDER BY id",
                CARD_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![owner.0], CardRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for row in rows {
                let tags = card_tags.remove(&row.id).unwrap_or_default();
                snapshot = snapshot.with_card(row.into_card(tags)?);
            }
        }

        {
            let mut stmt = tx.prepare(
                "SELECT id, card_id, owner_id, score, last_revised_at
                 FROM card_scores WHERE owner_id = ?1",
            )?;
            let rows = stmt
                .query_map(params![owner.0], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (id, card, score_owner, score, at) in rows {
                snapshot = snapshot.with_score(score_from_row(id, card, score_owner, score, &at)?);
            }
        }

        tx.commit()?;
        Ok(snapshot)
    }

    /// One page of the owner's cards matching `filter`, newest first
    pub fn list_cards(
        &self,
        owner: OwnerId,
        filter: &CardFilter,
        page: usize,
        page_size: usize,
    ) -> Result<Page<Card>> {
        let snapshot = self.snapshot(owner)?;
        let filter = filter.clone().owned_by(owner);
        let cards: Vec<Card> = filter.apply(&snapshot).into_iter().cloned().collect();
        Ok(paginate(&cards, page, page_size))
    }

    /// Study order and statistics for the owner's cards matching `filter`
    pub fn cardset_and_statistics(
        &self,
        owner: OwnerId,
        filter: &CardFilter,
        planner: &RevisionPlanner,
        now: DateTime<Utc>,
    ) -> Result<CardsetAndStatistics> {
        let snapshot = self.snapshot(owner)?;
        let filter = filter.clone().owned_by(owner);
        let cards = filter.apply(&snapshot);
        Ok(planner.cardset_and_statistics(&snapshot, cards, now))
    }

    // ========================================================================
    // SERIES ORDER
    // ========================================================================

    /// Stored (card, position) pairs of a series, in position order
    pub fn series_positions(&self, series: SeriesId) -> Result<Vec<(CardId, i64)>> {
        let reader = self.reader()?;
        if !series_exists(&reader, series)? {
            return Err(StorageError::NotFound(format!("series {}", series)));
        }
        load_positions(&reader, series)
    }

    /// Apply a new order to a series
    ///
    /// Validation happens before any write. Both renumbering phases run in one
    /// write transaction, so a failure leaves the previous order in place.
    pub fn reorder_series(&self, series: SeriesId, request: &RenumberRequest) -> Result<()> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;

        if !series_exists(&tx, series)? {
            return Err(StorageError::NotFound(format!("series {}", series)));
        }

        let positions = load_positions(&tx, series)?;
        let state = RenumberState::detect(positions.iter().map(|&(_, p)| p));
        if state.needs_recovery() {
            tracing::warn!(%series, ?state, "Reordering a series that holds placeholders");
        }

        let members: Vec<CardId> = positions.iter().map(|&(card, _)| card).collect();
        let plan = RenumberPlan::validate(series, request, &members)?;

        {
            let mut positions_writer = SeriesWriter {
                conn: &tx,
                series,
                updated_at: Utc::now().to_rfc3339(),
            };
            plan.apply(&mut positions_writer)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Finish an interrupted renumbering by flipping stored placeholders
    ///
    /// Returns the number of cards moved; zero when the series was settled.
    pub fn recover_series(&self, series: SeriesId) -> Result<usize> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;

        if !series_exists(&tx, series)? {
            return Err(StorageError::NotFound(format!("series {}", series)));
        }

        let positions = load_positions(&tx, series)?;
        let moved = {
            let mut positions_writer = SeriesWriter {
                conn: &tx,
                series,
                updated_at: Utc::now().to_rfc3339(),
            };
            resume_from_placeholders(series, &positions, &mut positions_writer)?
        };

        tx.commit()?;
        Ok(moved)
    }
}

// ============================================================================
// TESTS
// ============================================================================
