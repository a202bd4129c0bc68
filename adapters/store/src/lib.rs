#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! SQLite-backed level store.
//!
//! Each accepted level is written by a single `INSERT`, so it is durable as
//! soon as [`LevelStore::insert_level`] returns. Fingerprints are recomputed
//! from the stored boards with the same function the ingestion run uses.

mod rows;
mod schema;

use std::path::Path;

use chrono::Utc;
use rusqlite::Connection;
use sortwater_core::{ContentId, DistributionStats, Level, LevelId, NewLevel};
use sortwater_system_fingerprint::fingerprint;
use sortwater_system_ingestion::LevelStore;
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading or writing the level database.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite rejected a statement.
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    /// A JSON column could not be encoded or decoded.
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),
    /// A timestamp column is not valid RFC 3339.
    #[error("level {id} has a malformed timestamp: {source}")]
    Timestamp {
        /// Level the column belongs to.
        id: i64,
        /// Parse failure.
        #[source]
        source: chrono::ParseError,
    },
}

/// Level store persisted in a SQLite database.
#[derive(Debug)]
pub struct SqliteLevelStore {
    conn: Connection,
}

impl SqliteLevelStore {
    /// Opens or creates the database at `path` and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened level database");
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        schema::migrate_sync(&conn)?;
        Ok(Self { conn })
    }

    /// Looks up one level by identifier.
    pub fn level(&self, id: LevelId) -> Result<Option<Level>, StoreError> {
        rows::get_level_sync(&self.conn, id.get())?
            .map(rows::LevelRow::into_level)
            .transpose()
    }

    /// Every stored level in insertion order.
    pub fn levels(&self) -> Result<Vec<Level>, StoreError> {
        rows::get_levels_sync(&self.conn)?
            .into_iter()
            .map(rows::LevelRow::into_level)
            .collect()
    }
}

impl LevelStore for SqliteLevelStore {
    type Error = StoreError;

    fn total_count(&self) -> Result<u64, Self::Error> {
        let count = rows::count_levels_sync(&self.conn)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn window_stats(&self, window: u64) -> Result<DistributionStats, Self::Error> {
        let window = i64::try_from(window).unwrap_or(i64::MAX);
        Ok(rows::window_stats_sync(&self.conn, window)?)
    }

    fn all_fingerprints(&self) -> Result<Vec<ContentId>, Self::Error> {
        rows::get_level_payloads_sync(&self.conn)?
            .iter()
            .map(|payload| rows::decode_state(payload).map(|state| fingerprint(&state)))
            .collect()
    }

    fn insert_level(&mut self, level: NewLevel) -> Result<Level, Self::Error> {
        let now = Utc::now();
        let id = rows::insert_level_sync(&self.conn, &level, now)?;
        Ok(Level {
            id: LevelId::new(id),
            state: level.state,
            difficulty: level.difficulty,
            steps_to_solve: level.steps_to_solve,
            solution: level.solution,
            source: level.source,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sortwater_core::{DifficultyBucket, Move, PuzzleState};

    fn new_level(variant: usize, bucket: &str) -> NewLevel {
        let mut rows = vec![vec![0, 1], vec![1, 0]];
        rows.extend((0..=variant).map(|_| vec![-1, -1]));
        NewLevel {
            state: PuzzleState::from_matrix(&rows).expect("board"),
            difficulty: DifficultyBucket::new(bucket),
            steps_to_solve: 3,
            solution: Some(vec![Move::new(0, 2), Move::new(1, 0), Move::new(1, 2)]),
            source: "5_2_4".to_owned(),
        }
    }

    #[test]
    fn inserted_levels_round_trip() {
        let mut store = SqliteLevelStore::open_in_memory().expect("store");
        let inserted = store.insert_level(new_level(0, "easy")).expect("insert");
        assert_eq!(inserted.id, LevelId::new(1));

        let loaded = store.level(inserted.id).expect("query").expect("level exists");
        assert_eq!(loaded.state, inserted.state);
        assert_eq!(loaded.solution, inserted.solution);
        assert_eq!(loaded.difficulty.as_str(), "easy");
        assert_eq!(loaded.source, "5_2_4");
        assert!(store.level(LevelId::new(99)).expect("query").is_none());
    }

    #[test]
    fn window_counts_most_recent_levels() {
        let mut store = SqliteLevelStore::open_in_memory().expect("store");
        for (variant, bucket) in ["hard", "hard", "easy", "medium", "easy"].iter().enumerate() {
            let _ = store.insert_level(new_level(variant, bucket)).expect("insert");
        }

        assert_eq!(store.total_count().expect("count"), 5);
        let stats = store.window_stats(3).expect("stats");
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.count(&DifficultyBucket::new("easy")), 2);
        assert_eq!(stats.count(&DifficultyBucket::new("medium")), 1);
        assert_eq!(stats.count(&DifficultyBucket::new("hard")), 0);
    }

    #[test]
    fn fingerprints_are_recomputed_from_boards() {
        let mut store = SqliteLevelStore::open_in_memory().expect("store");
        let level = new_level(2, "unknown");
        let expected = fingerprint(&level.state);
        let _ = store.insert_level(level).expect("insert");
        assert_eq!(store.all_fingerprints().expect("fingerprints"), vec![expected]);
    }

    #[test]
    fn missing_solution_is_stored_as_null() {
        let mut store = SqliteLevelStore::open_in_memory().expect("store");
        let mut level = new_level(0, "easy");
        level.solution = None;
        let inserted = store.insert_level(level).expect("insert");

        let raw: Option<String> = store
            .conn
            .query_row("SELECT solution FROM levels WHERE id = ?", [inserted.id.get()], |row| {
                row.get(0)
            })
            .expect("raw column");
        assert!(raw.is_none());
        let payload: String = store
            .conn
            .query_row("SELECT level_data FROM levels WHERE id = ?", [inserted.id.get()], |row| {
                row.get(0)
            })
            .expect("raw payload");
        assert_eq!(payload, r#"{"state":[[0,1],[1,0],[-1,-1]]}"#);
    }
}
