//! Row-level queries against the `levels` table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use sortwater_core::{
    DifficultyBucket, DistributionStats, Level, LevelId, Move, NewLevel, PuzzleState,
};

use crate::StoreError;

const LEVEL_COLUMNS: &str =
    "id, level_data, difficulty, steps_to_solve, solution, source, created_at, updated_at";

/// JSON payload stored in `level_data`.
#[derive(Serialize, Deserialize)]
struct LevelData {
    state: PuzzleState,
}

/// Raw column values in `LEVEL_COLUMNS` order.
pub(crate) struct LevelRow {
    id: i64,
    level_data: String,
    difficulty: String,
    steps_to_solve: i32,
    solution: Option<String>,
    source: String,
    created_at: String,
    updated_at: String,
}

impl LevelRow {
    pub(crate) fn into_level(self) -> Result<Level, StoreError> {
        let state = decode_state(&self.level_data)?;
        let solution = self
            .solution
            .as_deref()
            .map(serde_json::from_str::<Vec<Move>>)
            .transpose()?;
        Ok(Level {
            id: LevelId::new(self.id),
            state,
            difficulty: DifficultyBucket::new(self.difficulty),
            steps_to_solve: self.steps_to_solve,
            solution,
            source: self.source,
            created_at: parse_timestamp(self.id, &self.created_at)?,
            updated_at: parse_timestamp(self.id, &self.updated_at)?,
        })
    }
}

/// Extracts the board from a `level_data` payload.
pub(crate) fn decode_state(level_data: &str) -> Result<PuzzleState, StoreError> {
    let data: LevelData = serde_json::from_str(level_data)?;
    Ok(data.state)
}

fn parse_timestamp(id: i64, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|source| StoreError::Timestamp { id, source })
}

pub(crate) fn parse_level_row(row: &Row<'_>) -> rusqlite::Result<LevelRow> {
    Ok(LevelRow {
        id: row.get(0)?,
        level_data: row.get(1)?,
        difficulty: row.get(2)?,
        steps_to_solve: row.get(3)?,
        solution: row.get(4)?,
        source: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub(crate) fn count_levels_sync(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM levels", [], |row| row.get(0))
}

pub(crate) fn window_stats_sync(
    conn: &Connection,
    window: i64,
) -> rusqlite::Result<DistributionStats> {
    let sql = "SELECT difficulty, COUNT(*) FROM (
                   SELECT difficulty FROM levels ORDER BY id DESC LIMIT ?
               )
               GROUP BY difficulty";
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([window], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut stats = DistributionStats::new();
    for row in rows {
        let (difficulty, count) = row?;
        stats.add(DifficultyBucket::new(difficulty), count.max(0) as u64);
    }
    Ok(stats)
}

pub(crate) fn get_level_payloads_sync(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT level_data FROM levels ORDER BY id ASC")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

pub(crate) fn get_level_sync(conn: &Connection, id: i64) -> rusqlite::Result<Option<LevelRow>> {
    let sql = format!("SELECT {LEVEL_COLUMNS} FROM levels WHERE id = ?");
    conn.query_row(&sql, [id], parse_level_row).optional()
}

pub(crate) fn get_levels_sync(conn: &Connection) -> rusqlite::Result<Vec<LevelRow>> {
    let sql = format!("SELECT {LEVEL_COLUMNS} FROM levels ORDER BY id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], parse_level_row)?;
    rows.collect()
}

pub(crate) fn insert_level_sync(
    conn: &Connection,
    level: &NewLevel,
    now: DateTime<Utc>,
) -> Result<i64, StoreError> {
    let level_data = serde_json::to_string(&LevelData {
        state: level.state.clone(),
    })?;
    let solution = level
        .solution
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let timestamp = now.to_rfc3339();

    let _ = conn.execute(
        "INSERT INTO levels
             (level_data, difficulty, steps_to_solve, solution, source, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            level_data,
            level.difficulty.as_str(),
            level.steps_to_solve,
            solution,
            level.source,
            timestamp,
            timestamp,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}
