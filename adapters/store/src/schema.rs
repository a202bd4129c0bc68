//! Table layout of the level database.

use rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS levels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    level_data TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    steps_to_solve INTEGER NOT NULL,
    solution TEXT,
    source TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_levels_difficulty ON levels(difficulty);
";

/// Creates missing tables and indexes.
pub(crate) fn migrate_sync(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
