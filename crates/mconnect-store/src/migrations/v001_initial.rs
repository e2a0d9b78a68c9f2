//! v001 -- Initial schema creation.
//!
//! Creates the `session` and `last_seen` tables.

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Operator session (at most one row)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS session (
    id           INTEGER PRIMARY KEY CHECK (id = 1),
    access_token TEXT NOT NULL,
    issued_at    TEXT NOT NULL,               -- RFC-3339
    username     TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Device last-seen cache, replaced wholesale on every fetch
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS last_seen (
    dev_sn    TEXT PRIMARY KEY NOT NULL,
    last_seen TEXT NOT NULL                   -- verbatim backend value
);
"#;

pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
