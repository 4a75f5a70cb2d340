use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Store: running migration v1 (sorted entries + scalars)");
        conn.execute_batch(
            "
            CREATE TABLE sorted_entries (
                seq     INTEGER PRIMARY KEY AUTOINCREMENT,
                key     TEXT NOT NULL,
                score   REAL NOT NULL,
                member  TEXT NOT NULL
            );

            CREATE INDEX idx_sorted_entries_key_score
                ON sorted_entries(key, score, seq);

            CREATE TABLE scalars (
                key     TEXT PRIMARY KEY,
                value   REAL NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Store migrations complete (schema v1)");
    Ok(())
}
