use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            full_name   TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS stories (
            id                  TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL REFERENCES users(id),
            title               TEXT NOT NULL,
            story               TEXT NOT NULL,
            -- JSON array of place names
            visited_locations   TEXT NOT NULL,
            -- epoch milliseconds
            visited_date        INTEGER NOT NULL,
            image_url           TEXT NOT NULL,
            is_favourite        INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_stories_owner
            ON stories(user_id, is_favourite);

        CREATE INDEX IF NOT EXISTS idx_stories_visited
            ON stories(user_id, visited_date);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
