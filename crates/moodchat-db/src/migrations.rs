use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            nickname    TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        -- Case-insensitive uniqueness backs the idempotent signup:
        -- concurrent creates of the same nickname converge on one row.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_users_nickname
            ON users(nickname COLLATE NOCASE);

        CREATE TABLE IF NOT EXISTS messages (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id          INTEGER NOT NULL REFERENCES users(id),
            text             TEXT NOT NULL,
            sentiment        TEXT NOT NULL DEFAULT 'NEUTRAL',
            sentiment_score  REAL NOT NULL DEFAULT 0.0,
            created_at       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_created
            ON messages(created_at, id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
