use crate::models::{MessageRow, UserRow};
use crate::time;
use crate::Database;
use anyhow::{Result, anyhow};
use chrono::Utc;
use moodchat_types::models::Sentiment;
use rusqlite::Connection;
use tracing::warn;

impl Database {
    // -- Users --

    /// Insert-or-get by case-insensitive nickname.
    ///
    /// The fast path returns an existing row. A writer that loses a
    /// concurrent insert race hits the UNIQUE index and retries as a
    /// lookup, so both callers converge on the same stored user.
    pub fn create_user(&self, nickname: &str) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            if let Some(existing) = query_user_by_nickname(conn, nickname)? {
                return Ok(existing);
            }

            let created_at = time::encode(Utc::now());
            match conn.execute(
                "INSERT INTO users (nickname, created_at) VALUES (?1, ?2)",
                rusqlite::params![nickname, created_at],
            ) {
                Ok(_) => Ok(UserRow {
                    id: conn.last_insert_rowid(),
                    nickname: nickname.to_string(),
                    created_at,
                }),
                Err(e) if is_unique_violation(&e) => query_user_by_nickname(conn, nickname)?
                    .ok_or_else(|| anyhow!("user '{}' missing after UNIQUE violation", nickname)),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn user_by_nickname(&self, nickname: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_nickname(conn, nickname))
    }

    pub fn user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, nickname, created_at FROM users WHERE id = ?1")?;

            let row = stmt
                .query_row([id], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        nickname: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    // -- Messages --

    /// Append a message with default sentiment fields.
    ///
    /// id and created_at are assigned here, under the connection lock, so
    /// no two appends can observe conflicting order. created_at is clamped
    /// to the newest stored message, which keeps (created_at, id) monotonic
    /// non-decreasing even if the wall clock steps backwards.
    pub fn insert_message(&self, user_id: i64, text: &str) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let mut created_at = time::encode(Utc::now());
            let newest: Option<String> =
                conn.query_row("SELECT MAX(created_at) FROM messages", [], |row| row.get(0))?;
            if let Some(newest) = newest {
                if newest > created_at {
                    created_at = newest;
                }
            }

            conn.execute(
                "INSERT INTO messages (user_id, text, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, text, created_at],
            )?;
            let id = conn.last_insert_rowid();

            query_message_by_id(conn, id)?
                .ok_or_else(|| anyhow!("message {} missing directly after insert", id))
        })
    }

    /// Apply an enrichment result to both sentiment fields in one statement.
    /// A missing row is logged and ignored rather than surfaced.
    pub fn update_sentiment(&self, message_id: i64, label: Sentiment, score: f64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET sentiment = ?1, sentiment_score = ?2 WHERE id = ?3",
                rusqlite::params![label.as_str(), score, message_id],
            )?;
            if changed == 0 {
                warn!("update_sentiment: message {} no longer exists", message_id);
            }
            Ok(())
        })
    }

    /// Messages ascending by (created_at, id), with their owner's nickname.
    ///
    /// `since` filters strictly greater, so a client can feed the last
    /// created_at it saw straight back in. `limit` truncates after ordering
    /// and filtering: the earliest qualifying rows win, which is what
    /// forward pagination needs.
    pub fn query_messages(
        &self,
        since: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.user_id, u.nickname, m.text, m.sentiment, m.sentiment_score, m.created_at
                 FROM messages m
                 JOIN users u ON m.user_id = u.id
                 WHERE ?1 IS NULL OR m.created_at > ?1
                 ORDER BY m.created_at ASC, m.id ASC
                 LIMIT ?2",
            )?;

            // SQLite treats a negative LIMIT as no limit.
            let limit = limit.map(i64::from).unwrap_or(-1);
            let rows = stmt
                .query_map(rusqlite::params![since, limit], row_to_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_user_by_nickname(conn: &Connection, nickname: &str) -> Result<Option<UserRow>> {
    // NOCASE collation here matches the UNIQUE index exactly.
    let mut stmt = conn.prepare(
        "SELECT id, nickname, created_at FROM users WHERE nickname = ?1 COLLATE NOCASE",
    )?;

    let row = stmt
        .query_row([nickname], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                nickname: row.get(1)?,
                created_at: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_message_by_id(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.user_id, u.nickname, m.text, m.sentiment, m.sentiment_score, m.created_at
         FROM messages m
         JOIN users u ON m.user_id = u.id
         WHERE m.id = ?1",
    )?;

    let row = stmt.query_row([id], row_to_message).optional()?;

    Ok(row)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        user_nickname: row.get(2)?,
        text: row.get(3)?,
        sentiment: row.get(4)?,
        sentiment_score: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
