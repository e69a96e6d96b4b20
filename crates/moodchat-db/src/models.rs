/// Database row types — these map directly to SQLite rows.
/// Distinct from the moodchat-types wire models to keep the DB layer
/// independent of the HTTP surface.

pub struct UserRow {
    pub id: i64,
    pub nickname: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: i64,
    pub user_id: i64,
    pub user_nickname: String,
    pub text: String,
    pub sentiment: String,
    pub sentiment_score: f64,
    pub created_at: String,
}
