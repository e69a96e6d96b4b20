use std::sync::Arc;

use moodchat_db::Database;
use moodchat_sentiment::SentimentClient;

pub type AppState = Arc<AppStateInner>;

/// Long-lived handles shared by every request task. All mutation goes
/// through the Database contract; the sentiment client is stateless.
pub struct AppStateInner {
    pub db: Database,
    pub sentiment: SentimentClient,
}
