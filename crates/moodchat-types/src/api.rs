use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Sentiment, UserSummary};

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub nickname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}

// -- Messages --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostMessageRequest {
    pub user_id: i64,
    pub text: String,
}

/// A stored message with its owner summary, as returned by the API.
/// Both the server handlers and the sync client speak this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: i64,
    pub text: String,
    pub sentiment: Sentiment,
    pub sentiment_score: f64,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
}

// -- Errors --

/// JSON body of every non-2xx API response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
