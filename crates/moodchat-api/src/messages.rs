use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use moodchat_db::models::MessageRow;
use moodchat_sentiment::Enrichment;
use moodchat_types::api::{MessageResponse, PostMessageRequest};
use moodchat_types::models::{Sentiment, UserSummary};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    /// Watermark cursor: only messages created strictly after this
    /// timestamp are returned.
    pub since: Option<DateTime<Utc>>,
    /// Truncates to the earliest qualifying messages (forward pagination).
    pub limit: Option<u32>,
}

pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let since = query.since.map(moodchat_db::time::encode);
    let limit = query.limit;

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.query_messages(since.as_deref(), limit))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;

    let messages = rows
        .into_iter()
        .map(message_response)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(messages))
}

/// Submission pipeline: validate, persist with default sentiment, attempt
/// enrichment, respond with the stored message in its final state.
///
/// The message is durable before the classifier is consulted; a classifier
/// failure leaves the defaults in place and the request still succeeds.
pub async fn post_message(
    State(state): State<AppState>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = req.user_id;
    let db = state.clone();
    let user = tokio::task::spawn_blocking(move || db.db.user_by_id(user_id))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??
        .ok_or_else(|| ApiError::InvalidArgument("invalid userId".into()))?;

    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::InvalidArgument("text required".into()));
    }

    let db = state.clone();
    let stored_text = text.clone();
    let mut row = tokio::task::spawn_blocking(move || db.db.insert_message(user.id, &stored_text))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;

    if let Enrichment::Scored { label, score } = state.sentiment.classify(&text).await {
        let db = state.clone();
        let message_id = row.id;
        let updated =
            tokio::task::spawn_blocking(move || db.db.update_sentiment(message_id, label, score))
                .await;
        match updated {
            Ok(Ok(())) => {
                // Response must reflect what the store now holds.
                row.sentiment = label.as_str().to_string();
                row.sentiment_score = score;
            }
            Ok(Err(e)) => warn!("storing sentiment for message {} failed: {e:#}", row.id),
            Err(e) => warn!("storing sentiment for message {} failed: {e}", row.id),
        }
    }

    Ok(Json(message_response(row)?))
}

fn message_response(row: MessageRow) -> Result<MessageResponse, ApiError> {
    Ok(MessageResponse {
        id: row.id,
        text: row.text,
        sentiment: Sentiment::parse_label(&row.sentiment).unwrap_or_default(),
        sentiment_score: row.sentiment_score,
        created_at: moodchat_db::time::decode(&row.created_at)?,
        user: UserSummary {
            id: row.user_id,
            nickname: row.user_nickname,
        },
    })
}
