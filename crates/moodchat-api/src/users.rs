use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use moodchat_db::models::UserRow;
use moodchat_types::api::{CreateUserRequest, UserResponse};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NicknameQuery {
    pub nickname: String,
}

/// Idempotent signup: repeated posts with case-variants of the same
/// nickname return the originally created user.
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let nickname = valid_nickname(&req.nickname)?;

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.create_user(&nickname))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;

    Ok(Json(user_response(row)?))
}

pub async fn user_by_nickname(
    State(state): State<AppState>,
    Query(query): Query<NicknameQuery>,
) -> Result<Json<UserResponse>, ApiError> {
    let nickname = valid_nickname(&query.nickname)?;

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.user_by_nickname(&nickname))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??
        .ok_or(ApiError::NotFound)?;

    Ok(Json(user_response(row)?))
}

fn valid_nickname(raw: &str) -> Result<String, ApiError> {
    let nickname = raw.trim();
    let len = nickname.chars().count();
    if !(2..=20).contains(&len) {
        return Err(ApiError::InvalidArgument("Nickname must be 2..20 chars.".into()));
    }
    Ok(nickname.to_string())
}

fn user_response(row: UserRow) -> Result<UserResponse, ApiError> {
    Ok(UserResponse {
        id: row.id,
        nickname: row.nickname,
        created_at: moodchat_db::time::decode(&row.created_at)?,
    })
}
