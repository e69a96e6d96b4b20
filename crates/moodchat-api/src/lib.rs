pub mod error;
pub mod messages;
pub mod state;
pub mod users;

use axum::{
    Json, Router,
    routing::{get, post},
};

use crate::state::AppState;

/// All ingestion routes. The server binary layers CORS and request
/// tracing on top of this.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/users", post(users::create_user))
        .route("/api/users/by-nickname", get(users::user_by_nickname))
        .route("/api/messages", get(messages::list_messages))
        .route("/api/messages", post(messages::post_message))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}
