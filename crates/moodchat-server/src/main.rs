use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use moodchat_api::state::AppStateInner;
use moodchat_db::Database;
use moodchat_sentiment::SentimentClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodchat=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("MOODCHAT_DB_PATH").unwrap_or_else(|_| "moodchat.db".into());
    let host = std::env::var("MOODCHAT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("MOODCHAT_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let sentiment_url = std::env::var("MOODCHAT_SENTIMENT_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8000/analyze".into());
    let sentiment_timeout: u64 = std::env::var("MOODCHAT_SENTIMENT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(moodchat_sentiment::DEFAULT_TIMEOUT.as_secs());

    // Init database and classifier handle
    let db = Database::open(&PathBuf::from(&db_path))?;
    let sentiment =
        SentimentClient::new(sentiment_url.clone(), Duration::from_secs(sentiment_timeout))?;
    info!("Sentiment classifier at {} ({}s timeout)", sentiment_url, sentiment_timeout);

    // Shared state + routes
    let state = Arc::new(AppStateInner { db, sentiment });
    let app = moodchat_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("MoodChat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
