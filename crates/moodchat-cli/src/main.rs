//! Terminal MoodChat client: signs up a nickname, polls for new messages
//! on a fixed interval, and sends whatever you type.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use moodchat_sync::{ChatApi, Poller};
use moodchat_types::api::MessageResponse;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodchat=info".into()),
        )
        .init();

    // Config
    let server =
        std::env::var("MOODCHAT_SERVER").unwrap_or_else(|_| "http://127.0.0.1:3000".into());
    let poll_secs: u64 = std::env::var("MOODCHAT_POLL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(moodchat_sync::poll::DEFAULT_POLL_INTERVAL.as_secs());
    let nickname = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MOODCHAT_NICKNAME").ok())
        .context("usage: moodchat <nickname>  (2..20 chars)")?;

    let api = ChatApi::new(server.clone())?;

    // Signup is idempotent; if it still fails, fall back to a plain lookup
    // the way the mobile client does.
    let user = match api.create_user(nickname.trim()).await {
        Ok(user) => user,
        Err(e) => {
            warn!("signup failed ({e}), retrying as lookup");
            api.user_by_nickname(nickname.trim()).await?
        }
    };
    println!("signed in as {} (#{}) on {}", user.nickname, user.id, server);

    let mut poller = Poller::new(api.clone(), Duration::from_secs(poll_secs));

    // Fresh session: full retrieval before the incremental loop starts.
    for message in poller.poll_once().await? {
        print_message(&message, user.id);
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(poll_secs));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match poller.poll_once().await {
                    Ok(fresh) => {
                        for message in &fresh {
                            print_message(message, user.id);
                        }
                    }
                    Err(e) => warn!("sync failed: {e}"),
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break; // stdin closed
                };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                match api.send_message(user.id, text).await {
                    Ok(message) => {
                        poller.absorb(&message);
                        print_message(&message, user.id);
                    }
                    Err(e) => warn!("send failed: {e}"),
                }
            }
        }
    }

    Ok(())
}

fn print_message(message: &MessageResponse, own_id: i64) {
    let marker = if message.user.id == own_id { "*" } else { " " };
    println!(
        "{} {}{}: {} [{} {:.2}]",
        message.created_at.format("%H:%M"),
        marker,
        message.user.nickname,
        message.text,
        message.sentiment.as_str(),
        message.sentiment_score,
    );
}
