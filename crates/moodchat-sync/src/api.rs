use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;

use moodchat_types::api::{
    CreateUserRequest, ErrorBody, MessageResponse, PostMessageRequest, UserResponse,
};

/// How long any single API call may take. Distinct from the server-side
/// classifier budget; a submission can legitimately run for the full
/// enrichment timeout, so this stays generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status and a reason.
    #[error("server rejected the request ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Typed client for the MoodChat HTTP API.
#[derive(Debug, Clone)]
pub struct ChatApi {
    http: reqwest::Client,
    base_url: String,
}

impl ChatApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    /// Insert-or-get signup. The server is idempotent per case-insensitive
    /// nickname, so retrying this call is always safe.
    pub async fn create_user(&self, nickname: &str) -> Result<UserResponse, ClientError> {
        let resp = self
            .http
            .post(format!("{}/api/users", self.base_url))
            .json(&CreateUserRequest { nickname: nickname.to_string() })
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn user_by_nickname(&self, nickname: &str) -> Result<UserResponse, ClientError> {
        let resp = self
            .http
            .get(format!("{}/api/users/by-nickname", self.base_url))
            .query(&[("nickname", nickname)])
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn send_message(
        &self,
        user_id: i64,
        text: &str,
    ) -> Result<MessageResponse, ClientError> {
        let resp = self
            .http
            .post(format!("{}/api/messages", self.base_url))
            .json(&PostMessageRequest { user_id, text: text.to_string() })
            .send()
            .await?;
        decode(resp).await
    }

    /// Fetch messages created strictly after `since` (everything when
    /// `since` is None), earliest first.
    pub async fn fetch_messages(
        &self,
        since: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Vec<MessageResponse>, ClientError> {
        let mut req = self.http.get(format!("{}/api/messages", self.base_url));
        if let Some(since) = since {
            req = req.query(&[("since", since.to_rfc3339())]);
        }
        if let Some(limit) = limit {
            req = req.query(&[("limit", limit.to_string())]);
        }
        decode(req.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        return Err(ClientError::Api { status: status.as_u16(), message });
    }

    Ok(resp.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_message() -> serde_json::Value {
        serde_json::json!({
            "id": 1,
            "text": "great day",
            "sentiment": "POSITIVE",
            "sentimentScore": 0.93,
            "createdAt": "2026-08-06T12:00:00.123456Z",
            "user": { "id": 1, "nickname": "ada" }
        })
    }

    #[tokio::test]
    async fn fetch_passes_the_watermark_as_since() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages"))
            .and(query_param("since", "2026-08-06T12:00:00.123456+00:00"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let api = ChatApi::new(server.uri()).unwrap();
        let since = "2026-08-06T12:00:00.123456Z".parse::<DateTime<Utc>>().unwrap();
        let batch = api.fetch_messages(Some(since), None).await.unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn fetch_without_watermark_sends_no_since() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([sample_message()])),
            )
            .mount(&server)
            .await;

        let api = ChatApi::new(server.uri()).unwrap();
        let batch = api.fetch_messages(None, None).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].user.nickname, "ada");
    }

    #[tokio::test]
    async fn send_message_posts_the_wire_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/messages"))
            .and(body_json(serde_json::json!({ "userId": 1, "text": "great day" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_message()))
            .mount(&server)
            .await;

        let api = ChatApi::new(server.uri()).unwrap();
        let message = api.send_message(1, "great day").await.unwrap();
        assert_eq!(message.sentiment_score, 0.93);
    }

    #[tokio::test]
    async fn api_rejections_carry_the_server_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/messages"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error": "invalid userId" })),
            )
            .mount(&server)
            .await;

        let api = ChatApi::new(server.uri()).unwrap();
        let err = api.send_message(999, "hi").await.unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid userId");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_tolerated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1, "nickname": "ada", "createdAt": "2026-08-06T12:00:00Z"
            })))
            .mount(&server)
            .await;

        let api = ChatApi::new(format!("{}/", server.uri())).unwrap();
        let user = api.create_user("ada").await.unwrap();
        assert_eq!(user.id, 1);
    }
}
