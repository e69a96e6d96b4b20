//! Best-effort sentiment classification over HTTP.
//!
//! The classifier is an external service that can be slow, down, or
//! babbling. Every failure mode (timeout, connection error, non-success
//! status, malformed body, unusable label) collapses into
//! [`Enrichment::Skipped`], so message delivery never depends on
//! classifier availability.

use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use moodchat_types::models::Sentiment;

/// Default bound on a single classifier call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    label: String,
    #[serde(default)]
    score: f64,
}

/// Outcome of a classification attempt. `Skipped` is the soft-failure
/// sentinel: the message keeps its default sentiment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Enrichment {
    Scored { label: Sentiment, score: f64 },
    Skipped,
}

#[derive(Debug, Clone)]
pub struct SentimentClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SentimentClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    /// Classify `text`. Never fails the caller: problems are logged and
    /// reported as [`Enrichment::Skipped`].
    pub async fn classify(&self, text: &str) -> Enrichment {
        match self.try_classify(text).await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                warn!("sentiment call failed: {e:#}");
                Enrichment::Skipped
            }
        }
    }

    async fn try_classify(&self, text: &str) -> Result<Enrichment> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&ClassifyRequest { text })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        debug!("POST {} -> {}; body={}", self.endpoint, status, body);

        if !status.is_success() {
            bail!("classifier returned {}", status);
        }

        let payload: ClassifyResponse = serde_json::from_str(&body)?;
        if payload.label.trim().is_empty() {
            bail!("classifier returned an empty label");
        }
        let Some(label) = Sentiment::parse_label(&payload.label) else {
            bail!("classifier returned unknown label '{}'", payload.label);
        };

        Ok(Enrichment::Scored {
            label,
            score: payload.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> SentimentClient {
        SentimentClient::new(format!("{}/analyze", server.uri()), Duration::from_millis(250))
            .unwrap()
    }

    #[tokio::test]
    async fn classify_normalizes_lowercase_labels() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .and(body_json(serde_json::json!({ "text": "great day" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "label": "positive", "score": 0.93 }),
            ))
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.classify("great day").await;
        assert_eq!(
            outcome,
            Enrichment::Scored { label: Sentiment::Positive, score: 0.93 }
        );
    }

    #[tokio::test]
    async fn missing_score_defaults_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "label": "NEGATIVE" })),
            )
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.classify("ugh").await;
        assert_eq!(
            outcome,
            Enrichment::Scored { label: Sentiment::Negative, score: 0.0 }
        );
    }

    #[tokio::test]
    async fn non_success_status_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.classify("hi").await;
        assert_eq!(outcome, Enrichment::Skipped);
    }

    #[tokio::test]
    async fn malformed_body_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.classify("hi").await;
        assert_eq!(outcome, Enrichment::Skipped);
    }

    #[tokio::test]
    async fn empty_label_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "label": "", "score": 0.7 })),
            )
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.classify("hi").await;
        assert_eq!(outcome, Enrichment::Skipped);
    }

    #[tokio::test]
    async fn unknown_label_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "label": "MIXED", "score": 0.7 })),
            )
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.classify("hi").await;
        assert_eq!(outcome, Enrichment::Skipped);
    }

    #[tokio::test]
    async fn timeout_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "label": "POSITIVE", "score": 0.9 }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let outcome = client_for(&server).await.classify("hi").await;
        assert_eq!(outcome, Enrichment::Skipped);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_skipped() {
        let client =
            SentimentClient::new("http://127.0.0.1:9/analyze".into(), Duration::from_millis(250))
                .unwrap();
        assert_eq!(client.classify("hi").await, Enrichment::Skipped);
    }
}
