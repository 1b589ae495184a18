//! Review comment sentiment.
//!
//! The model itself is hosted elsewhere. This module only defines the seam
//! ([`SentimentClassifier`]) and an HTTP client for text-classification
//! endpoints that answer `{"inputs": "..."}` with `label`/`score` pairs.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SentimentConfig;

/// Label stored when no classifier endpoint is configured.
pub const UNCLASSIFIED: &str = "UNCLASSIFIED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sentiment {
    pub label: String,
}

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("sentiment request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("sentiment service returned {0}")]
    Status(reqwest::StatusCode),

    #[error("sentiment service returned no labels")]
    EmptyResponse,
}

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Sentiment, SentimentError>;
}

/// Always answers with the same label.
#[derive(Debug, Clone)]
pub struct StaticSentiment {
    label: String,
}

impl StaticSentiment {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl SentimentClassifier for StaticSentiment {
    async fn classify(&self, _text: &str) -> Result<Sentiment, SentimentError> {
        Ok(Sentiment {
            label: self.label.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpSentimentClassifier {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

// Pipelines answer either one list per input or a flat list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Batched(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl ClassifyResponse {
    fn best(self) -> Option<LabelScore> {
        let scores = match self {
            ClassifyResponse::Batched(batches) => batches.into_iter().next()?,
            ClassifyResponse::Flat(scores) => scores,
        };
        scores.into_iter().max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

impl HttpSentimentClassifier {
    pub fn new(
        url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SentimentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }
}

#[async_trait]
impl SentimentClassifier for HttpSentimentClassifier {
    #[tracing::instrument(skip(self, text), fields(text_len = text.len()))]
    async fn classify(&self, text: &str) -> Result<Sentiment, SentimentError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&ClassifyRequest { inputs: text });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "sentiment service rejected request");
            return Err(SentimentError::Status(status));
        }

        let body: ClassifyResponse = response.json().await?;
        let best = body.best().ok_or(SentimentError::EmptyResponse)?;
        tracing::debug!(label = %best.label, score = best.score, "classified review");
        Ok(Sentiment { label: best.label })
    }
}

/// Classifier for the configured endpoint, or [`StaticSentiment`] with
/// [`UNCLASSIFIED`] when none is set.
pub fn from_config(config: &SentimentConfig) -> anyhow::Result<Arc<dyn SentimentClassifier>> {
    match &config.api_url {
        Some(url) => {
            tracing::info!(url = %url, "using remote sentiment classifier");
            let classifier = HttpSentimentClassifier::new(
                url.clone(),
                config.api_token.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(classifier))
        }
        None => {
            tracing::warn!("SENTIMENT_API_URL not set, reviews will be stored as {UNCLASSIFIED}");
            Ok(Arc::new(StaticSentiment::new(UNCLASSIFIED)))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, http::StatusCode, routing::post};

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/classify")
    }

    #[test]
    fn picks_highest_score_from_either_shape() {
        let batched: ClassifyResponse = serde_json::from_value(serde_json::json!([[
            {"label": "NEGATIVE", "score": 0.1},
            {"label": "POSITIVE", "score": 0.9}
        ]]))
        .unwrap();
        assert_eq!(batched.best().unwrap().label, "POSITIVE");

        let flat: ClassifyResponse = serde_json::from_value(serde_json::json!([
            {"label": "NEGATIVE", "score": 0.7},
            {"label": "POSITIVE", "score": 0.3}
        ]))
        .unwrap();
        assert_eq!(flat.best().unwrap().label, "NEGATIVE");

        let empty: ClassifyResponse = serde_json::from_value(serde_json::json!([])).unwrap();
        assert!(empty.best().is_none());
    }

    #[tokio::test]
    async fn static_classifier_returns_its_label() {
        let classifier = StaticSentiment::new("POSITIVE");
        let sentiment = classifier.classify("great product").await.unwrap();
        assert_eq!(sentiment.label, "POSITIVE");
    }

    #[tokio::test]
    async fn http_classifier_posts_inputs_and_reads_label() {
        let app = Router::new().route(
            "/classify",
            post(|Json(body): Json<serde_json::Value>| async move {
                let text = body["inputs"].as_str().unwrap_or_default().to_string();
                let label = if text.contains("broken") { "NEGATIVE" } else { "POSITIVE" };
                Json(serde_json::json!([[{"label": label, "score": 0.98}]]))
            }),
        );
        let url = serve(app).await;
        let classifier =
            HttpSentimentClassifier::new(url, Some("token".into()), Duration::from_secs(5))
                .unwrap();

        let sentiment = classifier.classify("arrived broken").await.unwrap();
        assert_eq!(sentiment.label, "NEGATIVE");
    }

    #[tokio::test]
    async fn http_classifier_surfaces_error_status() {
        let app = Router::new().route(
            "/classify",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let url = serve(app).await;
        let classifier = HttpSentimentClassifier::new(url, None, Duration::from_secs(5)).unwrap();

        let err = classifier.classify("anything").await.unwrap_err();
        assert!(matches!(err, SentimentError::Status(s) if s == StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn missing_url_falls_back_to_static_label() {
        let config = SentimentConfig {
            api_url: None,
            api_token: None,
            timeout_secs: 1,
        };
        assert!(from_config(&config).is_ok());
    }
}
