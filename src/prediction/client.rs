use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::types::{Prediction, PredictionRequest, PredictionResponse};
use crate::config::ModelServiceConfig;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Prediction service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Prediction service returned HTTP {0}")]
    Status(StatusCode),
    #[error("Invalid prediction response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of classification results for a piece of (translated) text
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, text: &str) -> Result<Vec<Prediction>, PredictionError>;
}

/// HTTP client for the `/predict` endpoint
#[derive(Debug, Clone)]
pub struct PredictionClient {
    client: Client,
    url: String,
}

impl PredictionClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }

    pub fn from_config(config: &ModelServiceConfig) -> reqwest::Result<Self> {
        Self::new(&config.url, config.timeout())
    }
}

#[async_trait]
impl Predictor for PredictionClient {
    async fn predict(&self, text: &str) -> Result<Vec<Prediction>, PredictionError> {
        let request = PredictionRequest {
            text: text.to_string(),
        };

        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(PredictionError::Status(status));
        }

        let body = response.bytes().await?;
        let parsed: PredictionResponse = serde_json::from_slice(&body)?;
        debug!("Prediction service returned {} result(s)", parsed.result.len());
        Ok(parsed.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn client_for(router: Router) -> PredictionClient {
        let base = spawn_server(router).await;
        PredictionClient::new(format!("{}/predict", base), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn posts_text_and_parses_result() {
        let client = client_for(Router::new().route(
            "/predict",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body, json!({"text": "I am constantly sad"}));
                Json(json!({"result": [{"label": "moderate", "score": 0.82}]}))
            }),
        ))
        .await;

        let result = client.predict("I am constantly sad").await.unwrap();
        assert_eq!(result, vec![Prediction::new("moderate", 0.82)]);
    }

    #[tokio::test]
    async fn string_scores_are_normalised() {
        let client = client_for(Router::new().route(
            "/predict",
            post(|| async { Json(json!({"result": [{"label": "severe", "score": "0.91"}]})) }),
        ))
        .await;

        let result = client.predict("text").await.unwrap();
        assert_eq!(result[0].score, 0.91);
    }

    #[tokio::test]
    async fn non_200_status_is_reported() {
        let client = client_for(Router::new().route(
            "/predict",
            post(|| async { axum::http::StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let err = client.predict("text").await.unwrap_err();
        assert!(matches!(err, PredictionError::Status(s) if s == StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn invalid_score_is_a_decode_error() {
        let client = client_for(Router::new().route(
            "/predict",
            post(|| async { Json(json!({"result": [{"label": "severe", "score": 91}]})) }),
        ))
        .await;

        let err = client.predict("text").await.unwrap_err();
        assert!(matches!(err, PredictionError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let client = PredictionClient::new("http://127.0.0.1:1/predict", Duration::from_secs(5)).unwrap();
        let err = client.predict("text").await.unwrap_err();
        assert!(matches!(err, PredictionError::Transport(_)));
    }
}
