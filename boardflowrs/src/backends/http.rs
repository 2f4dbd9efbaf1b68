use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{DataBackend, Rows};
use crate::config::BackendConfig;
use crate::error::{BoardflowError, Result};
use crate::request::{AggregateRequest, DistinctRequest, RawRequest};

/// HTTP client for the dashboard data endpoints.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| BoardflowError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| BoardflowError::Transport(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            // Non-2xx responses carry `{ "error": string }` when the backend
            // produced them; fall back to the status line otherwise.
            #[derive(serde::Deserialize)]
            struct ErrorBody {
                error: String,
            }
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(BoardflowError::Transport(format!("{path}: {message}")));
        }

        let parsed = response
            .json()
            .await
            .map_err(|e| BoardflowError::Transport(format!("invalid response from {path}: {e}")))?;
        tracing::debug!(path, ms = started.elapsed().as_millis() as u64, "backend request");
        Ok(parsed)
    }
}

#[async_trait]
impl DataBackend for HttpBackend {
    async fn aggregate_data(&self, request: &AggregateRequest) -> Result<Rows> {
        self.post("/api/dashboard/aggregate-data", request).await
    }

    async fn raw_data(&self, request: &RawRequest) -> Result<Rows> {
        self.post("/api/dashboard/raw-data", request).await
    }

    async fn distinct_values(&self, request: &DistinctRequest) -> Result<Vec<Value>> {
        self.post("/api/dashboard/distinct-values", request).await
    }
}
