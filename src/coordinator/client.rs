//! Answer source seam between the coordinator and the network

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::ClientConfig;
use crate::domain::AnswerPayload;
use crate::error::{AskerError, Result};

/// Something that turns query text into an answer.
///
/// The coordinator only ever talks to the network through this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnswerSource: Send + Sync {
    async fn fetch(&self, text: &str) -> Result<AnswerPayload>;
}

#[derive(Serialize)]
struct QueryBody<'a> {
    text: &'a str,
}

/// Answer source that POSTs `{ "text": ... }` to a relay endpoint
pub struct RelayClient {
    http: Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AskerError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.endpoint, Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnswerSource for RelayClient {
    async fn fetch(&self, text: &str) -> Result<AnswerPayload> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&QueryBody { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "relay returned non-success status");
            return Err(AskerError::Upstream {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        AnswerPayload::check_bytes(&bytes)
            .into_result()
            .map_err(AskerError::MalformedResponse)
    }
}
