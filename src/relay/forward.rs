//! Forwarding of a single query to the downstream answer service

use axum::body::Bytes;
use axum::http::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::DownstreamConfig;
use crate::domain::{AnswerCheck, AnswerPayload};
use crate::error::{AskerError, Result};

/// Header carrying the originating client's address, read inbound and re-sent downstream
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// One inbound query, as handed to the relay
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    /// Inbound JSON body, forwarded unchanged
    pub body: Value,
    /// Address injected as `X-Forwarded-For`; omitted when unknown
    pub source_address: Option<String>,
}

/// Downstream answer plus the exact bytes it arrived in
#[derive(Debug, Clone)]
pub struct RelayedAnswer {
    pub answer: AnswerPayload,
    pub raw: Bytes,
}

/// Resolve the true client address.
///
/// The first entry of `X-Forwarded-For` wins; otherwise the transport peer's IP.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(first) => Some(first.to_string()),
        None => peer.map(|addr| addr.ip().to_string()),
    }
}

/// Stateless forwarder to the configured downstream endpoint
#[derive(Clone)]
pub struct Relay {
    http: Client,
    endpoint: String,
}

impl Relay {
    pub fn new(config: &DownstreamConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("asker-relay/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AskerError::Internal(format!("failed to build relay HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.url.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Forward one query downstream.
    ///
    /// Exactly one attempt is made. A non-success status becomes
    /// `Upstream` with the body dropped; transport failures become
    /// `RelayFault`; a body that is not JSON or lacks the answer shape
    /// becomes `MalformedResponse`.
    #[instrument(skip_all, fields(endpoint = %self.endpoint, ip = req.source_address.as_deref().unwrap_or("unknown")))]
    pub async fn forward(&self, req: ProxyRequest) -> Result<RelayedAnswer> {
        let mut call = self.http.post(&self.endpoint).json(&req.body);
        if let Some(address) = req.source_address.as_deref() {
            call = call.header(FORWARDED_FOR, address);
        }

        let response = call.send().await.map_err(describe_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "downstream returned non-success status");
            return Err(AskerError::Upstream {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(describe_transport_error)?;
        let body: Value = serde_json::from_slice(&bytes).map_err(|e| {
            AskerError::MalformedResponse(format!("downstream body is not valid JSON: {e}"))
        })?;

        match AnswerPayload::check(&body) {
            AnswerCheck::Valid(answer) => {
                debug!(title = %answer.title, "downstream answer received");
                Ok(RelayedAnswer { answer, raw: bytes })
            }
            AnswerCheck::Invalid(reason) => Err(AskerError::MalformedResponse(reason)),
        }
    }
}

fn describe_transport_error(e: reqwest::Error) -> AskerError {
    let cause = if e.is_timeout() {
        format!("downstream request timed out: {e}")
    } else if e.is_connect() {
        format!("failed to connect to downstream: {e}")
    } else {
        e.to_string()
    };
    AskerError::RelayFault(cause)
}
