use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::relay::origin::Rejection;

/// Main error type for the relay and the query coordinator
#[derive(Error, Debug)]
pub enum AskerError {
    // Origin guard errors
    #[error("Request rejected: {0}")]
    ValidationRejected(Rejection),

    // Inbound request errors
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        detail: Option<String>,
    },

    // Downstream errors
    #[error("Downstream returned status {status}")]
    Upstream { status: u16 },

    #[error("Relay fault: {0}")]
    RelayFault(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for AskerError
pub type Result<T> = std::result::Result<T, AskerError>;

/// JSON error body returned by every failing relay path
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }

    pub fn with_error(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: Some(error.into()),
        }
    }
}

impl AskerError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            detail: None,
        }
    }

    /// Whether this error was caused by the caller rather than the relay or downstream
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ValidationRejected(_) | Self::BadRequest { .. })
    }

    /// HTTP status and body the relay answers with for this error.
    ///
    /// Downstream error bodies are never included; transport causes are
    /// passed through in `error` for diagnostics only.
    pub fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            Self::ValidationRejected(rejection) => {
                (rejection.status(), ErrorBody::new(rejection.message()))
            }
            Self::BadRequest { message, detail } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    message: message.clone(),
                    error: detail.clone(),
                },
            ),
            Self::Upstream { status } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                ErrorBody::new("Error fetching data"),
            ),
            Self::RelayFault(cause) | Self::MalformedResponse(cause) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::with_error("Internal server error", cause.clone()),
            ),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::with_error("Internal server error", other.to_string()),
            ),
        }
    }
}

impl IntoResponse for AskerError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
