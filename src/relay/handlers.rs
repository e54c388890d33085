use axum::{
    body::Bytes,
    extract::{ConnectInfo, Request, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS,
            ACCESS_CONTROL_REQUEST_METHOD, ALLOW, CONTENT_TYPE, ORIGIN, USER_AGENT, VARY,
        },
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use tracing::{error, info, warn};

use crate::error::{AskerError, ErrorBody, Result};
use crate::relay::forward::{client_address, ProxyRequest};
use crate::relay::origin::{split_header_list, Decision, OriginPolicy};
use crate::relay::state::RelayState;

const PREFLIGHT_MAX_AGE_SECS: &str = "600";

fn header_str<'a>(headers: &'a HeaderMap, name: HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

fn apply_cors_headers(policy: &OriginPolicy, origin: &str, headers: &mut HeaderMap) {
    insert_header(
        headers,
        ACCESS_CONTROL_ALLOW_ORIGIN,
        &policy.allow_origin_value(origin),
    );
    headers.append(VARY, HeaderValue::from_static("Origin"));
}

/// Middleware guarding actual (non-preflight) cross-origin calls.
///
/// Requests without `Origin` are same-origin or non-browser and pass
/// through. Only origin and method are checked here; request headers are
/// declared and checked during preflight.
pub async fn origin_guard(State(state): State<RelayState>, request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let Some(origin) = header_str(request.headers(), ORIGIN).map(str::to_string) else {
        return next.run(request).await;
    };

    match state
        .policy
        .authorize(&origin, request.method().as_str(), std::iter::empty::<&str>())
    {
        Decision::Allowed => {
            let mut response = next.run(request).await;
            apply_cors_headers(&state.policy, &origin, response.headers_mut());
            response
        }
        Decision::Rejected(rejection) => {
            warn!(%rejection, path = %request.uri().path(), "cross-origin request rejected");
            AskerError::ValidationRejected(rejection).into_response()
        }
    }
}

/// OPTIONS /api/data -- answered entirely by the origin guard
pub async fn preflight(State(state): State<RelayState>, headers: HeaderMap) -> Response {
    let policy = &state.policy;

    let Some(origin) = header_str(&headers, ORIGIN) else {
        let mut response = StatusCode::NO_CONTENT.into_response();
        insert_header(response.headers_mut(), ALLOW, &policy.allow_methods_value());
        return response;
    };

    let method = header_str(&headers, ACCESS_CONTROL_REQUEST_METHOD).unwrap_or("OPTIONS");
    let requested_headers = header_str(&headers, ACCESS_CONTROL_REQUEST_HEADERS)
        .map(split_header_list)
        .unwrap_or_default();

    match policy.authorize(origin, method, requested_headers) {
        Decision::Allowed => {
            let mut response = StatusCode::NO_CONTENT.into_response();
            let out = response.headers_mut();
            apply_cors_headers(policy, origin, out);
            insert_header(out, ACCESS_CONTROL_ALLOW_METHODS, &policy.allow_methods_value());
            insert_header(out, ACCESS_CONTROL_ALLOW_HEADERS, &policy.allow_headers_value());
            insert_header(out, ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE_SECS);
            response
        }
        Decision::Rejected(rejection) => {
            warn!(%rejection, "preflight rejected");
            AskerError::ValidationRejected(rejection).into_response()
        }
    }
}

/// Parse the inbound body, keeping the original JSON for forwarding
fn parse_query_body(bytes: &[u8]) -> Result<(Value, String)> {
    let body: Value = serde_json::from_slice(bytes).map_err(|e| AskerError::BadRequest {
        message: "Invalid JSON format".to_string(),
        detail: Some(e.to_string()),
    })?;

    let text = body
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| AskerError::bad_request("Request body must contain a string `text` field"))?
        .to_string();

    Ok((body, text))
}

/// POST /api/data -- relay one query to the downstream answer service
pub async fn relay_query(
    State(state): State<RelayState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let source_address = client_address(&headers, peer.map(|ConnectInfo(addr)| addr));
    let ip = source_address.as_deref().unwrap_or("unknown");
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    info!(
        method = "POST",
        ip,
        user_agent,
        path = "/api/data",
        content_length = body.len(),
        "Incoming request"
    );

    let (payload, text) = parse_query_body(&body).inspect_err(|e| {
        warn!(ip, error = %e, "rejecting malformed query body");
    })?;
    info!(target: "asker::usage", ip, text = %text, "Received text");

    let request = ProxyRequest {
        body: payload,
        source_address: source_address.clone(),
    };

    match state.relay.forward(request).await {
        Ok(relayed) => {
            info!(target: "asker::usage", ip, title = %relayed.answer.title, "Relayed answer");
            Ok((
                [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                relayed.raw,
            )
                .into_response())
        }
        Err(e) => {
            match &e {
                AskerError::Upstream { status } => {
                    warn!(ip, status, "downstream signalled an error")
                }
                other => error!(ip, error = %other, "relay fault"),
            }
            Err(e)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: i64,
    pub timestamp: DateTime<Utc>,
}

/// GET /health -- liveness probe
pub async fn health(State(state): State<RelayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}

pub async fn method_not_allowed() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody::new("Method not allowed")),
    )
}

pub async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not found")))
}
