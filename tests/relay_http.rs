mod common;

use asker::{config::AppConfig, create_router, RelayState};
use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use common::{spawn_downstream, unreachable_url, ANSWER};
use serde_json::{json, Value};
use tower::ServiceExt;

const ALLOWED: &str = "https://ask.example";

fn relay_for(downstream_url: &str) -> Router {
    let mut config = AppConfig::with_downstream(downstream_url);
    config.cors.allowed_origins = vec![ALLOWED.to_string()];
    let state = RelayState::from_config(&config).expect("relay state");
    create_router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<&str>,
) -> (StatusCode, HeaderMap, String) {
    let mut request_builder = Request::builder().method(method).uri(uri);
    for (key, value) in headers {
        request_builder = request_builder.header(*key, *value);
    }

    let request = match body {
        Some(payload) => request_builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("failed to build json request"),
        None => request_builder
            .body(Body::empty())
            .expect("failed to build empty request"),
    };

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router request failed");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");

    (status, headers, String::from_utf8_lossy(&bytes).to_string())
}

fn json_body(body: &str) -> Value {
    serde_json::from_str(body).expect("response body is JSON")
}

#[tokio::test]
async fn relays_body_and_returns_downstream_json_verbatim() {
    // Key order and number formatting must survive the relay
    let reply = r#"{"trace":"abc","score":1.50,"content":{"title":"T","shortResponse":"S","longResponse":"L"},"internet_search":true}"#;
    let server = spawn_downstream(StatusCode::OK, reply).await;
    let app = relay_for(&server.url);

    let (status, headers, body) = send(
        &app,
        Method::POST,
        "/api/data",
        &[],
        Some(r#"{"text":"kako poslati sliku"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(body, reply);
    assert_eq!(server.downstream.calls(), 1);
    assert_eq!(
        server.downstream.bodies(),
        vec![json!({ "text": "kako poslati sliku" })]
    );
}

#[tokio::test]
async fn first_forwarded_for_entry_is_sent_downstream() {
    let server = spawn_downstream(StatusCode::OK, ANSWER).await;
    let app = relay_for(&server.url);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/data",
        &[("x-forwarded-for", "1.2.3.4, 5.6.7.8")],
        Some(r#"{"text":"q"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        server.downstream.forwarded_for(),
        vec![Some("1.2.3.4".to_string())]
    );
}

#[tokio::test]
async fn unknown_client_address_is_not_invented() {
    let server = spawn_downstream(StatusCode::OK, ANSWER).await;
    let app = relay_for(&server.url);

    let (status, _, _) = send(&app, Method::POST, "/api/data", &[], Some(r#"{"text":"q"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.downstream.forwarded_for(), vec![None]);
}

#[tokio::test]
async fn disallowed_origin_is_rejected_before_any_downstream_call() {
    let server = spawn_downstream(StatusCode::OK, ANSWER).await;
    let app = relay_for(&server.url);

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/data",
        &[("origin", "https://evil.example")],
        Some(r#"{"text":"q"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json_body(&body), json!({ "message": "Origin not allowed" }));
    assert_eq!(server.downstream.calls(), 0);
}

#[tokio::test]
async fn allowed_origin_is_echoed_on_the_response() {
    let server = spawn_downstream(StatusCode::OK, ANSWER).await;
    let app = relay_for(&server.url);

    let (status, headers, _) = send(
        &app,
        Method::POST,
        "/api/data",
        &[("origin", ALLOWED)],
        Some(r#"{"text":"q"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["access-control-allow-origin"], ALLOWED);
    assert_eq!(headers["vary"], "Origin");
}

#[tokio::test]
async fn preflight_is_answered_by_the_guard() {
    let server = spawn_downstream(StatusCode::OK, ANSWER).await;
    let app = relay_for(&server.url);

    let (status, headers, _) = send(
        &app,
        Method::OPTIONS,
        "/api/data",
        &[
            ("origin", ALLOWED),
            ("access-control-request-method", "POST"),
            ("access-control-request-headers", "Content-Type"),
        ],
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(headers["access-control-allow-origin"], ALLOWED);
    assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "content-type");
    assert_eq!(server.downstream.calls(), 0);
}

#[tokio::test]
async fn preflight_rejects_unlisted_method_and_header() {
    let server = spawn_downstream(StatusCode::OK, ANSWER).await;
    let app = relay_for(&server.url);

    let (status, _, body) = send(
        &app,
        Method::OPTIONS,
        "/api/data",
        &[
            ("origin", ALLOWED),
            ("access-control-request-method", "DELETE"),
        ],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(&body)["message"], "Method not allowed");

    let (status, _, body) = send(
        &app,
        Method::OPTIONS,
        "/api/data",
        &[
            ("origin", ALLOWED),
            ("access-control-request-method", "POST"),
            ("access-control-request-headers", "content-type, x-api-key"),
        ],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json_body(&body)["message"], "Header not allowed");
}

#[tokio::test]
async fn downstream_error_status_is_mirrored_without_its_body() {
    let server = spawn_downstream(StatusCode::SERVICE_UNAVAILABLE, r#"{"secret":"stack"}"#).await;
    let app = relay_for(&server.url);

    let (status, _, body) = send(&app, Method::POST, "/api/data", &[], Some(r#"{"text":"q"}"#)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(&body), json!({ "message": "Error fetching data" }));
    assert_eq!(server.downstream.calls(), 1);
}

#[tokio::test]
async fn unreachable_downstream_is_a_relay_fault() {
    let app = relay_for(&unreachable_url().await);

    let (status, _, body) = send(&app, Method::POST, "/api/data", &[], Some(r#"{"text":"q"}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(&body);
    assert_eq!(body["message"], "Internal server error");
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn malformed_downstream_answer_is_a_relay_fault() {
    for reply in ["not json at all", r#"{"content":{"title":1}}"#, r#"{"title":"T"}"#] {
        let server = spawn_downstream(StatusCode::OK, reply).await;
        let app = relay_for(&server.url);

        let (status, _, body) =
            send(&app, Method::POST, "/api/data", &[], Some(r#"{"text":"q"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "reply: {reply}");
        assert_eq!(json_body(&body)["message"], "Internal server error");
    }
}

#[tokio::test]
async fn invalid_inbound_json_is_a_bad_request() {
    let server = spawn_downstream(StatusCode::OK, ANSWER).await;
    let app = relay_for(&server.url);

    let (status, _, body) = send(&app, Method::POST, "/api/data", &[], Some("{text:")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = json_body(&body);
    assert_eq!(body["message"], "Invalid JSON format");
    assert!(body["error"].is_string());

    let (status, _, _) = send(&app, Method::POST, "/api/data", &[], Some(r#"{"query":"q"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(server.downstream.calls(), 0);
}

#[tokio::test]
async fn other_methods_and_paths_are_refused() {
    let server = spawn_downstream(StatusCode::OK, ANSWER).await;
    let app = relay_for(&server.url);

    let (status, _, body) = send(&app, Method::GET, "/api/data", &[], None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(&body)["message"], "Method not allowed");

    let (status, _, body) = send(&app, Method::GET, "/nope", &[], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body)["message"], "Not found");

    assert_eq!(server.downstream.calls(), 0);
}

#[tokio::test]
async fn health_reports_ok() {
    let server = spawn_downstream(StatusCode::OK, ANSWER).await;
    let app = relay_for(&server.url);

    let (status, _, body) = send(&app, Method::GET, "/health", &[], None).await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["status"], "ok");
    assert!(body["uptime_secs"].as_i64().is_some());
}
