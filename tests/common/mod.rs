#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use serde_json::Value;
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tokio::{net::TcpListener, sync::oneshot};

pub const ANSWER: &str = r#"{"content":{"title":"T","shortResponse":"S","longResponse":"<p>L</p>"},"internet_search":false}"#;

/// Answer service stand-in that records what the relay sent it
#[derive(Clone)]
pub struct Downstream {
    calls: Arc<AtomicUsize>,
    forwarded_for: Arc<Mutex<Vec<Option<String>>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
    status: StatusCode,
    reply: String,
}

impl Downstream {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn forwarded_for(&self) -> Vec<Option<String>> {
        self.forwarded_for.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }
}

async fn answer(
    State(downstream): State<Downstream>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(axum::http::HeaderName, &'static str); 1], String) {
    downstream.calls.fetch_add(1, Ordering::SeqCst);
    downstream.forwarded_for.lock().unwrap().push(
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    if let Ok(body) = serde_json::from_slice(&body) {
        downstream.bodies.lock().unwrap().push(body);
    }

    (
        downstream.status,
        [(CONTENT_TYPE, "application/json")],
        downstream.reply.clone(),
    )
}

pub struct RunningDownstream {
    pub url: String,
    pub downstream: Downstream,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for RunningDownstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Serve a downstream on an ephemeral port answering every POST with `status` and `reply`
pub async fn spawn_downstream(status: StatusCode, reply: &str) -> RunningDownstream {
    let downstream = Downstream {
        calls: Arc::new(AtomicUsize::new(0)),
        forwarded_for: Arc::new(Mutex::new(Vec::new())),
        bodies: Arc::new(Mutex::new(Vec::new())),
        status,
        reply: reply.to_string(),
    };

    let app = Router::new()
        .route("/", post(answer))
        .with_state(downstream.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind downstream listener");
    let addr = listener.local_addr().expect("downstream local addr");
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await;
    });

    RunningDownstream {
        url: format!("http://{addr}/"),
        downstream,
        shutdown: Some(tx),
    }
}

/// An address nothing listens on
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr: SocketAddr = listener.local_addr().expect("throwaway local addr");
    drop(listener);
    format!("http://{addr}/")
}
