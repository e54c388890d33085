//! Query Coordinator: single-slot owner of the active query
//!
//! Every `submit` and `clear` bumps a request token. A response is applied
//! only while its token is still current, so only the latest `submit` can
//! ever settle the slot and nothing settles it after `clear`. Cancellation
//! is logical: superseded requests run to completion and are discarded.
//!
//! The token and the state live together inside a `watch` channel, so the
//! token check and the state write happen in one critical section and
//! every change is published to subscribers.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::AskerError;

use super::client::AnswerSource;
use super::state::{QueryPhase, QueryState};

#[derive(Debug, Default)]
struct Slot {
    token: u64,
    state: QueryState,
}

/// Owner of the single live query; the only way to mutate query state.
#[derive(Clone)]
pub struct QueryCoordinator {
    source: Arc<dyn AnswerSource>,
    slot: Arc<watch::Sender<Slot>>,
}

impl QueryCoordinator {
    pub fn new(source: Arc<dyn AnswerSource>) -> Self {
        let (tx, _) = watch::channel(Slot::default());
        Self {
            source,
            slot: Arc::new(tx),
        }
    }

    /// Start a query for `text`, superseding any outstanding one.
    ///
    /// The slot turns `Pending` before this returns. The returned handle
    /// resolves once the request has finished, whether or not its result
    /// was applied; callers are free to drop it.
    pub fn submit(&self, text: impl Into<String>) -> JoinHandle<()> {
        let text = text.into();
        let mut token = 0;
        self.slot.send_modify(|slot| {
            slot.token += 1;
            token = slot.token;
            slot.state = QueryState::pending(text.clone());
        });
        debug!(token, "query submitted");

        let source = Arc::clone(&self.source);
        let slot = Arc::clone(&self.slot);
        tokio::spawn(async move {
            let phase = match source.fetch(&text).await {
                Ok(answer) => QueryPhase::Succeeded(answer),
                Err(e) => QueryPhase::Failed(failure_detail(&e)),
            };

            let applied = slot.send_if_modified(|current| {
                if current.token != token {
                    return false;
                }
                current.state.settle(phase);
                true
            });

            if applied {
                debug!(token, "query settled");
            } else {
                debug!(token, "discarding response for superseded query");
            }
        })
    }

    /// Reset to the empty idle state; late responses are discarded.
    pub fn clear(&self) {
        self.slot.send_modify(|slot| {
            slot.token += 1;
            slot.state = QueryState::default();
        });
        debug!("query cleared");
    }

    pub fn snapshot(&self) -> QueryState {
        self.slot.borrow().state.clone()
    }

    pub fn subscribe(&self) -> QueryWatcher {
        QueryWatcher {
            rx: self.slot.subscribe(),
        }
    }
}

/// Read-only view that wakes on every snapshot change
pub struct QueryWatcher {
    rx: watch::Receiver<Slot>,
}

impl QueryWatcher {
    pub fn current(&self) -> QueryState {
        self.rx.borrow().state.clone()
    }

    /// Wait for the next change; `None` once the coordinator is gone
    pub async fn changed(&mut self) -> Option<QueryState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().state.clone())
    }

    /// Wait until no request is outstanding
    pub async fn settled(&mut self) -> Option<QueryState> {
        loop {
            let state = self.rx.borrow_and_update().state.clone();
            if state.status().is_settled() {
                return Some(state);
            }
            self.rx.changed().await.ok()?;
        }
    }
}

/// Human-readable cause shown to the user for a failed query
fn failure_detail(e: &AskerError) -> String {
    match e {
        AskerError::Upstream { status } => format!("Failed to fetch data (status {status})"),
        AskerError::Http(err) if err.is_timeout() => {
            "The request timed out before an answer arrived".to_string()
        }
        AskerError::Http(err) => format!("Could not reach the answer service: {err}"),
        AskerError::MalformedResponse(reason) => {
            format!("Received an unexpected response: {reason}")
        }
        other => other.to_string(),
    }
}
