//! Query State: the single snapshot the coordinator exposes to presentation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::AnswerPayload;

/// Lifecycle stage of the current query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// No request is outstanding in this stage
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status together with the data only that status may carry,
/// so a result and an error can never coexist.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QueryPhase {
    #[default]
    Idle,
    Pending,
    Succeeded(AnswerPayload),
    Failed(String),
}

/// Snapshot of the coordinator's single query slot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryState {
    query: Option<String>,
    phase: QueryPhase,
}

impl QueryState {
    pub(crate) fn pending(text: String) -> Self {
        Self {
            query: Some(text),
            phase: QueryPhase::Pending,
        }
    }

    pub(crate) fn settle(&mut self, phase: QueryPhase) {
        self.phase = phase;
    }

    /// Last submitted text; `None` before any submission or after `clear`
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn phase(&self) -> &QueryPhase {
        &self.phase
    }

    pub fn status(&self) -> QueryStatus {
        match self.phase {
            QueryPhase::Idle => QueryStatus::Idle,
            QueryPhase::Pending => QueryStatus::Pending,
            QueryPhase::Succeeded(_) => QueryStatus::Succeeded,
            QueryPhase::Failed(_) => QueryStatus::Failed,
        }
    }

    pub fn result(&self) -> Option<&AnswerPayload> {
        match &self.phase {
            QueryPhase::Succeeded(answer) => Some(answer),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.phase {
            QueryPhase::Failed(detail) => Some(detail),
            _ => None,
        }
    }

    /// Flat `{query, status, result, errorDetail}` view for serialization
    pub fn view(&self) -> QueryView<'_> {
        QueryView {
            query: self.query(),
            status: self.status(),
            result: self.result(),
            error_detail: self.error_detail(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryView<'a> {
    pub query: Option<&'a str>,
    pub status: QueryStatus,
    pub result: Option<&'a AnswerPayload>,
    pub error_detail: Option<&'a str>,
}
