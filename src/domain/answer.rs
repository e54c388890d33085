//! Answer payload returned by the downstream answer service
//!
//! The downstream wraps the answer in a `content` object:
//! `{ "content": { "title", "shortResponse", "longResponse" }, "internet_search"? }`.
//! Older deployments emit the keys in lowercase (`shortresponse`,
//! `longresponse`); both spellings are accepted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured answer to a single query.
///
/// `long_response` may carry markup. It is kept verbatim here; turning it
/// into something safe to display is the renderer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    pub title: String,
    #[serde(alias = "shortresponse")]
    pub short_response: String,
    #[serde(alias = "longresponse")]
    pub long_response: String,
    /// Whether the answer service consulted a web search
    #[serde(default, rename = "internet_search")]
    pub internet_search: bool,
}

/// Outcome of checking a downstream body against the expected shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerCheck {
    Valid(AnswerPayload),
    Invalid(String),
}

#[derive(Deserialize)]
struct Envelope {
    content: Option<Value>,
    #[serde(default)]
    internet_search: bool,
}

impl AnswerCheck {
    pub fn into_result(self) -> std::result::Result<AnswerPayload, String> {
        match self {
            Self::Valid(payload) => Ok(payload),
            Self::Invalid(reason) => Err(reason),
        }
    }
}

impl AnswerPayload {
    /// Validate a downstream response body
    pub fn check(body: &Value) -> AnswerCheck {
        if !body.is_object() {
            return AnswerCheck::Invalid("response body is not a JSON object".to_string());
        }

        let envelope = match Envelope::deserialize(body) {
            Ok(envelope) => envelope,
            Err(e) => return AnswerCheck::Invalid(format!("unexpected response shape: {e}")),
        };

        let Some(content) = envelope.content else {
            return AnswerCheck::Invalid("response is missing `content`".to_string());
        };

        match AnswerPayload::deserialize(&content) {
            Ok(mut payload) => {
                payload.internet_search |= envelope.internet_search;
                AnswerCheck::Valid(payload)
            }
            Err(e) => AnswerCheck::Invalid(format!("invalid `content`: {e}")),
        }
    }

    /// Parse raw bytes and validate them in one step
    pub fn check_bytes(bytes: &[u8]) -> AnswerCheck {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(body) => Self::check(&body),
            Err(e) => AnswerCheck::Invalid(format!("response is not valid JSON: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case_payload_is_valid() {
        let body = json!({
            "content": { "title": "T", "shortResponse": "S", "longResponse": "L" }
        });
        let AnswerCheck::Valid(payload) = AnswerPayload::check(&body) else {
            panic!("expected valid payload");
        };
        assert_eq!(payload.title, "T");
        assert_eq!(payload.short_response, "S");
        assert_eq!(payload.long_response, "L");
        assert!(!payload.internet_search);
    }

    #[test]
    fn test_lowercase_keys_and_search_flag() {
        let body = json!({
            "content": { "title": "T", "shortresponse": "S", "longresponse": "<p>L</p>" },
            "internet_search": true
        });
        let payload = AnswerPayload::check(&body).into_result().unwrap();
        assert_eq!(payload.long_response, "<p>L</p>");
        assert!(payload.internet_search);
    }

    #[test]
    fn test_missing_content_is_invalid() {
        let check = AnswerPayload::check(&json!({ "received": "hello" }));
        assert_eq!(
            check,
            AnswerCheck::Invalid("response is missing `content`".to_string())
        );
    }

    #[test]
    fn test_missing_field_is_invalid() {
        let body = json!({ "content": { "title": "T", "shortResponse": "S" } });
        let reason = AnswerPayload::check(&body).into_result().unwrap_err();
        assert!(reason.contains("longResponse"), "got: {reason}");
    }

    #[test]
    fn test_non_object_and_non_json() {
        assert!(matches!(
            AnswerPayload::check(&json!([1, 2])),
            AnswerCheck::Invalid(_)
        ));
        assert!(matches!(
            AnswerPayload::check_bytes(b"<html>oops</html>"),
            AnswerCheck::Invalid(_)
        ));
    }
}
