//! Origin guard: CORS allow-list enforcement in front of the relay
//!
//! The policy is built once from configuration at startup and shared
//! read-only across every request.

use axum::http::StatusCode;
use std::fmt;

use crate::config::CorsConfig;

const WILDCARD: &str = "*";

/// What part of the request failed the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Origin,
    Method,
    Header,
}

/// A denied request, carrying the offending value for logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub value: String,
}

impl Rejection {
    fn new(kind: RejectionKind, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            RejectionKind::Method => StatusCode::METHOD_NOT_ALLOWED,
            RejectionKind::Origin | RejectionKind::Header => StatusCode::FORBIDDEN,
        }
    }

    pub fn message(&self) -> &'static str {
        match self.kind {
            RejectionKind::Origin => "Origin not allowed",
            RejectionKind::Method => "Method not allowed",
            RejectionKind::Header => "Header not allowed",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (`{}`)", self.message(), self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Rejected(Rejection),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Process-wide CORS policy: allowed origins, methods and request headers
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    any_origin: bool,
    origins: Vec<String>,
    methods: Vec<String>,
    headers: Vec<String>,
}

fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

impl OriginPolicy {
    pub fn new<O, M, H>(origins: O, methods: M, headers: H) -> Self
    where
        O: IntoIterator,
        O::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: AsRef<str>,
        H: IntoIterator,
        H::Item: AsRef<str>,
    {
        let mut any_origin = false;
        let mut normalized = Vec::new();
        for origin in origins {
            let origin = origin.as_ref().trim();
            if origin == WILDCARD {
                any_origin = true;
            } else if !origin.is_empty() {
                normalized.push(normalize_origin(origin));
            }
        }

        let mut methods: Vec<String> = methods
            .into_iter()
            .map(|m| m.as_ref().trim().to_ascii_uppercase())
            .filter(|m| !m.is_empty())
            .collect();
        if !methods.iter().any(|m| m == "OPTIONS") {
            methods.push("OPTIONS".to_string());
        }

        Self {
            any_origin,
            origins: normalized,
            methods,
            headers: headers
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &CorsConfig) -> Self {
        Self::new(
            &config.allowed_origins,
            &config.allowed_methods,
            &config.allowed_headers,
        )
    }

    pub fn allows_any_origin(&self) -> bool {
        self.any_origin
    }

    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.any_origin || self.origins.contains(&normalize_origin(origin))
    }

    pub fn method_allowed(&self, method: &str) -> bool {
        let method = method.trim();
        self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }

    pub fn header_allowed(&self, header: &str) -> bool {
        let header = header.trim();
        self.headers.iter().any(|h| h.eq_ignore_ascii_case(header))
    }

    /// Evaluate a request against the policy.
    ///
    /// Checks run in order origin, method, headers; the first failure wins.
    pub fn authorize<I, S>(&self, origin: &str, method: &str, headers: I) -> Decision
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.origin_allowed(origin) {
            return Decision::Rejected(Rejection::new(RejectionKind::Origin, origin));
        }
        if !self.method_allowed(method) {
            return Decision::Rejected(Rejection::new(RejectionKind::Method, method));
        }
        for header in headers {
            let header = header.as_ref();
            if !header.trim().is_empty() && !self.header_allowed(header) {
                return Decision::Rejected(Rejection::new(RejectionKind::Header, header));
            }
        }
        Decision::Allowed
    }

    /// Value for `Access-Control-Allow-Origin` given an authorized origin
    pub fn allow_origin_value(&self, origin: &str) -> String {
        if self.any_origin {
            WILDCARD.to_string()
        } else {
            origin.trim().to_string()
        }
    }

    /// Value for `Access-Control-Allow-Methods`
    pub fn allow_methods_value(&self) -> String {
        self.methods.join(", ")
    }

    /// Value for `Access-Control-Allow-Headers`
    pub fn allow_headers_value(&self) -> String {
        self.headers.join(", ")
    }
}

/// Split a comma-separated header list such as `Access-Control-Request-Headers`
pub fn split_header_list(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
