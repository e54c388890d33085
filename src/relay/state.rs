use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::relay::forward::Relay;
use crate::relay::origin::OriginPolicy;

/// Shared state for relay handlers.
///
/// Everything here is immutable after startup; cloning is cheap.
#[derive(Clone)]
pub struct RelayState {
    pub policy: Arc<OriginPolicy>,
    pub relay: Relay,
    pub started_at: DateTime<Utc>,
}

impl RelayState {
    pub fn new(policy: OriginPolicy, relay: Relay) -> Self {
        Self {
            policy: Arc::new(policy),
            relay,
            started_at: Utc::now(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            OriginPolicy::from_config(&config.cors),
            Relay::new(&config.downstream)?,
        ))
    }

    /// Get relay uptime in seconds
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
