pub mod cli;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod relay;
pub mod render;

pub use config::AppConfig;
pub use coordinator::{
    AnswerSource, QueryCoordinator, QueryPhase, QueryState, QueryStatus, QueryWatcher,
    RelayClient,
};
pub use domain::{AnswerCheck, AnswerPayload};
pub use error::{AskerError, Result};
pub use relay::{create_router, OriginPolicy, Relay, RelayState};
