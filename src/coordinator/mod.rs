//! Query Coordinator
//!
//! Client-side owner of the single active query. Presentation reads
//! snapshots and issues `submit`/`clear`; it never touches the network.

pub mod client;
pub mod coordinator;
pub mod state;

pub use client::{AnswerSource, RelayClient};
pub use coordinator::{QueryCoordinator, QueryWatcher};
pub use state::{QueryPhase, QueryState, QueryStatus, QueryView};
