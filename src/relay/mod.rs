//! Relay: origin-guarded HTTP proxy in front of the answer service
//!
//! `POST /api/data` passes the origin guard, is forwarded downstream with the
//! caller's address in `X-Forwarded-For`, and answers with the downstream JSON
//! verbatim or a structured `{ message, error? }` body.

pub mod forward;
pub mod handlers;
pub mod origin;
pub mod routes;
pub mod server;
pub mod state;

pub use forward::{client_address, ProxyRequest, Relay, RelayedAnswer, FORWARDED_FOR};
pub use origin::{Decision, OriginPolicy, Rejection, RejectionKind};
pub use routes::create_router;
pub use server::{serve, start_relay_server};
pub use state::RelayState;
