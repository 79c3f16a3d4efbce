//! Presence service: reconciliation engine, readiness gate and query API.
//!
//! The service keeps a local queryable snapshot of presence for a
//! multi-tenant telephony platform. At startup the reconciliation engine
//! pulls full snapshots from the external authorities and converges the
//! local store; the HTTP layer refuses traffic until that first run
//! succeeds.

pub mod error;
pub mod handlers;
pub mod initiator;
pub mod readiness;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use initiator::{InitError, Initiator, RunStats};
pub use readiness::{spawn_initialization, ReadinessGate};
pub use routes::create_router;
pub use state::AppState;
