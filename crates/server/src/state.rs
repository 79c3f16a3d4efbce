//! Application state shared across handlers.

use crate::readiness::ReadinessGate;
use presenced_store::PresenceStore;
use std::sync::Arc;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PresenceStore>,
    pub readiness: ReadinessGate,
}

impl AppState {
    pub fn new(store: Arc<dyn PresenceStore>, readiness: ReadinessGate) -> Self {
        Self { store, readiness }
    }
}
