//! Presence store abstraction and SQLite implementation.
//!
//! This crate provides the local durable cache of reconciled entities:
//! - Tenants, users, lines, sessions and devices
//! - Chat rooms with their fixed two-member constraint
//! - Phase-scoped transaction control used by the reconciliation engine

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{PresenceStore, SqliteStore};

use presenced_core::config::StoreConfig;
use std::sync::Arc;

/// Create a presence store from configuration, verifying connectivity.
pub async fn from_config(config: &StoreConfig) -> StoreResult<Arc<dyn PresenceStore>> {
    let store = SqliteStore::new(&config.path).await?;
    store.health_check().await?;
    Ok(Arc::new(store) as Arc<dyn PresenceStore>)
}
