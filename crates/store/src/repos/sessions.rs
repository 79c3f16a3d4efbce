//! Session repository trait.

use crate::error::StoreResult;
use crate::models::SessionRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for session operations.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// List sessions, optionally scoped to a set of tenants.
    async fn list_sessions(&self, tenant_uuids: Option<&[Uuid]>) -> StoreResult<Vec<SessionRow>>;

    /// Get a session by uuid.
    async fn get_session(&self, uuid: Uuid) -> StoreResult<Option<SessionRow>>;

    /// Create a new session. The referenced user must already exist.
    async fn create_session(&self, session: &SessionRow) -> StoreResult<()>;

    /// Delete a session by uuid. Returns false if it was already gone.
    async fn delete_session(&self, uuid: Uuid) -> StoreResult<bool>;
}
