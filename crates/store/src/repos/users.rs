//! User repository trait.

use crate::error::StoreResult;
use crate::models::UserRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for user operations.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// List users, optionally scoped to a set of tenants.
    ///
    /// `None` means no tenant filter; an empty slice matches nothing.
    async fn list_users(&self, tenant_uuids: Option<&[Uuid]>) -> StoreResult<Vec<UserRow>>;

    /// Get a user by uuid within a tenant scope.
    async fn get_user(&self, tenant_uuid: Uuid, uuid: Uuid) -> StoreResult<Option<UserRow>>;

    /// Create a new user. The referenced tenant must already exist.
    async fn create_user(&self, user: &UserRow) -> StoreResult<()>;

    /// Delete a user by uuid within a tenant scope, cascading to its lines
    /// and sessions. Returns false if the user was already gone.
    async fn delete_user(&self, tenant_uuid: Uuid, uuid: Uuid) -> StoreResult<bool>;

    /// Update a user's presence state.
    async fn update_user_state(&self, uuid: Uuid, state: &str) -> StoreResult<()>;
}
