//! Tenant repository trait.

use crate::error::StoreResult;
use crate::models::TenantRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for tenant operations.
#[async_trait]
pub trait TenantRepo: Send + Sync {
    /// List all tenants.
    async fn list_tenants(&self) -> StoreResult<Vec<TenantRow>>;

    /// Get a tenant by uuid.
    async fn get_tenant(&self, uuid: Uuid) -> StoreResult<Option<TenantRow>>;

    /// Create a new tenant.
    async fn create_tenant(&self, tenant: &TenantRow) -> StoreResult<()>;

    /// Delete a tenant by uuid. Returns false if it was already gone.
    async fn delete_tenant(&self, uuid: Uuid) -> StoreResult<bool>;

    /// Atomic insert-if-absent, returning the stored tenant either way.
    ///
    /// A single statement rather than check-then-insert, so a tenant appearing
    /// concurrently (HTTP layer, or between two snapshot fetches) cannot race
    /// the reconciliation engine into a duplicate-key failure.
    async fn find_or_create_tenant(&self, uuid: Uuid) -> StoreResult<TenantRow>;
}
