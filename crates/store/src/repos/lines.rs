//! Line repository trait.

use crate::error::StoreResult;
use crate::models::{DeviceRow, LineRow};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for line operations.
#[async_trait]
pub trait LineRepo: Send + Sync {
    /// List lines, optionally scoped to a set of tenants.
    async fn list_lines(&self, tenant_uuids: Option<&[Uuid]>) -> StoreResult<Vec<LineRow>>;

    /// Get a line by id.
    async fn get_line(&self, id: i64) -> StoreResult<Option<LineRow>>;

    /// Create a new line. The referenced user must already exist.
    async fn create_line(&self, line: &LineRow) -> StoreResult<()>;

    /// Delete a line by id. Returns false if it was already gone.
    async fn delete_line(&self, id: i64) -> StoreResult<bool>;

    /// Refresh a line's derived endpoint name, which can change when the
    /// line's declared technology or name changes under an unchanged key.
    async fn update_line_endpoint(
        &self,
        line_id: i64,
        endpoint_name: Option<&str>,
    ) -> StoreResult<()>;

    /// Associate a line with a device, mirroring the device's state onto
    /// the line.
    async fn associate_line_device(&self, line_id: i64, device: &DeviceRow) -> StoreResult<()>;
}
