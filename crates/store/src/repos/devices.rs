//! Device repository trait.

use crate::error::StoreResult;
use crate::models::DeviceRow;
use async_trait::async_trait;

/// Repository for device operations.
///
/// Devices are a point-in-time signal: each reconciliation pass deletes the
/// whole set and recreates it from the latest snapshot.
#[async_trait]
pub trait DeviceRepo: Send + Sync {
    /// List all devices.
    async fn list_devices(&self) -> StoreResult<Vec<DeviceRow>>;

    /// Find a device by name.
    async fn get_device_by_name(&self, name: &str) -> StoreResult<Option<DeviceRow>>;

    /// Create a new device.
    async fn create_device(&self, device: &DeviceRow) -> StoreResult<()>;

    /// Delete every device. Returns the number of rows removed.
    async fn delete_all_devices(&self) -> StoreResult<u64>;
}
