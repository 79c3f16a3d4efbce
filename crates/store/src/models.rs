//! Database models mapping to the presence schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Tenant record, root of isolation.
#[derive(Debug, Clone, FromRow)]
pub struct TenantRow {
    pub uuid: Uuid,
    pub created_at: OffsetDateTime,
}

/// User record, owned by its tenant.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub uuid: Uuid,
    pub tenant_uuid: Uuid,
    /// Canonical presence state; defaults to `unavailable` at creation.
    pub state: String,
    pub created_at: OffsetDateTime,
}

/// Registered telephony endpoint for a user.
#[derive(Debug, Clone, FromRow)]
pub struct LineRow {
    pub id: i64,
    pub user_uuid: Uuid,
    pub tenant_uuid: Uuid,
    /// Derived device name used as the join key to `DeviceRow`.
    /// Absent for records the naming rules cannot associate.
    pub endpoint_name: Option<String>,
    /// Name of the device this line was last associated with.
    pub device_name: Option<String>,
    /// Mirrors the associated device's state; `unavailable` until associated.
    pub state: String,
}

/// Active login, owned by its user.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub uuid: Uuid,
    pub user_uuid: Uuid,
    pub tenant_uuid: Uuid,
}

/// Live telephony channel status, keyed by name.
///
/// Devices have no stable identity beyond the name; the whole set is replaced
/// on every reconciliation pass.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceRow {
    pub name: String,
    pub state: String,
}

/// Chat room record.
#[derive(Debug, Clone, FromRow)]
pub struct RoomRow {
    pub uuid: Uuid,
    pub tenant_uuid: Uuid,
    pub name: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Room membership record.
#[derive(Debug, Clone, FromRow)]
pub struct RoomUserRow {
    pub room_uuid: Uuid,
    pub uuid: Uuid,
}
