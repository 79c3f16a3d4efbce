//! Raw records returned by the authorities.

use serde::Deserialize;
use uuid::Uuid;

/// List envelope used by the REST authorities.
#[derive(Debug, Deserialize)]
pub(crate) struct ItemsEnvelope<T> {
    pub items: Vec<T>,
}

/// Tenant as reported by the tenant authority.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantRecord {
    pub uuid: Uuid,
}

/// User as reported by the directory authority, with nested lines.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub uuid: Uuid,
    pub tenant_uuid: Uuid,
    #[serde(default)]
    pub lines: Vec<LineRecord>,
}

/// Line as reported by the directory authority.
///
/// The endpoint fields are opaque objects; only their presence matters for
/// endpoint naming.
#[derive(Debug, Clone, Deserialize)]
pub struct LineRecord {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoint_sip: Option<serde_json::Value>,
    #[serde(default)]
    pub endpoint_sccp: Option<serde_json::Value>,
    #[serde(default)]
    pub endpoint_custom: Option<serde_json::Value>,
}

impl LineRecord {
    /// Derive the device endpoint name for this line.
    ///
    /// Total: a record declaring none of the endpoint kinds, or carrying no
    /// name at all (seen in practice for malformed records), yields `None`,
    /// meaning the line has no device association.
    pub fn device_name(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        if self.endpoint_sip.is_some() {
            Some(format!("PJSIP/{name}"))
        } else if self.endpoint_sccp.is_some() {
            Some(format!("SCCP/{name}"))
        } else if self.endpoint_custom.is_some() {
            Some(name.to_string())
        } else {
            None
        }
    }
}

/// Session as reported by the session authority.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionRecord {
    pub uuid: Uuid,
    pub user_uuid: Uuid,
    pub tenant_uuid: Uuid,
}

/// One event from the device-state authority's `DeviceStateList` action.
///
/// The stream mixes event types; only `DeviceStateChange` records carry a
/// device and state, so those fields are optional here.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStateEvent {
    #[serde(rename = "Event")]
    pub event: String,
    #[serde(rename = "Device", default)]
    pub device: Option<String>,
    #[serde(rename = "State", default)]
    pub state: Option<String>,
}

impl DeviceStateEvent {
    /// Event type carried by records this system consumes.
    pub const DEVICE_STATE_CHANGE: &'static str = "DeviceStateChange";
}
