//! Common test utilities and fixtures.

pub mod mocks;

use mocks::{
    MockDeviceStateAuthority, MockDirectoryAuthority, MockSessionAuthority, MockTenantAuthority,
    StaticCredentialIssuer,
};
use presenced_authorities::records::{
    DeviceStateEvent, LineRecord, SessionRecord, TenantRecord, UserRecord,
};
use presenced_server::Initiator;
use presenced_store::SqliteStore;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// Reconciliation engine wired to mock authorities over a real SQLite store.
#[allow(dead_code)]
pub struct TestHarness {
    pub store: Arc<SqliteStore>,
    pub tenants: Arc<MockTenantAuthority>,
    pub directory: Arc<MockDirectoryAuthority>,
    pub sessions: Arc<MockSessionAuthority>,
    pub device_states: Arc<MockDeviceStateAuthority>,
    pub initiator: Initiator,
    _temp_dir: TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let store = Arc::new(
            SqliteStore::new(temp_dir.path().join("presence.db"))
                .await
                .expect("Failed to create store"),
        );

        let tenants = Arc::new(MockTenantAuthority::default());
        let directory = Arc::new(MockDirectoryAuthority::default());
        let sessions = Arc::new(MockSessionAuthority::default());
        let device_states = Arc::new(MockDeviceStateAuthority::default());

        let initiator = Initiator::new(
            store.clone(),
            Arc::new(StaticCredentialIssuer),
            tenants.clone(),
            directory.clone(),
            sessions.clone(),
            device_states.clone(),
            120,
        );

        Self {
            store,
            tenants,
            directory,
            sessions,
            device_states,
            initiator,
            _temp_dir: temp_dir,
        }
    }
}

#[allow(dead_code)]
pub fn tenant_record(uuid: Uuid) -> TenantRecord {
    TenantRecord { uuid }
}

#[allow(dead_code)]
pub fn user_record(uuid: Uuid, tenant_uuid: Uuid, lines: Vec<LineRecord>) -> UserRecord {
    UserRecord {
        uuid,
        tenant_uuid,
        lines,
    }
}

/// A SIP line record whose derived endpoint name is `PJSIP/<name>`.
#[allow(dead_code)]
pub fn sip_line(id: i64, name: &str) -> LineRecord {
    LineRecord {
        id,
        name: Some(name.to_string()),
        endpoint_sip: Some(serde_json::json!({})),
        endpoint_sccp: None,
        endpoint_custom: None,
    }
}

#[allow(dead_code)]
pub fn session_record(uuid: Uuid, user_uuid: Uuid, tenant_uuid: Uuid) -> SessionRecord {
    SessionRecord {
        uuid,
        user_uuid,
        tenant_uuid,
    }
}

#[allow(dead_code)]
pub fn device_state_change(device: &str, state: &str) -> DeviceStateEvent {
    DeviceStateEvent {
        event: DeviceStateEvent::DEVICE_STATE_CHANGE.to_string(),
        device: Some(device.to_string()),
        state: Some(state.to_string()),
    }
}
