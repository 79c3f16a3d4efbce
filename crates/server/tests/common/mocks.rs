//! In-memory authority implementations for engine tests.

use async_trait::async_trait;
use presenced_authorities::records::{
    DeviceStateEvent, SessionRecord, TenantRecord, UserRecord,
};
use presenced_authorities::{
    AuthorityError, AuthorityResult, Credential, CredentialIssuer, DeviceStateAuthority,
    DirectoryAuthority, SessionAuthority, TenantAuthority,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Credential issuer that always hands out the same token.
pub struct StaticCredentialIssuer;

#[async_trait]
impl CredentialIssuer for StaticCredentialIssuer {
    async fn new_credential(&self, _expiration_secs: u64) -> AuthorityResult<Credential> {
        Ok(Credential {
            token: "test-token".to_string(),
        })
    }
}

macro_rules! mock_authority {
    ($name:ident, $record:ty) => {
        #[derive(Default)]
        pub struct $name {
            records: Mutex<Vec<$record>>,
            fail: AtomicBool,
        }

        #[allow(dead_code)]
        impl $name {
            /// Replace the snapshot this authority will report.
            pub fn set(&self, records: Vec<$record>) {
                *self.records.lock().unwrap() = records;
            }

            /// Toggle a simulated outage.
            pub fn set_fail(&self, fail: bool) {
                self.fail.store(fail, Ordering::SeqCst);
            }

            fn snapshot(&self) -> AuthorityResult<Vec<$record>> {
                if self.fail.load(Ordering::SeqCst) {
                    return Err(AuthorityError::Unavailable("mock outage".to_string()));
                }
                Ok(self.records.lock().unwrap().clone())
            }
        }
    };
}

mock_authority!(MockTenantAuthority, TenantRecord);
mock_authority!(MockDirectoryAuthority, UserRecord);
mock_authority!(MockSessionAuthority, SessionRecord);
mock_authority!(MockDeviceStateAuthority, DeviceStateEvent);

#[async_trait]
impl TenantAuthority for MockTenantAuthority {
    async fn list_tenants(&self, _credential: &Credential) -> AuthorityResult<Vec<TenantRecord>> {
        self.snapshot()
    }
}

#[async_trait]
impl DirectoryAuthority for MockDirectoryAuthority {
    async fn list_users(&self, _credential: &Credential) -> AuthorityResult<Vec<UserRecord>> {
        self.snapshot()
    }
}

#[async_trait]
impl SessionAuthority for MockSessionAuthority {
    async fn list_sessions(&self, _credential: &Credential) -> AuthorityResult<Vec<SessionRecord>> {
        self.snapshot()
    }
}

#[async_trait]
impl DeviceStateAuthority for MockDeviceStateAuthority {
    async fn device_state_list(
        &self,
        _credential: &Credential,
    ) -> AuthorityResult<Vec<DeviceStateEvent>> {
        self.snapshot()
    }
}
