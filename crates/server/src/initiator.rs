//! Startup reconciliation against the external authorities.
//!
//! One run pulls full snapshots from each authority, diffs them against the
//! presence store and applies the minimal creates/deletes to converge. Four
//! ordered phases, each in its own store transaction: tenants, then users and
//! their lines, then sessions, then device states. Ownership dictates the
//! order: a user cannot exist without its tenant, a line or session cannot
//! exist without its user.
//!
//! Per-item lookup misses are recovered (logged and skipped); authority or
//! store failures abort the run and roll the current phase back.

use presenced_authorities::records::{DeviceStateEvent, LineRecord, SessionRecord, UserRecord};
use presenced_authorities::{
    AuthorityError, Credential, CredentialIssuer, DeviceStateAuthority, DirectoryAuthority,
    SessionAuthority, TenantAuthority,
};
use presenced_core::PresenceState;
use presenced_store::models::{DeviceRow, LineRow, SessionRow, TenantRow, UserRow};
use presenced_store::repos::{DeviceRepo, LineRepo, SessionRepo, TenantRepo, UserRepo};
use presenced_store::{PresenceStore, StoreError};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Reconciliation run errors.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("authority error: {0}")]
    Authority(#[from] AuthorityError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Mutation counts for one reconciliation run.
///
/// Devices are counted separately: the device set is replaced wholesale each
/// run, so its row churn says nothing about convergence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub tenants_created: u64,
    pub tenants_deleted: u64,
    pub users_created: u64,
    pub users_deleted: u64,
    pub lines_created: u64,
    pub lines_deleted: u64,
    pub sessions_created: u64,
    pub sessions_deleted: u64,
    pub devices_replaced: u64,
    pub skipped: u64,
}

impl RunStats {
    /// Total creates across the diffed entity types.
    pub fn creates(&self) -> u64 {
        self.tenants_created + self.users_created + self.lines_created + self.sessions_created
    }

    /// Total deletes across the diffed entity types.
    pub fn deletes(&self) -> u64 {
        self.tenants_deleted + self.users_deleted + self.lines_deleted + self.sessions_deleted
    }
}

/// The reconciliation engine.
pub struct Initiator {
    store: Arc<dyn PresenceStore>,
    credentials: Arc<dyn CredentialIssuer>,
    tenants: Arc<dyn TenantAuthority>,
    directory: Arc<dyn DirectoryAuthority>,
    sessions: Arc<dyn SessionAuthority>,
    device_states: Arc<dyn DeviceStateAuthority>,
    credential_expiration_secs: u64,
}

impl Initiator {
    pub fn new(
        store: Arc<dyn PresenceStore>,
        credentials: Arc<dyn CredentialIssuer>,
        tenants: Arc<dyn TenantAuthority>,
        directory: Arc<dyn DirectoryAuthority>,
        sessions: Arc<dyn SessionAuthority>,
        device_states: Arc<dyn DeviceStateAuthority>,
        credential_expiration_secs: u64,
    ) -> Self {
        Self {
            store,
            credentials,
            tenants,
            directory,
            sessions,
            device_states,
            credential_expiration_secs,
        }
    }

    /// Execute one full reconciliation run.
    ///
    /// A fresh credential is obtained once and reused across all phases of
    /// this run. Phases are globally sequential; a failure aborts the run,
    /// keeping whatever earlier phases already committed.
    pub async fn run(&self) -> Result<RunStats, InitError> {
        let credential = self
            .credentials
            .new_credential(self.credential_expiration_secs)
            .await?;

        let mut stats = RunStats::default();
        self.initiate_tenants(&credential, &mut stats).await?;
        self.initiate_users(&credential, &mut stats).await?;
        self.initiate_sessions(&credential, &mut stats).await?;
        self.initiate_devices(&credential, &mut stats).await?;

        tracing::info!(
            creates = stats.creates(),
            deletes = stats.deletes(),
            devices = stats.devices_replaced,
            skipped = stats.skipped,
            "Reconciliation run complete"
        );
        Ok(stats)
    }

    /// Run one phase inside a store transaction, rolling back on any error.
    async fn in_phase<F>(&self, phase: F) -> Result<(), InitError>
    where
        F: Future<Output = Result<(), InitError>>,
    {
        self.store.begin().await?;
        match phase.await {
            Ok(()) => {
                self.store.commit().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = self.store.rollback().await {
                    tracing::error!(error = %rollback_err, "Phase rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Phase 1: tenants.
    async fn initiate_tenants(
        &self,
        credential: &Credential,
        stats: &mut RunStats,
    ) -> Result<(), InitError> {
        let snapshot: HashSet<Uuid> = self
            .tenants
            .list_tenants(credential)
            .await?
            .into_iter()
            .map(|t| t.uuid)
            .collect();
        let cached: HashSet<Uuid> = self
            .store
            .list_tenants()
            .await?
            .into_iter()
            .map(|t| t.uuid)
            .collect();

        self.in_phase(self.apply_tenant_diff(&snapshot, &cached, stats))
            .await
    }

    async fn apply_tenant_diff(
        &self,
        snapshot: &HashSet<Uuid>,
        cached: &HashSet<Uuid>,
        stats: &mut RunStats,
    ) -> Result<(), InitError> {
        for &uuid in snapshot.difference(cached) {
            tracing::debug!(tenant = %uuid, "Create tenant");
            self.store
                .create_tenant(&TenantRow {
                    uuid,
                    created_at: OffsetDateTime::now_utc(),
                })
                .await?;
            stats.tenants_created += 1;
        }

        for &uuid in cached.difference(snapshot) {
            if self.store.delete_tenant(uuid).await? {
                tracing::debug!(tenant = %uuid, "Delete tenant");
                stats.tenants_deleted += 1;
            } else {
                tracing::warn!(tenant = %uuid, "Tenant already deleted, skipping");
                stats.skipped += 1;
            }
        }
        Ok(())
    }

    /// Phase 2: users, then their lines, then line-device association.
    async fn initiate_users(
        &self,
        credential: &Credential,
        stats: &mut RunStats,
    ) -> Result<(), InitError> {
        let records = self.directory.list_users(credential).await?;
        let users_cached = self.store.list_users(None).await?;
        let lines_cached = self.store.list_lines(None).await?;

        self.in_phase(self.apply_directory_diff(&records, &users_cached, &lines_cached, stats))
            .await
    }

    async fn apply_directory_diff(
        &self,
        records: &[UserRecord],
        users_cached: &[UserRow],
        lines_cached: &[LineRow],
        stats: &mut RunStats,
    ) -> Result<(), InitError> {
        let snapshot: HashSet<(Uuid, Uuid)> =
            records.iter().map(|u| (u.uuid, u.tenant_uuid)).collect();
        let cached: HashSet<(Uuid, Uuid)> = users_cached
            .iter()
            .map(|u| (u.uuid, u.tenant_uuid))
            .collect();

        for &(uuid, tenant_uuid) in snapshot.difference(&cached) {
            // The tenant may have appeared between the phase-1 snapshot and
            // the directory fetch; do not assume phase 1 created it.
            self.store.find_or_create_tenant(tenant_uuid).await?;

            tracing::debug!(user = %uuid, "Create user");
            self.store
                .create_user(&UserRow {
                    uuid,
                    tenant_uuid,
                    state: PresenceState::Unavailable.as_str().to_string(),
                    created_at: OffsetDateTime::now_utc(),
                })
                .await?;
            stats.users_created += 1;
        }

        for &(uuid, tenant_uuid) in cached.difference(&snapshot) {
            if self.store.delete_user(tenant_uuid, uuid).await? {
                tracing::debug!(user = %uuid, "Delete user");
                stats.users_deleted += 1;
            } else {
                tracing::warn!(user = %uuid, "User already deleted, skipping");
                stats.skipped += 1;
            }
        }

        self.apply_line_diff(records, lines_cached, stats).await?;
        self.associate_lines_devices(records, stats).await
    }

    async fn apply_line_diff(
        &self,
        records: &[UserRecord],
        lines_cached: &[LineRow],
        stats: &mut RunStats,
    ) -> Result<(), InitError> {
        let line_records: HashMap<i64, &LineRecord> = records
            .iter()
            .flat_map(|u| u.lines.iter().map(|l| (l.id, l)))
            .collect();
        let snapshot: HashSet<(i64, Uuid, Uuid)> = records
            .iter()
            .flat_map(|u| u.lines.iter().map(move |l| (l.id, u.uuid, u.tenant_uuid)))
            .collect();
        let cached: HashSet<(i64, Uuid, Uuid)> = lines_cached
            .iter()
            .map(|l| (l.id, l.user_uuid, l.tenant_uuid))
            .collect();

        for &(id, user_uuid, tenant_uuid) in snapshot.difference(&cached) {
            if self.store.get_user(tenant_uuid, user_uuid).await?.is_none() {
                tracing::warn!(line = id, user = %user_uuid, "Owning user not found, skipping line");
                stats.skipped += 1;
                continue;
            }

            let endpoint_name = line_records.get(&id).and_then(|l| l.device_name());
            tracing::debug!(line = id, "Create line");
            self.store
                .create_line(&LineRow {
                    id,
                    user_uuid,
                    tenant_uuid,
                    endpoint_name,
                    device_name: None,
                    state: PresenceState::Unavailable.as_str().to_string(),
                })
                .await?;
            stats.lines_created += 1;
        }

        for &(id, _user_uuid, _tenant_uuid) in cached.difference(&snapshot) {
            // A cascaded user deletion may already have taken the line.
            if self.store.delete_line(id).await? {
                tracing::debug!(line = id, "Delete line");
                stats.lines_deleted += 1;
            } else {
                tracing::debug!(line = id, "Line already deleted");
                stats.skipped += 1;
            }
        }
        Ok(())
    }

    /// Associate every snapshot line with a stored device by endpoint name.
    /// Unresolved lookups on either side are left for the next run.
    async fn associate_lines_devices(
        &self,
        records: &[UserRecord],
        stats: &mut RunStats,
    ) -> Result<(), InitError> {
        for record in records.iter().flat_map(|u| u.lines.iter()) {
            let device_name = record.device_name();
            let Some(line) = self.store.get_line(record.id).await? else {
                if let Some(device_name) = &device_name {
                    tracing::debug!(
                        line = record.id,
                        device = %device_name,
                        "Unable to associate line with device"
                    );
                    stats.skipped += 1;
                }
                continue;
            };

            // The line's technology or name may have changed since the row
            // was created, under the same key.
            if line.endpoint_name.as_deref() != device_name.as_deref() {
                tracing::debug!(line = line.id, "Refresh line endpoint name");
                self.store
                    .update_line_endpoint(line.id, device_name.as_deref())
                    .await?;
            }

            let Some(device_name) = device_name else {
                continue;
            };
            let Some(device) = self.store.get_device_by_name(&device_name).await? else {
                tracing::debug!(
                    line = line.id,
                    device = %device_name,
                    "Unable to associate line with device"
                );
                stats.skipped += 1;
                continue;
            };

            tracing::debug!(line = line.id, device = %device.name, "Associate line with device");
            self.store.associate_line_device(line.id, &device).await?;
        }
        Ok(())
    }

    /// Phase 3: sessions.
    async fn initiate_sessions(
        &self,
        credential: &Credential,
        stats: &mut RunStats,
    ) -> Result<(), InitError> {
        let records = self.sessions.list_sessions(credential).await?;
        let cached_rows = self.store.list_sessions(None).await?;

        self.in_phase(self.apply_session_diff(&records, &cached_rows, stats))
            .await
    }

    async fn apply_session_diff(
        &self,
        records: &[SessionRecord],
        cached_rows: &[SessionRow],
        stats: &mut RunStats,
    ) -> Result<(), InitError> {
        let snapshot: HashSet<(Uuid, Uuid, Uuid)> = records
            .iter()
            .map(|s| (s.uuid, s.user_uuid, s.tenant_uuid))
            .collect();
        let cached: HashSet<(Uuid, Uuid, Uuid)> = cached_rows
            .iter()
            .map(|s| (s.uuid, s.user_uuid, s.tenant_uuid))
            .collect();

        for &(uuid, user_uuid, tenant_uuid) in snapshot.difference(&cached) {
            // The session authority may know about users this engine has not
            // learned yet; drop those sessions until a later run.
            if self.store.get_user(tenant_uuid, user_uuid).await?.is_none() {
                tracing::debug!(session = %uuid, user = %user_uuid, "Session has no valid user");
                stats.skipped += 1;
                continue;
            }

            tracing::debug!(session = %uuid, user = %user_uuid, "Create session");
            self.store
                .create_session(&SessionRow {
                    uuid,
                    user_uuid,
                    tenant_uuid,
                })
                .await?;
            stats.sessions_created += 1;
        }

        for &(uuid, user_uuid, _tenant_uuid) in cached.difference(&snapshot) {
            if self.store.delete_session(uuid).await? {
                tracing::debug!(session = %uuid, user = %user_uuid, "Delete session");
                stats.sessions_deleted += 1;
            } else {
                tracing::warn!(session = %uuid, "Session already deleted, skipping");
                stats.skipped += 1;
            }
        }
        Ok(())
    }

    /// Phase 4: device states, replaced wholesale.
    async fn initiate_devices(
        &self,
        credential: &Credential,
        stats: &mut RunStats,
    ) -> Result<(), InitError> {
        let events = self.device_states.device_state_list(credential).await?;
        self.in_phase(self.apply_device_snapshot(&events, stats))
            .await
    }

    async fn apply_device_snapshot(
        &self,
        events: &[DeviceStateEvent],
        stats: &mut RunStats,
    ) -> Result<(), InitError> {
        tracing::debug!("Delete all devices");
        self.store.delete_all_devices().await?;

        for event in events {
            if event.event != DeviceStateEvent::DEVICE_STATE_CHANGE {
                continue;
            }
            let (Some(name), Some(raw_state)) = (event.device.as_deref(), event.state.as_deref())
            else {
                tracing::warn!(event = %event.event, "Malformed device state event, skipping");
                stats.skipped += 1;
                continue;
            };

            let state = PresenceState::from_device_state(raw_state);
            tracing::debug!(device = name, state = %state, "Create device");
            self.store
                .create_device(&DeviceRow {
                    name: name.to_string(),
                    state: state.as_str().to_string(),
                })
                .await?;
            stats.devices_replaced += 1;
        }
        Ok(())
    }
}
