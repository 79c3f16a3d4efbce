//! Presence store trait and SQLite implementation.

use crate::error::{StoreError, StoreResult};
use crate::models::{DeviceRow, LineRow, RoomRow, RoomUserRow, SessionRow, TenantRow, UserRow};
use crate::repos::{DeviceRepo, LineRepo, RoomRepo, SessionRepo, TenantRepo, UserRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Combined presence store trait.
#[async_trait]
pub trait PresenceStore:
    TenantRepo + UserRepo + LineRepo + SessionRepo + DeviceRepo + RoomRepo + Send + Sync
{
    /// Run database migrations.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> StoreResult<()>;

    /// Open a reconciliation phase transaction.
    ///
    /// Subsequent mutations through this handle belong to the phase until
    /// `commit` or `rollback`. Phases never nest.
    async fn begin(&self) -> StoreResult<()>;

    /// Commit the current phase transaction.
    async fn commit(&self) -> StoreResult<()>;

    /// Roll back the current phase transaction.
    async fn rollback(&self) -> StoreResult<()>;
}

/// SQLite-based presence store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store and run migrations.
    pub async fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Config(format!("cannot create {parent:?}: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // A single connection serializes writers, which also makes the
            // phase-level BEGIN/COMMIT statements in this store sound: every
            // statement issued between them runs on the same connection.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        tracing::debug!(path = %path.display(), "Opened presence store");

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl PresenceStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        // raw_sql runs the whole multi-statement schema in one pass
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<()> {
        sqlx::query("BEGIN IMMEDIATE").execute(&self.pool).await?;
        Ok(())
    }

    async fn commit(&self) -> StoreResult<()> {
        sqlx::query("COMMIT").execute(&self.pool).await?;
        Ok(())
    }

    async fn rollback(&self) -> StoreResult<()> {
        sqlx::query("ROLLBACK").execute(&self.pool).await?;
        Ok(())
    }
}

// Repository trait implementations for SqliteStore
mod sqlite_impl {
    use super::*;

    /// Build an `IN (?, ...)` clause for a uuid filter.
    /// Returns None for an empty filter, which matches nothing.
    fn in_clause(column: &str, uuids: &[Uuid]) -> Option<String> {
        if uuids.is_empty() {
            return None;
        }
        let placeholders = vec!["?"; uuids.len()].join(", ");
        Some(format!("{column} IN ({placeholders})"))
    }

    #[async_trait]
    impl TenantRepo for SqliteStore {
        async fn list_tenants(&self) -> StoreResult<Vec<TenantRow>> {
            let rows = sqlx::query_as::<_, TenantRow>(
                "SELECT uuid, created_at FROM tenants ORDER BY created_at",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn get_tenant(&self, uuid: Uuid) -> StoreResult<Option<TenantRow>> {
            let row = sqlx::query_as::<_, TenantRow>(
                "SELECT uuid, created_at FROM tenants WHERE uuid = ?",
            )
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn create_tenant(&self, tenant: &TenantRow) -> StoreResult<()> {
            let result = sqlx::query("INSERT INTO tenants (uuid, created_at) VALUES (?, ?)")
                .bind(tenant.uuid)
                .bind(tenant.created_at)
                .execute(&self.pool)
                .await;
            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                    StoreError::AlreadyExists(format!("tenant {}", tenant.uuid)),
                ),
                Err(e) => Err(e.into()),
            }
        }

        async fn delete_tenant(&self, uuid: Uuid) -> StoreResult<bool> {
            let result = sqlx::query("DELETE FROM tenants WHERE uuid = ?")
                .bind(uuid)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn find_or_create_tenant(&self, uuid: Uuid) -> StoreResult<TenantRow> {
            sqlx::query(
                "INSERT INTO tenants (uuid, created_at) VALUES (?, ?) \
                 ON CONFLICT(uuid) DO NOTHING",
            )
            .bind(uuid)
            .bind(time::OffsetDateTime::now_utc())
            .execute(&self.pool)
            .await?;

            self.get_tenant(uuid)
                .await?
                .ok_or_else(|| StoreError::Internal(format!("tenant {uuid} vanished after insert")))
        }
    }

    #[async_trait]
    impl UserRepo for SqliteStore {
        async fn list_users(&self, tenant_uuids: Option<&[Uuid]>) -> StoreResult<Vec<UserRow>> {
            let base = "SELECT uuid, tenant_uuid, state, created_at FROM users";
            match tenant_uuids {
                None => {
                    let rows = sqlx::query_as::<_, UserRow>(base)
                        .fetch_all(&self.pool)
                        .await?;
                    Ok(rows)
                }
                Some(uuids) => {
                    let Some(clause) = in_clause("tenant_uuid", uuids) else {
                        return Ok(Vec::new());
                    };
                    let sql = format!("{base} WHERE {clause}");
                    let mut query = sqlx::query_as::<_, UserRow>(&sql);
                    for uuid in uuids {
                        query = query.bind(uuid);
                    }
                    Ok(query.fetch_all(&self.pool).await?)
                }
            }
        }

        async fn get_user(&self, tenant_uuid: Uuid, uuid: Uuid) -> StoreResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>(
                "SELECT uuid, tenant_uuid, state, created_at FROM users \
                 WHERE tenant_uuid = ? AND uuid = ?",
            )
            .bind(tenant_uuid)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn create_user(&self, user: &UserRow) -> StoreResult<()> {
            let result = sqlx::query(
                "INSERT INTO users (uuid, tenant_uuid, state, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(user.uuid)
            .bind(user.tenant_uuid)
            .bind(&user.state)
            .bind(user.created_at)
            .execute(&self.pool)
            .await;
            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    Err(StoreError::AlreadyExists(format!("user {}", user.uuid)))
                }
                Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                    Err(StoreError::Constraint(format!(
                        "user {} references unknown tenant {}",
                        user.uuid, user.tenant_uuid
                    )))
                }
                Err(e) => Err(e.into()),
            }
        }

        async fn delete_user(&self, tenant_uuid: Uuid, uuid: Uuid) -> StoreResult<bool> {
            let result = sqlx::query("DELETE FROM users WHERE tenant_uuid = ? AND uuid = ?")
                .bind(tenant_uuid)
                .bind(uuid)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn update_user_state(&self, uuid: Uuid, state: &str) -> StoreResult<()> {
            let result = sqlx::query("UPDATE users SET state = ? WHERE uuid = ?")
                .bind(state)
                .bind(uuid)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("user {uuid}")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LineRepo for SqliteStore {
        async fn list_lines(&self, tenant_uuids: Option<&[Uuid]>) -> StoreResult<Vec<LineRow>> {
            let base = "SELECT id, user_uuid, tenant_uuid, endpoint_name, device_name, state \
                        FROM lines";
            match tenant_uuids {
                None => {
                    let rows = sqlx::query_as::<_, LineRow>(base)
                        .fetch_all(&self.pool)
                        .await?;
                    Ok(rows)
                }
                Some(uuids) => {
                    let Some(clause) = in_clause("tenant_uuid", uuids) else {
                        return Ok(Vec::new());
                    };
                    let sql = format!("{base} WHERE {clause}");
                    let mut query = sqlx::query_as::<_, LineRow>(&sql);
                    for uuid in uuids {
                        query = query.bind(uuid);
                    }
                    Ok(query.fetch_all(&self.pool).await?)
                }
            }
        }

        async fn get_line(&self, id: i64) -> StoreResult<Option<LineRow>> {
            let row = sqlx::query_as::<_, LineRow>(
                "SELECT id, user_uuid, tenant_uuid, endpoint_name, device_name, state \
                 FROM lines WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn create_line(&self, line: &LineRow) -> StoreResult<()> {
            let result = sqlx::query(
                "INSERT INTO lines (id, user_uuid, tenant_uuid, endpoint_name, device_name, state) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(line.id)
            .bind(line.user_uuid)
            .bind(line.tenant_uuid)
            .bind(&line.endpoint_name)
            .bind(&line.device_name)
            .bind(&line.state)
            .execute(&self.pool)
            .await;
            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    Err(StoreError::AlreadyExists(format!("line {}", line.id)))
                }
                Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                    Err(StoreError::Constraint(format!(
                        "line {} references unknown user {}",
                        line.id, line.user_uuid
                    )))
                }
                Err(e) => Err(e.into()),
            }
        }

        async fn delete_line(&self, id: i64) -> StoreResult<bool> {
            let result = sqlx::query("DELETE FROM lines WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn update_line_endpoint(
            &self,
            line_id: i64,
            endpoint_name: Option<&str>,
        ) -> StoreResult<()> {
            let result = sqlx::query("UPDATE lines SET endpoint_name = ? WHERE id = ?")
                .bind(endpoint_name)
                .bind(line_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("line {line_id}")));
            }
            Ok(())
        }

        async fn associate_line_device(&self, line_id: i64, device: &DeviceRow) -> StoreResult<()> {
            let result = sqlx::query("UPDATE lines SET device_name = ?, state = ? WHERE id = ?")
                .bind(&device.name)
                .bind(&device.state)
                .bind(line_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("line {line_id}")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SessionRepo for SqliteStore {
        async fn list_sessions(
            &self,
            tenant_uuids: Option<&[Uuid]>,
        ) -> StoreResult<Vec<SessionRow>> {
            let base = "SELECT uuid, user_uuid, tenant_uuid FROM sessions";
            match tenant_uuids {
                None => {
                    let rows = sqlx::query_as::<_, SessionRow>(base)
                        .fetch_all(&self.pool)
                        .await?;
                    Ok(rows)
                }
                Some(uuids) => {
                    let Some(clause) = in_clause("tenant_uuid", uuids) else {
                        return Ok(Vec::new());
                    };
                    let sql = format!("{base} WHERE {clause}");
                    let mut query = sqlx::query_as::<_, SessionRow>(&sql);
                    for uuid in uuids {
                        query = query.bind(uuid);
                    }
                    Ok(query.fetch_all(&self.pool).await?)
                }
            }
        }

        async fn get_session(&self, uuid: Uuid) -> StoreResult<Option<SessionRow>> {
            let row = sqlx::query_as::<_, SessionRow>(
                "SELECT uuid, user_uuid, tenant_uuid FROM sessions WHERE uuid = ?",
            )
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn create_session(&self, session: &SessionRow) -> StoreResult<()> {
            let result = sqlx::query(
                "INSERT INTO sessions (uuid, user_uuid, tenant_uuid) VALUES (?, ?, ?)",
            )
            .bind(session.uuid)
            .bind(session.user_uuid)
            .bind(session.tenant_uuid)
            .execute(&self.pool)
            .await;
            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                    StoreError::AlreadyExists(format!("session {}", session.uuid)),
                ),
                Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                    Err(StoreError::Constraint(format!(
                        "session {} references unknown user {}",
                        session.uuid, session.user_uuid
                    )))
                }
                Err(e) => Err(e.into()),
            }
        }

        async fn delete_session(&self, uuid: Uuid) -> StoreResult<bool> {
            let result = sqlx::query("DELETE FROM sessions WHERE uuid = ?")
                .bind(uuid)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }
    }

    #[async_trait]
    impl DeviceRepo for SqliteStore {
        async fn list_devices(&self) -> StoreResult<Vec<DeviceRow>> {
            let rows =
                sqlx::query_as::<_, DeviceRow>("SELECT name, state FROM devices ORDER BY name")
                    .fetch_all(&self.pool)
                    .await?;
            Ok(rows)
        }

        async fn get_device_by_name(&self, name: &str) -> StoreResult<Option<DeviceRow>> {
            let row =
                sqlx::query_as::<_, DeviceRow>("SELECT name, state FROM devices WHERE name = ?")
                    .bind(name)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn create_device(&self, device: &DeviceRow) -> StoreResult<()> {
            let result = sqlx::query("INSERT INTO devices (name, state) VALUES (?, ?)")
                .bind(&device.name)
                .bind(&device.state)
                .execute(&self.pool)
                .await;
            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                    StoreError::AlreadyExists(format!("device {}", device.name)),
                ),
                Err(e) => Err(e.into()),
            }
        }

        async fn delete_all_devices(&self) -> StoreResult<u64> {
            let result = sqlx::query("DELETE FROM devices").execute(&self.pool).await?;
            Ok(result.rows_affected())
        }
    }

    #[async_trait]
    impl RoomRepo for SqliteStore {
        async fn create_room(&self, room: &RoomRow, members: &[Uuid]) -> StoreResult<()> {
            if members.len() != 2 {
                return Err(StoreError::Constraint(format!(
                    "room requires exactly 2 members, got {}",
                    members.len()
                )));
            }

            sqlx::query(
                "INSERT INTO rooms (uuid, tenant_uuid, name, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(room.uuid)
            .bind(room.tenant_uuid)
            .bind(&room.name)
            .bind(room.created_at)
            .execute(&self.pool)
            .await?;

            for member in members {
                let inserted = sqlx::query("INSERT INTO room_users (room_uuid, uuid) VALUES (?, ?)")
                    .bind(room.uuid)
                    .bind(member)
                    .execute(&self.pool)
                    .await;
                if let Err(e) = inserted {
                    // Undo the room row so a failed member insert does not
                    // leave a memberless room behind.
                    let _ = sqlx::query("DELETE FROM rooms WHERE uuid = ?")
                        .bind(room.uuid)
                        .execute(&self.pool)
                        .await;
                    return Err(e.into());
                }
            }
            Ok(())
        }

        async fn get_room(&self, tenant_uuid: Uuid, uuid: Uuid) -> StoreResult<Option<RoomRow>> {
            let row = sqlx::query_as::<_, RoomRow>(
                "SELECT uuid, tenant_uuid, name, created_at FROM rooms \
                 WHERE tenant_uuid = ? AND uuid = ?",
            )
            .bind(tenant_uuid)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn list_rooms(
            &self,
            tenant_uuids: Option<&[Uuid]>,
            user_uuid: Option<Uuid>,
        ) -> StoreResult<Vec<RoomRow>> {
            let base = "SELECT r.uuid, r.tenant_uuid, r.name, r.created_at FROM rooms r";
            let mut sql = base.to_string();
            let mut clauses = Vec::new();

            if user_uuid.is_some() {
                sql.push_str(" JOIN room_users ru ON ru.room_uuid = r.uuid");
                clauses.push("ru.uuid = ?".to_string());
            }
            if let Some(uuids) = tenant_uuids {
                let Some(clause) = in_clause("r.tenant_uuid", uuids) else {
                    return Ok(Vec::new());
                };
                clauses.push(clause);
            }
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }

            let mut query = sqlx::query_as::<_, RoomRow>(&sql);
            if let Some(user_uuid) = user_uuid {
                query = query.bind(user_uuid);
            }
            if let Some(uuids) = tenant_uuids {
                for uuid in uuids {
                    query = query.bind(uuid);
                }
            }
            Ok(query.fetch_all(&self.pool).await?)
        }

        async fn list_room_users(&self, room_uuid: Uuid) -> StoreResult<Vec<RoomUserRow>> {
            let rows = sqlx::query_as::<_, RoomUserRow>(
                "SELECT room_uuid, uuid FROM room_users WHERE room_uuid = ?",
            )
            .bind(room_uuid)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Tenants: root of isolation
CREATE TABLE IF NOT EXISTS tenants (
    uuid BLOB PRIMARY KEY,
    created_at TEXT NOT NULL
);

-- Users: owned by their tenant
CREATE TABLE IF NOT EXISTS users (
    uuid BLOB PRIMARY KEY,
    tenant_uuid BLOB NOT NULL REFERENCES tenants(uuid) ON DELETE CASCADE,
    state TEXT NOT NULL DEFAULT 'unavailable',
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_tenant ON users(tenant_uuid);

-- Lines: registered telephony endpoints, owned by their user
CREATE TABLE IF NOT EXISTS lines (
    id INTEGER PRIMARY KEY,
    user_uuid BLOB NOT NULL REFERENCES users(uuid) ON DELETE CASCADE,
    tenant_uuid BLOB NOT NULL,
    endpoint_name TEXT,
    device_name TEXT,
    state TEXT NOT NULL DEFAULT 'unavailable'
);
CREATE INDEX IF NOT EXISTS idx_lines_user ON lines(user_uuid);
CREATE INDEX IF NOT EXISTS idx_lines_endpoint ON lines(endpoint_name);

-- Sessions: active logins, owned by their user
CREATE TABLE IF NOT EXISTS sessions (
    uuid BLOB PRIMARY KEY,
    user_uuid BLOB NOT NULL REFERENCES users(uuid) ON DELETE CASCADE,
    tenant_uuid BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_uuid);

-- Devices: point-in-time channel status, replaced wholesale each pass
CREATE TABLE IF NOT EXISTS devices (
    name TEXT PRIMARY KEY,
    state TEXT NOT NULL
);

-- Rooms: chat rooms with fixed two-member arity
CREATE TABLE IF NOT EXISTS rooms (
    uuid BLOB PRIMARY KEY,
    tenant_uuid BLOB NOT NULL,
    name TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_rooms_tenant ON rooms(tenant_uuid);

CREATE TABLE IF NOT EXISTS room_users (
    room_uuid BLOB NOT NULL REFERENCES rooms(uuid) ON DELETE CASCADE,
    uuid BLOB NOT NULL,
    PRIMARY KEY (room_uuid, uuid)
);
"#;
