//! HTTP handlers for the read-only query API.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use presenced_core::PresenceState;
use presenced_store::models::{LineRow, RoomRow, SessionRow, UserRow};
use presenced_store::repos::{DeviceRepo, LineRepo, RoomRepo, SessionRepo, TenantRepo, UserRepo};
use presenced_store::PresenceStore;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

fn format_rfc3339(ts: OffsetDateTime) -> ApiResult<String> {
    ts.format(&time::format_description::well_known::Rfc3339)
        .map_err(|e| ApiError::Internal(format!("failed to format timestamp: {e}")))
}

/// Optional tenant scope for list endpoints.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub tenant_uuid: Option<Uuid>,
}

fn tenant_filter(params: &ListParams) -> Option<Vec<Uuid>> {
    params.tenant_uuid.map(|uuid| vec![uuid])
}

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub rest_api: &'static str,
    pub presence_initialization: InitializationStatus,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct InitializationStatus {
    pub status: &'static str,
}

/// GET /1.0/status - Service status.
///
/// Intentionally ungated so probes and operators can watch initialization
/// progress while entity routes still refuse traffic.
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    state.store.health_check().await?;

    let init_status = if state.readiness.is_initialized() {
        "ok"
    } else {
        "in_progress"
    };
    Ok(Json(StatusResponse {
        rest_api: "ok",
        presence_initialization: InitializationStatus {
            status: init_status,
        },
        version: env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// Tenants
// =============================================================================

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub uuid: Uuid,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ListTenantsResponse {
    pub items: Vec<TenantResponse>,
}

/// GET /1.0/tenants - List tenants.
pub async fn list_tenants(State(state): State<AppState>) -> ApiResult<Json<ListTenantsResponse>> {
    let items = state
        .store
        .list_tenants()
        .await?
        .into_iter()
        .map(|row| {
            Ok(TenantResponse {
                uuid: row.uuid,
                created_at: format_rfc3339(row.created_at)?,
            })
        })
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(ListTenantsResponse { items }))
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub uuid: Uuid,
    pub user_uuid: Uuid,
    pub tenant_uuid: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LineResponse {
    pub id: i64,
    pub user_uuid: Uuid,
    pub tenant_uuid: Uuid,
    pub endpoint_name: Option<String>,
    pub device_name: Option<String>,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub uuid: Uuid,
    pub tenant_uuid: Uuid,
    pub state: String,
    pub created_at: String,
    pub sessions: Vec<SessionResponse>,
    pub lines: Vec<LineResponse>,
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub items: Vec<UserResponse>,
}

fn session_response(row: &SessionRow) -> SessionResponse {
    SessionResponse {
        uuid: row.uuid,
        user_uuid: row.user_uuid,
        tenant_uuid: row.tenant_uuid,
    }
}

fn line_response(row: &LineRow) -> LineResponse {
    LineResponse {
        id: row.id,
        user_uuid: row.user_uuid,
        tenant_uuid: row.tenant_uuid,
        endpoint_name: row.endpoint_name.clone(),
        device_name: row.device_name.clone(),
        state: row.state.clone(),
    }
}

fn user_response(
    user: &UserRow,
    sessions: &[SessionRow],
    lines: &[LineRow],
) -> ApiResult<UserResponse> {
    Ok(UserResponse {
        uuid: user.uuid,
        tenant_uuid: user.tenant_uuid,
        state: user.state.clone(),
        created_at: format_rfc3339(user.created_at)?,
        sessions: sessions
            .iter()
            .filter(|s| s.user_uuid == user.uuid)
            .map(session_response)
            .collect(),
        lines: lines
            .iter()
            .filter(|l| l.user_uuid == user.uuid)
            .map(line_response)
            .collect(),
    })
}

/// GET /1.0/users - List users with nested sessions and lines.
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListUsersResponse>> {
    let filter = tenant_filter(&params);
    let users = state.store.list_users(filter.as_deref()).await?;
    let sessions = state.store.list_sessions(filter.as_deref()).await?;
    let lines = state.store.list_lines(filter.as_deref()).await?;

    let items = users
        .iter()
        .map(|user| user_response(user, &sessions, &lines))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(ListUsersResponse { items }))
}

/// GET /1.0/users/{uuid} - Get one user with nested sessions and lines.
pub async fn get_user(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<UserResponse>> {
    let user = match params.tenant_uuid {
        Some(tenant_uuid) => state.store.get_user(tenant_uuid, uuid).await?,
        None => state
            .store
            .list_users(None)
            .await?
            .into_iter()
            .find(|u| u.uuid == uuid),
    };
    let user = user.ok_or_else(|| ApiError::NotFound(format!("user {uuid}")))?;

    let scope = [user.tenant_uuid];
    let sessions = state.store.list_sessions(Some(&scope)).await?;
    let lines = state.store.list_lines(Some(&scope)).await?;
    Ok(Json(user_response(&user, &sessions, &lines)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePresenceRequest {
    pub state: String,
}

/// PUT /1.0/users/{uuid}/presences - Update a user's presence state.
pub async fn update_user_presence(
    State(app): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(req): Json<UpdatePresenceRequest>,
) -> ApiResult<StatusCode> {
    let presence = PresenceState::parse(&req.state)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown presence state {:?}", req.state)))?;
    app.store.update_user_state(uuid, presence.as_str()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Lines, sessions, devices
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ListLinesResponse {
    pub items: Vec<LineResponse>,
}

/// GET /1.0/lines - List lines.
pub async fn list_lines(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListLinesResponse>> {
    let filter = tenant_filter(&params);
    let items = state
        .store
        .list_lines(filter.as_deref())
        .await?
        .iter()
        .map(line_response)
        .collect();
    Ok(Json(ListLinesResponse { items }))
}

#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    pub items: Vec<SessionResponse>,
}

/// GET /1.0/sessions - List sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListSessionsResponse>> {
    let filter = tenant_filter(&params);
    let items = state
        .store
        .list_sessions(filter.as_deref())
        .await?
        .iter()
        .map(session_response)
        .collect();
    Ok(Json(ListSessionsResponse { items }))
}

#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub name: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct ListDevicesResponse {
    pub items: Vec<DeviceResponse>,
}

/// GET /1.0/devices - List devices.
pub async fn list_devices(State(state): State<AppState>) -> ApiResult<Json<ListDevicesResponse>> {
    let items = state
        .store
        .list_devices()
        .await?
        .into_iter()
        .map(|row| DeviceResponse {
            name: row.name,
            state: row.state,
        })
        .collect();
    Ok(Json(ListDevicesResponse { items }))
}

// =============================================================================
// Rooms
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub uuid: Uuid,
    pub tenant_uuid: Uuid,
    pub name: Option<String>,
    pub created_at: String,
    pub users: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ListRoomsResponse {
    pub items: Vec<RoomResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ListRoomsParams {
    pub tenant_uuid: Option<Uuid>,
    pub user_uuid: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub tenant_uuid: Uuid,
    pub name: Option<String>,
    pub users: Vec<Uuid>,
}

async fn room_response(state: &AppState, room: &RoomRow) -> ApiResult<RoomResponse> {
    let users = state
        .store
        .list_room_users(room.uuid)
        .await?
        .into_iter()
        .map(|m| m.uuid)
        .collect();
    Ok(RoomResponse {
        uuid: room.uuid,
        tenant_uuid: room.tenant_uuid,
        name: room.name.clone(),
        created_at: format_rfc3339(room.created_at)?,
        users,
    })
}

/// GET /1.0/rooms - List rooms.
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(params): Query<ListRoomsParams>,
) -> ApiResult<Json<ListRoomsResponse>> {
    let filter = params.tenant_uuid.map(|uuid| vec![uuid]);
    let rooms = state
        .store
        .list_rooms(filter.as_deref(), params.user_uuid)
        .await?;

    let mut items = Vec::with_capacity(rooms.len());
    for room in &rooms {
        items.push(room_response(&state, room).await?);
    }
    Ok(Json(ListRoomsResponse { items }))
}

/// POST /1.0/rooms - Create a room with exactly two members.
pub async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> ApiResult<Json<RoomResponse>> {
    if req.users.len() != 2 {
        return Err(ApiError::BadRequest(format!(
            "room requires exactly 2 users, got {}",
            req.users.len()
        )));
    }

    let room = RoomRow {
        uuid: Uuid::new_v4(),
        tenant_uuid: req.tenant_uuid,
        name: req.name,
        created_at: OffsetDateTime::now_utc(),
    };
    state.store.create_room(&room, &req.users).await?;
    Ok(Json(room_response(&state, &room).await?))
}

/// GET /1.0/rooms/{uuid} - Get a room. Requires a tenant_uuid scope.
pub async fn get_room(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<RoomResponse>> {
    let tenant_uuid = params
        .tenant_uuid
        .ok_or_else(|| ApiError::BadRequest("tenant_uuid query parameter required".to_string()))?;

    let room = state
        .store
        .get_room(tenant_uuid, uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("room {uuid}")))?;
    Ok(Json(room_response(&state, &room).await?))
}
