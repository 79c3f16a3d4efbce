//! Room repository trait.

use crate::error::StoreResult;
use crate::models::{RoomRow, RoomUserRow};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for chat room operations.
#[async_trait]
pub trait RoomRepo: Send + Sync {
    /// Create a room with its members. A room holds exactly two users;
    /// any other member count is a constraint violation.
    async fn create_room(&self, room: &RoomRow, members: &[Uuid]) -> StoreResult<()>;

    /// Get a room by uuid within a tenant scope.
    async fn get_room(&self, tenant_uuid: Uuid, uuid: Uuid) -> StoreResult<Option<RoomRow>>;

    /// List rooms, optionally scoped to a tenant and/or a member user.
    async fn list_rooms(
        &self,
        tenant_uuids: Option<&[Uuid]>,
        user_uuid: Option<Uuid>,
    ) -> StoreResult<Vec<RoomRow>>;

    /// List the members of a room.
    async fn list_room_users(&self, room_uuid: Uuid) -> StoreResult<Vec<RoomUserRow>>;
}
