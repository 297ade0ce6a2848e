//! UseCase: Room 詳細取得

use std::sync::Arc;

use crate::domain::{Room, RoomId, RoomRepository};

use super::error::GetRoomDetailError;

/// Room 詳細取得のユースケース
pub struct GetRoomDetailUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomDetailUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    /// roomId を指定して Room を取得
    pub async fn execute(&self, room_id: String) -> Result<Room, GetRoomDetailError> {
        let room_id = RoomId::try_from(room_id)
            .map_err(|e| GetRoomDetailError::InvalidRoomId(e.to_string()))?;
        self.repository
            .get_room(&room_id)
            .await
            .map_err(|_| GetRoomDetailError::RoomNotFound)
    }
}
