//! UseCase: Room 一覧取得

use std::sync::Arc;

use crate::domain::{Room, RoomRepository};

/// Room 一覧取得のユースケース
pub struct GetRoomsUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomsUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    /// 現在存在する全ての Room を roomId 順に返す
    pub async fn execute(&self) -> Vec<Room> {
        self.repository.list_rooms().await
    }
}
