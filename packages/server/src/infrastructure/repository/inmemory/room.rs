//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! `HashMap<RoomId, Room>` をインメモリのレジストリとして使用します。
//!
//! すべての操作は単一の `Mutex` の内側で行われるため、
//! join / leave / peers_of は互いに直列化されます。
//! プロセスが終了すると Room とメンバーシップはすべて失われます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tsunagi_shared::time::Clock;

use crate::domain::{
    ConnectionId, Member, RepositoryError, Room, RoomId, RoomRepository, Timestamp, UserId,
};

/// インメモリ Room Repository 実装
pub struct InMemoryRoomRepository {
    rooms: Mutex<HashMap<RoomId, Room>>,
    /// Room 作成時刻の取得元
    clock: Arc<dyn Clock>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// 空になった Room をレジストリから削除する
    fn collect_if_empty(rooms: &mut HashMap<RoomId, Room>, room_id: &RoomId) -> bool {
        if rooms.get(room_id).is_some_and(Room::is_empty) {
            rooms.remove(room_id);
            tracing::debug!("Room '{}' is empty and was removed", room_id);
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn join(&self, room_id: RoomId, member: Member) -> Option<Member> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::debug!("Room '{}' created", room_id);
            Room::new(room_id, Timestamp::new(self.clock.now_millis()))
        });
        room.join(member)
    }

    async fn leave(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> Result<bool, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))?;
        room.leave(user_id, connection_id);
        Ok(Self::collect_if_empty(&mut rooms, room_id))
    }

    async fn remove_connection(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<bool, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))?;
        room.remove_connection(connection_id);
        Ok(Self::collect_if_empty(&mut rooms, room_id))
    }

    async fn peers_of(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<Vec<Member>, RepositoryError> {
        let rooms = self.rooms.lock().await;
        let room = rooms
            .get(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))?;
        if !room.contains_connection(connection_id) {
            return Err(RepositoryError::NotAMember {
                room_id: room_id.to_string(),
                connection_id: connection_id.to_string(),
            });
        }
        Ok(room.peers_of(connection_id))
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.lock().await;
        let mut list: Vec<Room> = rooms.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsunagi_shared::time::FixedClock;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - InMemoryRoomRepository の join / leave / peers_of
    // - 空になった Room のガベージコレクション
    //
    // 【なぜこのテストが必要か】
    // - Room レジストリはリレーで唯一の共有可変状態
    // - Room が残り続けるとチャーンでメモリが増え続ける
    //
    // 【どのようなシナリオをテストするか】
    // 1. 最初の join で Room が作成される
    // 2. 最後のメンバーの leave で Room が削除される
    // 3. 置き換え済みの古い接続の leave は新しい接続に影響しない
    // 4. Room ごとにメンバーが分離されている
    // ========================================

    fn create_test_repository() -> InMemoryRoomRepository {
        InMemoryRoomRepository::new(Arc::new(FixedClock::new(1000)))
    }

    fn room_id(value: &str) -> RoomId {
        RoomId::new(value.to_string()).unwrap()
    }

    fn member(user: &str) -> Member {
        Member::new(
            UserId::new(user.to_string()).unwrap(),
            ConnectionId::generate(),
            Timestamp::new(2000),
        )
    }

    #[tokio::test]
    async fn test_join_creates_room() {
        // テスト項目: 最初の join で Room が作成される
        // given (前提条件):
        let repo = create_test_repository();

        // when (操作):
        let replaced = repo.join(room_id("room123"), member("alice")).await;

        // then (期待する結果):
        assert!(replaced.is_none());
        assert_eq!(repo.room_count().await, 1);
        let room = repo.get_room(&room_id("room123")).await.unwrap();
        assert_eq!(room.member_count(), 1);
        assert_eq!(room.created_at, Timestamp::new(1000));
    }

    #[tokio::test]
    async fn test_last_leave_removes_room() {
        // テスト項目: 最後のメンバーが leave すると Room が削除される
        // given (前提条件):
        let repo = create_test_repository();
        let alice = member("alice");
        let bob = member("bob");
        repo.join(room_id("room123"), alice.clone()).await;
        repo.join(room_id("room123"), bob.clone()).await;

        // when (操作):
        let first = repo
            .leave(&room_id("room123"), &bob.user_id, bob.connection_id)
            .await;
        let second = repo
            .leave(&room_id("room123"), &alice.user_id, alice.connection_id)
            .await;

        // then (期待する結果):
        assert_eq!(first, Ok(false));
        assert_eq!(second, Ok(true));
        assert_eq!(repo.room_count().await, 0);
        assert!(repo.get_room(&room_id("room123")).await.is_err());
    }

    #[tokio::test]
    async fn test_stale_leave_keeps_replacement() {
        // テスト項目: 同じ userId で再接続した後、古い接続の leave は新しい接続を残す
        // given (前提条件):
        let repo = create_test_repository();
        let old = member("alice");
        let new = member("alice");
        repo.join(room_id("room123"), old.clone()).await;
        let replaced = repo.join(room_id("room123"), new.clone()).await;

        // when (操作):
        let result = repo
            .leave(&room_id("room123"), &old.user_id, old.connection_id)
            .await;

        // then (期待する結果):
        assert_eq!(replaced, Some(old));
        assert_eq!(result, Ok(false));
        let room = repo.get_room(&room_id("room123")).await.unwrap();
        assert!(room.contains_connection(new.connection_id));
    }

    #[tokio::test]
    async fn test_leave_unknown_room() {
        // テスト項目: 存在しない Room からの leave はエラーを返す
        // given (前提条件):
        let repo = create_test_repository();
        let alice = member("alice");

        // when (操作):
        let result = repo
            .leave(&room_id("ghost"), &alice.user_id, alice.connection_id)
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::RoomNotFound("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn test_peers_are_isolated_per_room() {
        // テスト項目: peers_of は同じ Room のメンバーのみを返す
        // given (前提条件):
        let repo = create_test_repository();
        let alice = member("alice");
        let bob = member("bob");
        let carol = member("carol");
        repo.join(room_id("room-a"), alice.clone()).await;
        repo.join(room_id("room-a"), bob.clone()).await;
        repo.join(room_id("room-b"), carol.clone()).await;

        // when (操作):
        let peers = repo
            .peers_of(&room_id("room-a"), alice.connection_id)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(peers, vec![bob]);
        assert_eq!(repo.room_count().await, 2);
    }

    #[tokio::test]
    async fn test_peers_of_rejects_non_member() {
        // テスト項目: メンバーでない接続からの peers_of は NotAMember を返す
        // given (前提条件):
        let repo = create_test_repository();
        repo.join(room_id("room123"), member("alice")).await;
        let stranger = ConnectionId::generate();

        // when (操作):
        let result = repo.peers_of(&room_id("room123"), stranger).await;

        // then (期待する結果):
        assert!(matches!(result, Err(RepositoryError::NotAMember { .. })));
    }

    #[tokio::test]
    async fn test_remove_connection_collects_room() {
        // テスト項目: remove_connection で最後のメンバーを削除すると Room も削除される
        // given (前提条件):
        let repo = create_test_repository();
        let alice = member("alice");
        repo.join(room_id("room123"), alice.clone()).await;

        // when (操作):
        let result = repo
            .remove_connection(&room_id("room123"), alice.connection_id)
            .await;

        // then (期待する結果):
        assert_eq!(result, Ok(true));
        assert_eq!(repo.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_list_rooms_sorted_by_id() {
        // テスト項目: list_rooms は roomId 順に返す
        // given (前提条件):
        let repo = create_test_repository();
        repo.join(room_id("zeta"), member("alice")).await;
        repo.join(room_id("alpha"), member("bob")).await;

        // when (操作):
        let rooms = repo.list_rooms().await;

        // then (期待する結果):
        let ids: Vec<&str> = rooms.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }
}
