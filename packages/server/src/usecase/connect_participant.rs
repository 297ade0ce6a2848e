//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - Room への参加（暗黙的な Room 作成、同じ userId の置き換え）
//!
//! ### なぜこのテストが必要か
//! - 接続時に Room レジストリと送信キューの両方に登録されることを保証
//! - 置き換えられた古い接続の送信キューが解放されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規参加者の接続
//! - エッジケース：同じ userId での再接続（last-write-wins）
//! - 異常系：同時接続数の上限超過

use std::sync::Arc;

use tsunagi_shared::time::Clock;

use crate::domain::{
    ConnectionId, DetachReason, Member, MessagePusher, PusherChannel, RoomId, RoomRepository,
    Timestamp, UserId,
};

use super::error::ConnectError;

/// 接続が Room に登録された結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedParticipant {
    pub room_id: RoomId,
    pub user_id: UserId,
    /// 受付時に払い出された接続 ID
    pub connection_id: ConnectionId,
    pub joined_at: Timestamp,
    /// 同じ userId で置き換えられた既存の接続
    pub replaced: Option<ConnectionId>,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// Repository（Room レジストリの抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    /// 同時接続数の上限
    max_connections: usize,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        max_connections: usize,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
            max_connections,
        }
    }

    /// 新しい接続を受け付ける余地があるか（アップグレード前の事前チェック用）
    ///
    /// 確定的な判定は `execute` の登録時に行われる。
    pub async fn has_capacity(&self) -> bool {
        self.message_pusher.connection_count().await < self.max_connections
    }

    /// 参加者接続を実行
    ///
    /// # Arguments
    ///
    /// * `room_id` - 参加する Room（存在しなければ作成される）
    /// * `user_id` - 参加者の userId
    /// * `channel` - この接続への送信キュー
    ///
    /// # Returns
    ///
    /// * `Ok(JoinedParticipant)` - 接続成功
    /// * `Err(ConnectError)` - 接続失敗
    pub async fn execute(
        &self,
        room_id: RoomId,
        user_id: UserId,
        channel: PusherChannel,
    ) -> Result<JoinedParticipant, ConnectError> {
        let connection_id = ConnectionId::generate();
        let joined_at = Timestamp::new(self.clock.now_millis());

        // 1. 上限チェックと同時に送信キューを登録（Room に入った時点で配信可能にする）
        if !self
            .message_pusher
            .try_register(connection_id, channel, self.max_connections)
            .await
        {
            return Err(ConnectError::TooManyConnections(self.max_connections));
        }

        // 2. Room に参加
        let member = Member::new(user_id.clone(), connection_id, joined_at);
        let replaced = self
            .repository
            .join(room_id.clone(), member)
            .await
            .map(|previous| previous.connection_id);

        // 3. 置き換えられた接続の送信キューを解放（その接続の送信ループが終了する）
        if let Some(previous) = replaced {
            tracing::info!(
                "User '{}' rejoined room '{}'; connection '{}' replaced by '{}'",
                user_id,
                room_id,
                previous,
                connection_id
            );
            self.message_pusher
                .unregister(previous, DetachReason::Replaced)
                .await;
        }

        Ok(JoinedParticipant {
            room_id,
            user_id,
            connection_id,
            joined_at,
            replaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::MockMessagePusher,
        infrastructure::{
            message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository,
        },
    };
    use crate::domain::pusher_channel;
    use mockall::predicate::{always, eq};
    use tsunagi_shared::time::FixedClock;

    fn create_test_repository() -> Arc<InMemoryRoomRepository> {
        Arc::new(InMemoryRoomRepository::new(Arc::new(FixedClock::new(1000))))
    }

    fn create_usecase(
        repository: Arc<InMemoryRoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        max_connections: usize,
    ) -> ConnectParticipantUseCase {
        ConnectParticipantUseCase::new(
            repository,
            message_pusher,
            Arc::new(FixedClock::new(5000)),
            max_connections,
        )
    }

    fn room_id() -> RoomId {
        RoomId::new("room123".to_string()).unwrap()
    }

    fn user_id(value: &str) -> UserId {
        UserId::new(value.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_connect_participant_success() {
        // テスト項目: 新規参加者が接続でき、Room が作成される
        // given (前提条件):
        let repository = create_test_repository();
        let message_pusher = Arc::new(WebSocketMessagePusher::new());
        let usecase = create_usecase(repository.clone(), message_pusher.clone(), 10);
        let (tx, _rx) = pusher_channel(4);

        // when (操作):
        let result = usecase.execute(room_id(), user_id("alice"), tx).await;

        // then (期待する結果):
        let joined = result.unwrap();
        assert_eq!(joined.user_id, user_id("alice"));
        assert_eq!(joined.joined_at, Timestamp::new(5000));
        assert!(joined.replaced.is_none());

        let room = repository.get_room(&room_id()).await.unwrap();
        assert!(room.contains_connection(joined.connection_id));
        assert_eq!(message_pusher.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_connect_same_user_replaces_previous_connection() {
        // テスト項目: 同じ userId で再接続すると古い接続が置き換えられ、その送信キューが閉じる
        // given (前提条件):
        let repository = create_test_repository();
        let message_pusher = Arc::new(WebSocketMessagePusher::new());
        let usecase = create_usecase(repository.clone(), message_pusher.clone(), 10);
        let (old_tx, mut old_rx) = pusher_channel(4);
        let (new_tx, _new_rx) = pusher_channel(4);
        let first = usecase
            .execute(room_id(), user_id("alice"), old_tx)
            .await
            .unwrap();

        // when (操作):
        let second = usecase
            .execute(room_id(), user_id("alice"), new_tx)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(second.replaced, Some(first.connection_id));
        assert_ne!(first.connection_id, second.connection_id);
        assert_eq!(old_rx.frames.recv().await, None);
        assert_eq!(old_rx.detach.try_recv(), Ok(DetachReason::Replaced));

        let room = repository.get_room(&room_id()).await.unwrap();
        assert_eq!(room.member_count(), 1);
        assert!(room.contains_connection(second.connection_id));
        assert_eq!(message_pusher.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_connect_rejected_when_limit_reached() {
        // テスト項目: 同時接続数の上限に達していると接続が拒否され、Room は作成されない
        // given (前提条件):
        let repository = create_test_repository();
        let mut message_pusher = MockMessagePusher::new();
        message_pusher
            .expect_try_register()
            .with(always(), always(), eq(2_usize))
            .times(1)
            .return_const(false);
        let usecase = create_usecase(repository.clone(), Arc::new(message_pusher), 2);
        let (tx, _rx) = pusher_channel(4);

        // when (操作):
        let result = usecase.execute(room_id(), user_id("alice"), tx).await;

        // then (期待する結果):
        assert_eq!(result, Err(ConnectError::TooManyConnections(2)));
        assert_eq!(repository.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_has_capacity_reflects_open_connections() {
        // テスト項目: 開いている接続数が上限未満のときだけ has_capacity が true になる
        // given (前提条件):
        let repository = create_test_repository();
        let message_pusher = Arc::new(WebSocketMessagePusher::new());
        let usecase = create_usecase(repository, message_pusher, 1);
        let (tx, _rx) = pusher_channel(4);
        let before = usecase.has_capacity().await;

        // when (操作):
        usecase
            .execute(room_id(), user_id("alice"), tx)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(before);
        assert!(!usecase.has_capacity().await);
    }

    #[tokio::test]
    async fn test_connect_unregisters_only_replaced_connection() {
        // テスト項目: 置き換えが発生した場合のみ unregister が呼ばれる
        // given (前提条件):
        let repository = create_test_repository();
        let existing = ConnectionId::generate();
        repository
            .join(
                room_id(),
                Member::new(user_id("alice"), existing, Timestamp::new(1)),
            )
            .await;

        let mut message_pusher = MockMessagePusher::new();
        message_pusher
            .expect_try_register()
            .times(1)
            .return_const(true);
        message_pusher
            .expect_unregister()
            .with(eq(existing), eq(DetachReason::Replaced))
            .times(1)
            .return_const(());
        let usecase = create_usecase(repository.clone(), Arc::new(message_pusher), 10);
        let (tx, _rx) = pusher_channel(4);

        // when (操作):
        let result = usecase.execute(room_id(), user_id("alice"), tx).await;

        // then (期待する結果):
        assert_eq!(result.unwrap().replaced, Some(existing));
    }

    #[tokio::test]
    async fn test_concurrent_connects_never_exceed_limit() {
        // テスト項目: 同時に接続しても登録数は上限を超えない
        // given (前提条件):
        let repository = create_test_repository();
        let message_pusher = Arc::new(WebSocketMessagePusher::new());
        let usecase = Arc::new(create_usecase(repository, message_pusher.clone(), 3));

        // when (操作):
        let mut handles = Vec::new();
        let mut receivers = Vec::new();
        for i in 0..10 {
            let (tx, rx) = pusher_channel(4);
            receivers.push(rx);
            let usecase = usecase.clone();
            handles.push(tokio::spawn(async move {
                usecase
                    .execute(room_id(), user_id(&format!("user{i}")), tx)
                    .await
            }));
        }
        let mut accepted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(ConnectError::TooManyConnections(3)) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        // then (期待する結果):
        assert_eq!(accepted, 3);
        assert_eq!(rejected, 7);
        assert_eq!(message_pusher.connection_count().await, 3);
    }
}
