//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - Room からの削除、空になった Room の削除、送信キューの登録解除
//!
//! ### なぜこのテストが必要か
//! - 切断後の接続にメッセージが配信されないことを保証
//! - 短命な Room が残り続けないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の切断
//! - エッジケース：最後の参加者の切断（Room 削除）
//! - エッジケース：切断済み・置き換え済みの接続の切断（冪等）

use std::sync::Arc;

use crate::domain::{
    ConnectionId, DetachReason, MessagePusher, RoomId, RoomRepository, UserId,
};

/// 切断処理の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectOutcome {
    /// Room が空になり削除されたか
    pub room_removed: bool,
}

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// Repository（Room レジストリの抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 参加者切断を実行
    ///
    /// 残りのメンバーへの通知は行わない。何度呼んでも安全。
    pub async fn execute(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> DisconnectOutcome {
        // 1. Room から削除（空になれば Room も削除）
        let room_removed = match self
            .repository
            .leave(room_id, user_id, connection_id)
            .await
        {
            Ok(room_removed) => room_removed,
            Err(e) => {
                tracing::debug!("Connection '{}' already detached: {}", connection_id, e);
                false
            }
        };

        // 2. 送信キューを登録解除
        self.message_pusher
            .unregister(connection_id, DetachReason::Disconnected)
            .await;

        if room_removed {
            tracing::info!("Room '{}' removed (no members left)", room_id);
        }

        DisconnectOutcome { room_removed }
    }
}
