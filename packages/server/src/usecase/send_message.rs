//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - サーバー受信時刻の付与、送信者以外へのファンアウト、配信失敗した接続の切り離し
//!
//! ### なぜこのテストが必要か
//! - 送信者にメッセージが返らないこと（No self-echo）を保証
//! - 他の Room に漏れないこと（Room isolation）を保証
//! - 1 つの接続の配信失敗が送信者や他の接続に波及しないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：複数メンバーへのファンアウト
//! - エッジケース：送信者のみが接続している / Room が既に存在しない
//! - 異常系：一部の接続への配信失敗

use std::sync::Arc;

use tsunagi_shared::time::Clock;

use crate::{
    domain::{
        ConnectionId, DetachReason, MessagePusher, MessageText, RelayMessage, RoomId,
        RoomRepository, Timestamp, UserId,
    },
    infrastructure::dto::websocket::OutgoingMessage,
};

use super::error::SendMessageError;

/// ファンアウトの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// 中継したメッセージ（サーバー受信時刻付き）
    pub message: RelayMessage,
    /// 配信キューに積めた接続数
    pub delivered: usize,
    /// 配信に失敗し、Room から切り離された接続
    pub evicted: Vec<ConnectionId>,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// Repository（Room レジストリの抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    /// 受信時刻の取得元（クライアントの申告時刻は使わない）
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `room_id` - 送信者が所属する Room
    /// * `sender` - 送信者の userId
    /// * `sender_connection` - 送信者の接続 ID（ファンアウト対象から除外される）
    /// * `text` - メッセージ本文
    ///
    /// # Returns
    ///
    /// * `Ok(DeliveryReport)` - ファンアウト結果。Room が既に存在しない場合は配信数 0
    /// * `Err(SendMessageError)` - 送信フレームを生成できなかった
    pub async fn execute(
        &self,
        room_id: &RoomId,
        sender: UserId,
        sender_connection: ConnectionId,
        text: MessageText,
    ) -> Result<DeliveryReport, SendMessageError> {
        let timestamp = Timestamp::new(self.clock.now_millis());
        let message = RelayMessage::new(sender, text, timestamp);

        // 1. ファンアウト対象を取得（送信者以外の全てのメンバー）
        let targets: Vec<ConnectionId> = match self
            .repository
            .peers_of(room_id, sender_connection)
            .await
        {
            Ok(peers) => peers.into_iter().map(|m| m.connection_id).collect(),
            Err(e) => {
                // 切断処理と競合した場合は何もしない
                tracing::debug!("Dropping message from '{}': {}", message.sender, e);
                return Ok(DeliveryReport {
                    message,
                    delivered: 0,
                    evicted: Vec::new(),
                });
            }
        };

        // 2. 送信フレームを生成
        let frame = serde_json::to_string(&OutgoingMessage::from(message.clone()))
            .map_err(|e| SendMessageError::Serialization(e.to_string()))?;

        // 3. ブロードキャスト
        let target_count = targets.len();
        let evicted = self.message_pusher.broadcast(targets, &frame).await;

        // 4. 配信に失敗した接続を Room から切り離す
        for connection_id in &evicted {
            self.evict(room_id, *connection_id).await;
        }

        Ok(DeliveryReport {
            message,
            delivered: target_count - evicted.len(),
            evicted,
        })
    }

    async fn evict(&self, room_id: &RoomId, connection_id: ConnectionId) {
        match self
            .repository
            .remove_connection(room_id, connection_id)
            .await
        {
            Ok(room_removed) => {
                tracing::warn!(
                    "Evicted connection '{}' from room '{}' after failed delivery",
                    connection_id,
                    room_id
                );
                if room_removed {
                    tracing::info!("Room '{}' removed (no members left)", room_id);
                }
            }
            Err(e) => tracing::debug!("Eviction of '{}' skipped: {}", connection_id, e),
        }
        // 切り離された接続は再接続可能なクローズで終了する
        self.message_pusher
            .unregister(connection_id, DetachReason::Evicted)
            .await;
    }
}
