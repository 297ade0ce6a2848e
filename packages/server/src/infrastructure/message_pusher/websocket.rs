//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの有界キュー（`PusherChannel`）を管理
//! - 同時接続数の上限を登録時に強制
//! - クライアントへのメッセージ送信（broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された送信キューを受け取り、メッセージ送信に使用します。
//! キューから WebSocket への書き込みは接続ごとの送信ループが行うため、
//! ここでの送信は `try_send` のみで、遅いクライアントを待つことはありません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc::error::TrySendError};

use crate::domain::{ConnectionId, DetachReason, MessagePushError, MessagePusher, PusherChannel};

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new();
/// let (channel, receiver) = pusher_channel(64);
/// if pusher.try_register(connection_id, channel, 10_000).await {
///     pusher.broadcast(vec![connection_id], "{\"senderId\":\"alice\",\"text\":\"hi\",\"timestamp\":0}").await;
/// }
/// ```
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// Key: ConnectionId
    /// Value: 接続の送信キュー
    channels: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    /// 新しい WebSocketMessagePusher を作成
    pub fn new() -> Self {
        Self::default()
    }

    fn try_push(
        connection_id: ConnectionId,
        channel: &PusherChannel,
        content: &str,
    ) -> Result<(), MessagePushError> {
        channel
            .try_send(content.to_string())
            .map_err(|e| match e {
                TrySendError::Full(_) => MessagePushError::QueueFull(connection_id.to_string()),
                TrySendError::Closed(_) => {
                    MessagePushError::QueueClosed(connection_id.to_string())
                }
            })
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn try_register(
        &self,
        connection_id: ConnectionId,
        channel: PusherChannel,
        max_connections: usize,
    ) -> bool {
        // 上限チェックと挿入を同じロックの中で行う
        let mut channels = self.channels.lock().await;
        if channels.len() >= max_connections {
            tracing::debug!(
                "Refusing connection '{}': {} of {} slots in use",
                connection_id,
                channels.len(),
                max_connections
            );
            return false;
        }
        channels.insert(connection_id, channel);
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
        true
    }

    async fn unregister(&self, connection_id: ConnectionId, reason: DetachReason) {
        let removed = self.channels.lock().await.remove(&connection_id);
        if let Some(channel) = removed {
            channel.detach(reason);
            tracing::debug!(
                "Connection '{}' unregistered from MessagePusher ({:?})",
                connection_id,
                reason
            );
        }
    }

    async fn broadcast(&self, targets: Vec<ConnectionId>, content: &str) -> Vec<ConnectionId> {
        let channels = self.channels.lock().await;
        let mut failed = Vec::new();

        for target in targets {
            let result = match channels.get(&target) {
                Some(channel) => Self::try_push(target, channel, content),
                None => Err(MessagePushError::ConnectionNotFound(target.to_string())),
            };
            match result {
                Ok(()) => tracing::debug!("Broadcasted message to connection '{}'", target),
                Err(e) => {
                    // 一部の送信失敗は他の接続への配信に影響させない
                    tracing::warn!("Failed to push message: {}", e);
                    failed.push(target);
                }
            }
        }

        failed
    }

    async fn connection_count(&self) -> usize {
        self.channels.lock().await.len()
    }
}
