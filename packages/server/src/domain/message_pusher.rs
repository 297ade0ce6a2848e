//! MessagePusher trait 定義
//!
//! 接続中のクライアントへメッセージを届けるためのインターフェース。
//! WebSocket などの具体的な通信手段は Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};

use super::ConnectionId;

/// 接続が送信キューから切り離された理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachReason {
    /// 同じ userId の新しい接続に置き換えられた
    Replaced,
    /// 送信キューが溢れた・閉じていたため Room から切り離された
    Evicted,
    /// 通常の切断処理
    Disconnected,
}

/// クライアントごとの送信キュー（送信側、有界）
///
/// Registry が保持し、切り離す際に理由を送ってからキューを閉じる。
#[derive(Debug)]
pub struct PusherChannel {
    frames: mpsc::Sender<String>,
    detach: oneshot::Sender<DetachReason>,
}

/// クライアントごとの送信キュー（受信側）
///
/// 接続の送信ループが保持する。`frames` が閉じた後、`detach` で理由を確認できる。
#[derive(Debug)]
pub struct PusherReceiver {
    pub frames: mpsc::Receiver<String>,
    pub detach: oneshot::Receiver<DetachReason>,
}

/// `capacity` フレームまで保持できる送信キューを作成
pub fn pusher_channel(capacity: usize) -> (PusherChannel, PusherReceiver) {
    let (frames_tx, frames_rx) = mpsc::channel(capacity);
    let (detach_tx, detach_rx) = oneshot::channel();
    (
        PusherChannel {
            frames: frames_tx,
            detach: detach_tx,
        },
        PusherReceiver {
            frames: frames_rx,
            detach: detach_rx,
        },
    )
}

impl PusherChannel {
    /// 待たずにキューへ積む
    pub fn try_send(&self, content: String) -> Result<(), TrySendError<String>> {
        self.frames.try_send(content)
    }

    /// 理由を通知してキューを閉じる
    ///
    /// 理由はキューが閉じるより先に届くため、受信側は `frames` の終了後に必ず読める。
    pub fn detach(self, reason: DetachReason) {
        let _ = self.detach.send(reason);
        drop(self.frames);
    }
}

/// メッセージ通知のインターフェース
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 登録数が `max_connections` 未満であれば接続の送信キューを登録する
    ///
    /// 上限チェックと登録は不可分に行われる。登録できなければ `false`。
    async fn try_register(
        &self,
        connection_id: ConnectionId,
        channel: PusherChannel,
        max_connections: usize,
    ) -> bool;

    /// 接続の送信キューを登録解除
    ///
    /// 理由が通知されたうえでキューが閉じるため、対応する接続の送信ループは終了する。
    async fn unregister(&self, connection_id: ConnectionId, reason: DetachReason);

    /// 複数の接続に送信し、配信に失敗した接続を返す
    ///
    /// 1 つの接続への送信失敗が他の接続への配信を妨げてはならない。
    async fn broadcast(&self, targets: Vec<ConnectionId>, content: &str) -> Vec<ConnectionId>;

    /// 登録されている接続数
    async fn connection_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_detach_reason_is_readable_after_queue_closes() {
        // テスト項目: detach すると、キューの終了後に切り離しの理由が読める
        // given (前提条件):
        let (channel, mut receiver) = pusher_channel(4);
        channel.try_send("queued".to_string()).unwrap();

        // when (操作):
        channel.detach(DetachReason::Evicted);

        // then (期待する結果):
        assert_eq!(receiver.frames.recv().await, Some("queued".to_string()));
        assert_eq!(receiver.frames.recv().await, None);
        assert_eq!(receiver.detach.try_recv(), Ok(DetachReason::Evicted));
    }
}
