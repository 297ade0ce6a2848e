//! ドメイン層のエラー型

use thiserror::Error;

/// Value Object の生成時エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    /// 空文字列（前後の空白のみを含む）
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// 最大長を超えている
    #[error("{field} exceeds {max} (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// 形式が不正
    #[error("{0} is malformed")]
    Malformed(&'static str),
}

/// Repository 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// 指定された Room が存在しない
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    /// 指定された接続が Room のメンバーではない
    #[error("Connection '{connection_id}' is not a member of room '{room_id}'")]
    NotAMember {
        room_id: String,
        connection_id: String,
    },
}

/// MessagePusher 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    /// 接続が登録されていない
    #[error("Connection '{0}' is not registered")]
    ConnectionNotFound(String),

    /// 送信キューが満杯（受信側が遅い）
    #[error("Outbound queue for connection '{0}' is full")]
    QueueFull(String),

    /// 送信キューが閉じている（トランスポートが終了済み）
    #[error("Outbound queue for connection '{0}' is closed")]
    QueueClosed(String),
}
