//! UseCase 層のエラー型

use thiserror::Error;

/// 接続処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// 同時接続数の上限に達している
    #[error("Connection limit of {0} reached")]
    TooManyConnections(usize),
}

/// メッセージ送信処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    /// 送信フレームのシリアライズに失敗
    #[error("Failed to serialize outgoing frame: {0}")]
    Serialization(String),
}

/// Room 詳細取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomDetailError {
    /// roomId の形式が不正
    #[error("Invalid room id: {0}")]
    InvalidRoomId(String),

    /// Room が存在しない
    #[error("Room not found")]
    RoomNotFound,
}
