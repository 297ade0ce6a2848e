//! ドメイン層
//!
//! Room Relay のドメインモデル（Value Object、Entity）と、
//! ドメイン層が必要とするポート（Repository、MessagePusher）を定義します。

pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use entity::{Member, RelayMessage, Room};
pub use error::{MessagePushError, RepositoryError, ValueObjectError};
pub use message_pusher::{
    DetachReason, MessagePusher, PusherChannel, PusherReceiver, pusher_channel,
};
pub use repository::RoomRepository;
pub use value_object::{
    ConnectionId, MAX_IDENTIFIER_CHARS, MAX_MESSAGE_TEXT_BYTES, MessageText, RoomId, Timestamp,
    UserId,
};

#[cfg(test)]
pub use message_pusher::MockMessagePusher;
