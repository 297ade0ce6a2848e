//! Value Object 定義
//!
//! 生成時に検証を行い、不正な値を持つインスタンスが存在しないことを保証します。

use std::fmt;

use uuid::Uuid;

use super::error::ValueObjectError;

/// `RoomId` / `UserId` の最大文字数
pub const MAX_IDENTIFIER_CHARS: usize = 64;

/// 1 メッセージあたりの本文の最大バイト数（UTF-8）
pub const MAX_MESSAGE_TEXT_BYTES: usize = 4096;

fn validate_identifier(field: &'static str, value: &str) -> Result<(), ValueObjectError> {
    if value.trim().is_empty() {
        return Err(ValueObjectError::Empty(field));
    }
    let chars = value.chars().count();
    if chars > MAX_IDENTIFIER_CHARS {
        return Err(ValueObjectError::TooLong {
            field,
            max: MAX_IDENTIFIER_CHARS,
            actual: chars,
        });
    }
    if value.chars().any(char::is_control) {
        return Err(ValueObjectError::Malformed(field));
    }
    Ok(())
}

/// Room の識別子（接続時のクエリパラメータ `roomId`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_identifier("roomId", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ユーザーの識別子（接続時のクエリパラメータ `userId`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_identifier("userId", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 接続ごとに受付時に払い出される識別子
///
/// 同じ `UserId` で再接続した場合でも、新しい接続は別の `ConnectionId` を持つ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// 新しい ConnectionId を生成（UUID v4）
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// メッセージ本文
///
/// 空文字列は許容する。上限は [`MAX_MESSAGE_TEXT_BYTES`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageText(String);

impl MessageText {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.len() > MAX_MESSAGE_TEXT_BYTES {
            return Err(ValueObjectError::TooLong {
                field: "text",
                max: MAX_MESSAGE_TEXT_BYTES,
                actual: value.len(),
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageText {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unix タイムスタンプ（ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
