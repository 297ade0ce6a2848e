//! Entity 定義
//!
//! - `Member`: Room に所属する 1 接続
//! - `Room`: 同じ `RoomId` を持つ接続の集合
//! - `RelayMessage`: 中継される 1 メッセージ（永続化しない）

use std::collections::HashMap;

use super::value_object::{ConnectionId, MessageText, RoomId, Timestamp, UserId};

/// Room のメンバー（1 接続に対応）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
    pub joined_at: Timestamp,
}

impl Member {
    pub fn new(user_id: UserId, connection_id: ConnectionId, joined_at: Timestamp) -> Self {
        Self {
            user_id,
            connection_id,
            joined_at,
        }
    }
}

/// チャットルーム
///
/// メンバーは `UserId` をキーに保持する。同じ `UserId` で参加し直した場合は
/// 後から来た接続が前の接続を置き換える（last-write-wins）。
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub members: HashMap<UserId, Member>,
    pub created_at: Timestamp,
}

impl Room {
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self {
            id,
            members: HashMap::new(),
            created_at,
        }
    }

    /// メンバーを追加し、置き換えられた既存メンバーがあれば返す
    pub fn join(&mut self, member: Member) -> Option<Member> {
        self.members.insert(member.user_id.clone(), member)
    }

    /// `user_id` と `connection_id` の両方が一致する場合のみメンバーを削除する
    ///
    /// 置き換え済みの古い接続が後から切断しても、新しい接続は残る。
    pub fn leave(&mut self, user_id: &UserId, connection_id: ConnectionId) -> bool {
        match self.members.get(user_id) {
            Some(member) if member.connection_id == connection_id => {
                self.members.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// `connection_id` を持つメンバーを削除する
    pub fn remove_connection(&mut self, connection_id: ConnectionId) -> bool {
        let before = self.members.len();
        self.members
            .retain(|_, member| member.connection_id != connection_id);
        self.members.len() != before
    }

    /// 指定した接続以外のメンバー
    pub fn peers_of(&self, connection_id: ConnectionId) -> Vec<Member> {
        self.members
            .values()
            .filter(|member| member.connection_id != connection_id)
            .cloned()
            .collect()
    }

    pub fn contains_connection(&self, connection_id: ConnectionId) -> bool {
        self.members
            .values()
            .any(|member| member.connection_id == connection_id)
    }

    /// `UserId` 順にソートしたメンバー一覧
    pub fn sorted_members(&self) -> Vec<Member> {
        let mut members: Vec<Member> = self.members.values().cloned().collect();
        members.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// 中継されるメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub sender: UserId,
    pub text: MessageText,
    /// サーバーが受信した時刻
    pub timestamp: Timestamp,
}

impl RelayMessage {
    pub fn new(sender: UserId, text: MessageText, timestamp: Timestamp) -> Self {
        Self {
            sender,
            text,
            timestamp,
        }
    }
}
