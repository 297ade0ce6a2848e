//! Repository trait 定義
//!
//! ドメイン層が必要とする Room レジストリへのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{ConnectionId, Member, RepositoryError, Room, RoomId, UserId};

/// Room レジストリ（roomId → メンバー集合）
///
/// Room は最初の join で暗黙的に作成され、最後のメンバーが抜けた時点で削除される。
/// 変更（join / leave）と参照（peers_of）はすべて直列化されること。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// メンバーを Room に追加（Room がなければ作成）
    ///
    /// 同じ `UserId` のメンバーがすでに存在した場合は置き換え、置き換えられたメンバーを返す。
    async fn join(&self, room_id: RoomId, member: Member) -> Option<Member>;

    /// メンバーを Room から削除
    ///
    /// `connection_id` が一致しない場合は何もしない。
    /// 戻り値は Room が空になって削除されたかどうか。
    async fn leave(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> Result<bool, RepositoryError>;

    /// 接続 ID でメンバーを削除（配信失敗時の切り離し用）
    ///
    /// 戻り値は Room が空になって削除されたかどうか。
    async fn remove_connection(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<bool, RepositoryError>;

    /// 送信者以外のメンバーを取得
    ///
    /// 送信者自身がメンバーでない場合（切断・置き換え済み）は `NotAMember` を返す。
    async fn peers_of(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<Vec<Member>, RepositoryError>;

    /// Room を取得
    async fn get_room(&self, room_id: &RoomId) -> Result<Room, RepositoryError>;

    /// 全 Room を取得
    async fn list_rooms(&self) -> Vec<Room>;

    /// 現在の Room 数
    async fn room_count(&self) -> usize;
}
