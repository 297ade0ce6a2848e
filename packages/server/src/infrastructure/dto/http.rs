//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// `GET /api/rooms` の要素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    /// userId の一覧（ソート済み）
    pub members: Vec<String>,
    pub member_count: usize,
    /// RFC 3339 (UTC)
    pub created_at: String,
}

/// `GET /api/rooms/{room_id}` のレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: String,
    pub members: Vec<MemberDetailDto>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetailDto {
    pub user_id: String,
    pub connection_id: String,
    pub joined_at: String,
}
