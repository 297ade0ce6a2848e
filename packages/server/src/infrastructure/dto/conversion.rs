//! Conversion logic between DTOs and domain entities.

use tsunagi_shared::time::timestamp_to_rfc3339;

use crate::domain::{Member, RelayMessage, Room};
use crate::infrastructure::dto::{http, websocket};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<RelayMessage> for websocket::OutgoingMessage {
    fn from(message: RelayMessage) -> Self {
        Self {
            sender_id: message.sender.into_string(),
            text: message.text.into_string(),
            timestamp: message.timestamp.value(),
        }
    }
}

impl From<Member> for http::MemberDetailDto {
    fn from(member: Member) -> Self {
        Self {
            user_id: member.user_id.into_string(),
            connection_id: member.connection_id.to_string(),
            joined_at: timestamp_to_rfc3339(member.joined_at.value()),
        }
    }
}

impl From<&Room> for http::RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            member_count: room.member_count(),
            members: room
                .sorted_members()
                .into_iter()
                .map(|member| member.user_id.into_string())
                .collect(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

impl From<&Room> for http::RoomDetailDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            members: room
                .sorted_members()
                .into_iter()
                .map(Into::into)
                .collect(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}
