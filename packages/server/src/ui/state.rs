//! Server state shared by all handlers.

use std::sync::Arc;

use crate::usecase::{
    ConnectParticipantUseCase, DisconnectParticipantUseCase, GetRoomDetailUseCase,
    GetRoomsUseCase, SendMessageUseCase,
};

use super::RelayConfig;

/// Shared application state
pub struct AppState {
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
    pub config: RelayConfig,
}
