//! UseCase 層
//!
//! Room Relay の操作（接続・送信・切断・参照）を、ドメイン層のポートだけに依存して実装します。

mod connect_participant;
mod disconnect_participant;
mod error;
mod get_room_detail;
mod get_rooms;
mod send_message;

pub use connect_participant::{ConnectParticipantUseCase, JoinedParticipant};
pub use disconnect_participant::{DisconnectOutcome, DisconnectParticipantUseCase};
pub use error::{ConnectError, GetRoomDetailError, SendMessageError};
pub use get_room_detail::GetRoomDetailUseCase;
pub use get_rooms::GetRoomsUseCase;
pub use send_message::{DeliveryReport, SendMessageUseCase};
