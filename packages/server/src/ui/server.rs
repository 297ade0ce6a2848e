//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::usecase::{
    ConnectParticipantUseCase, DisconnectParticipantUseCase, GetRoomDetailUseCase,
    GetRoomsUseCase, SendMessageUseCase,
};

use super::{
    RelayConfig,
    handler::{get_room_detail, get_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket room relay server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     connect_participant_usecase,
///     disconnect_participant_usecase,
///     send_message_usecase,
///     get_rooms_usecase,
///     get_room_detail_usecase,
///     RelayConfig::default(),
/// );
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `connect_participant_usecase` - UseCase for participant connection
    /// * `disconnect_participant_usecase` - UseCase for participant disconnection
    /// * `send_message_usecase` - UseCase for message fan-out
    /// * `get_rooms_usecase` - UseCase for getting rooms list
    /// * `get_room_detail_usecase` - UseCase for getting room detail
    /// * `config` - Heartbeat, timeout and queue settings
    pub fn new(
        connect_participant_usecase: Arc<ConnectParticipantUseCase>,
        disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
        send_message_usecase: Arc<SendMessageUseCase>,
        get_rooms_usecase: Arc<GetRoomsUseCase>,
        get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
        config: RelayConfig,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                connect_participant_usecase,
                disconnect_participant_usecase,
                send_message_usecase,
                get_rooms_usecase,
                get_room_detail_usecase,
                config,
            }),
        }
    }

    /// Build the axum router
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/", get(websocket_handler))
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .route("/api/rooms/{room_id}", get(get_room_detail))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until a shutdown signal arrives
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let app = self.router();

        tracing::info!("Room relay listening on {}", listener.local_addr()?);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Run the relay server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> std::io::Result<()> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Connect to: ws://{}/?roomId=<room>&userId=<user>", bind_addr);
        self.serve(listener).await
    }
}
