//! WebSocket room relay server.
//!
//! Clients join a room with `?roomId=<id>&userId=<id>`; every text message a
//! client sends is relayed to the other members of the same room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsunagi-server
//! cargo run --bin tsunagi-server -- --host 0.0.0.0 --port 3000
//! TSUNAGI_PORT=9000 cargo run --bin tsunagi-server
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;

use tsunagi_server::{
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    ui::{RelayConfig, Server},
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, GetRoomDetailUseCase,
        GetRoomsUseCase, SendMessageUseCase,
    },
};
use tsunagi_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "tsunagi-server")]
#[command(about = "WebSocket room relay: pairs clients by room and forwards their messages", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "TSUNAGI_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "TSUNAGI_PORT", default_value = "8080")]
    port: u16,

    /// Seconds between heartbeat pings
    #[arg(long, default_value = "20")]
    heartbeat_interval_secs: u64,

    /// Seconds of silence after which a connection is closed
    #[arg(long, default_value = "60")]
    idle_timeout_secs: u64,

    /// Frames buffered per connection before the peer is dropped as too slow
    #[arg(long, default_value = "64")]
    outbound_capacity: usize,

    /// Largest accepted WebSocket frame, in bytes (larger frames end the connection)
    #[arg(long, default_value = "65536")]
    max_frame_bytes: usize,

    /// Maximum number of simultaneously open connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, default_value = "debug")]
    log_level: String,
}

impl Args {
    fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs.max(1)),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs.max(1)),
            outbound_capacity: self.outbound_capacity.max(1),
            max_frame_bytes: self.max_frame_bytes,
            max_connections: self.max_connections,
            ..RelayConfig::default()
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = args.relay_config();
    if config.heartbeat_interval * 2 >= config.idle_timeout {
        tracing::warn!(
            "Heartbeat interval {:?} is not below half the idle timeout {:?}; healthy clients may be dropped",
            config.heartbeat_interval,
            config.idle_timeout
        );
    }

    // Initialize dependencies in order:
    // 1. Repository
    // 2. MessagePusher
    // 3. UseCases
    // 4. Server
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 1. Create Repository (in-memory room registry)
    let repository = Arc::new(InMemoryRoomRepository::new(clock.clone()));

    // 2. Create MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 3. Create UseCases
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        repository.clone(),
        message_pusher.clone(),
        clock.clone(),
        config.max_connections,
    ));
    let disconnect_participant_usecase = Arc::new(DisconnectParticipantUseCase::new(
        repository.clone(),
        message_pusher.clone(),
    ));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        repository.clone(),
        message_pusher.clone(),
        clock.clone(),
    ));
    let get_rooms_usecase = Arc::new(GetRoomsUseCase::new(repository.clone()));
    let get_room_detail_usecase = Arc::new(GetRoomDetailUseCase::new(repository.clone()));

    // 4. Create and run Server
    let server = Server::new(
        connect_participant_usecase,
        disconnect_participant_usecase,
        send_message_usecase,
        get_rooms_usecase,
        get_room_detail_usecase,
        config,
    );

    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
