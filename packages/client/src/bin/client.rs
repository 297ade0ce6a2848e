//! Terminal chat client for the Tsunagi room relay.
//!
//! Joins a room, sends every line typed at the prompt and prints what the other
//! members say. Reconnects with exponential backoff (1s, 2s, 4s, ... up to 30s)
//! when the connection drops.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsunagi-client -- --room-id room123 --user-id alice
//! cargo run --bin tsunagi-client -- -r room123 -u bob --url ws://127.0.0.1:3000/
//! ```

use clap::Parser;

use tsunagi_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tsunagi-client")]
#[command(about = "Terminal chat client for the Tsunagi room relay", long_about = None)]
struct Args {
    /// Room to join
    #[arg(short = 'r', long)]
    room_id: String,

    /// User ID shown to the other members
    #[arg(short = 'u', long)]
    user_id: String,

    /// Relay WebSocket URL
    #[arg(long, env = "TSUNAGI_URL", default_value = "ws://127.0.0.1:8080/")]
    url: String,

    /// Consecutive reconnection attempts before giving up
    #[arg(long, default_value = "5")]
    max_reconnect_attempts: u32,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Run the client
    if let Err(e) = tsunagi_client::run_client(
        args.url,
        args.room_id,
        args.user_id,
        args.max_reconnect_attempts,
    )
    .await
    {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
