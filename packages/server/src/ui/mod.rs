//! Transport layer: axum router, WebSocket and HTTP handlers, server runner.

mod config;
mod handler;
mod server;
mod signal;
pub mod state;

pub use config::RelayConfig;
pub use server::Server;
