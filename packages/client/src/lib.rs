//! Terminal chat client for the Tsunagi room relay.
//!
//! Joins a room, sends each line typed at the prompt, prints what the other
//! members of the room say, and reconnects with exponential backoff when the
//! connection drops.

pub mod domain;
pub mod error;
mod formatter;
mod runner;
mod session;
mod ui;

pub use runner::run_client;
