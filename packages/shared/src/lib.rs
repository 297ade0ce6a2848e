//! Utilities shared between the Tsunagi relay server and its client.

pub mod logger;
pub mod time;
