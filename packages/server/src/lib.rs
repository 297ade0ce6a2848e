//! Room relay for WebSocket chat clients.
//!
//! Clients connect with a `roomId` and a `userId`. Every text frame a client
//! sends is stamped with its sender and the server receipt time and fanned
//! out to the other members of the same room.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
