//! Concrete [`Transport`](crate::Transport) implementations, feature-gated.
//!
//! The game server's production endpoint is a WebSocket, covered by the
//! `transport-websocket` feature (on by default). Other backends plug in
//! by implementing the trait; see [`crate::transport`] for the contract
//! and a channel-backed sketch.

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::WebSocketTransport;
