//! # Fourline Client
//!
//! Transport-agnostic Rust client for the Fourline connect-four game protocol.
//!
//! This crate provides a high-level async client that plays against a Fourline
//! game server using JSON text messages over any bidirectional transport, plus
//! an HTTP polling client for the leaderboard and room-list side panels.
//!
//! ## Features
//!
//! - **Transport-agnostic** — implement the [`Transport`] trait for any backend
//! - **Wire-compatible** — frames match the server's format exactly, including
//!   its untagged `{"error": ...}` frames
//! - **WebSocket built-in** — default `transport-websocket` feature provides `WebSocketTransport`
//! - **Pure core** — the session state machine and render projector are
//!   synchronous and side-effect free; all I/O lives at the edges
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fourline_client::{ClientEvent, FourlineClient, FourlineConfig, WebSocketTransport};
//!
//! let transport = WebSocketTransport::connect("ws://localhost:8080/ws").await?;
//! let (client, mut events) = FourlineClient::start(transport, FourlineConfig::new());
//!
//! client.set_identity("alice")?;
//! client.quick_match()?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ClientEvent::View(view) => render(&view),
//!         ClientEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

#[cfg(feature = "tokio-runtime")]
pub mod client;
pub mod codec;
pub mod error;
pub mod protocol;
pub mod session;
pub mod state;
pub mod transport;
pub mod transports;
pub mod view;

#[cfg(feature = "polling-client")]
pub mod poll;

// Re-export primary types for ergonomic imports.
#[cfg(feature = "tokio-runtime")]
pub use client::{ClientEvent, FourlineClient, FourlineConfig};
pub use codec::{decode, encode, DecodeError, ServerEvent};
pub use error::{FourlineError, Result};
pub use protocol::{GameStatus, Intent, Leaderboard, RoomSummary};
pub use session::{Action, SessionController, TimerKind, TransportStatus, UserIntent};
pub use state::{Cell, ConnectionStatus, Mode, Outcome, Seat, Session};
pub use transport::Transport;
pub use view::{project, project_leaderboard, project_rooms, FetchState, Panel, ViewModel};

#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;

#[cfg(feature = "polling-client")]
pub use poll::{PanelSnapshot, PollingClient};
