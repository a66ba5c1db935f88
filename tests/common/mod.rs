// Not every test binary uses every helper here.
#![allow(dead_code)]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for Fourline Client integration tests.
//!
//! Provides a channel-based [`MockTransport`] and helper functions for
//! constructing server frame JSON strings that match real server output.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use fourline_client::{FourlineError, Transport};

// ── MockTransport ───────────────────────────────────────────────────

/// A channel-based mock transport for integration testing.
///
/// Scripted server frames are consumed in order by `recv()`.
/// All messages sent by the client are recorded in `sent`.
pub struct MockTransport {
    /// Scripted server frames (consumed in order by `recv`).
    incoming: VecDeque<Option<Result<String, FourlineError>>>,
    /// Recorded outgoing messages from the client.
    pub sent: Arc<StdMutex<Vec<String>>>,
    /// Whether `close()` has been called.
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    /// Create a new mock transport with the given scripted incoming frames.
    ///
    /// Returns the transport plus shared handles for inspecting sent messages
    /// and whether close was called.
    pub fn new(
        incoming: Vec<Option<Result<String, FourlineError>>>,
    ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), FourlineError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, FourlineError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            // No more scripted frames — hang forever so the transport loop
            // stays alive until shutdown is called.
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), FourlineError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── JSON helper functions ───────────────────────────────────────────

/// Returns the JSON string for a `waiting` frame with the server's default
/// 15-second matchmaking timeout.
pub fn waiting_json() -> String {
    r#"{"type":"waiting","timeout":15}"#.to_owned()
}

/// Returns the JSON string for a `room_created` frame.
pub fn room_created_json(room_id: &str, name: &str, creator: &str) -> String {
    format!(
        r#"{{"type":"room_created","roomId":"{room_id}","room":{{"id":"{room_id}","name":"{name}","creator":"{creator}","player1":"{creator}","player2":"","status":"waiting"}}}}"#
    )
}

/// Returns the JSON string for a `room_joined` frame with both seats filled.
pub fn room_joined_json(room_id: &str, name: &str, creator: &str, joiner: &str) -> String {
    format!(
        r#"{{"type":"room_joined","roomId":"{room_id}","room":{{"id":"{room_id}","name":"{name}","creator":"{creator}","player1":"{creator}","player2":"{joiner}","status":"playing"}}}}"#
    )
}

/// Returns the JSON string for a `start` frame on an empty standard board.
pub fn start_json(game_id: &str, you: u8, opponent: &str) -> String {
    format!(
        r#"{{"type":"start","gameId":"{game_id}","you":{you},"opponent":"{opponent}","state":{}}}"#,
        empty_state_json(6, 7, 1)
    )
}

/// Returns the JSON string for an in-progress `state` frame.
pub fn state_json(state: &str) -> String {
    format!(r#"{{"type":"state","state":{state},"status":"playing"}}"#)
}

/// Returns the JSON string for a finished `state` frame carrying `result`.
pub fn finished_json(state: &str, result: &str) -> String {
    format!(r#"{{"type":"state","state":{state},"status":"finished","result":"{result}"}}"#)
}

/// Returns the JSON string for a `reconnected` frame.
pub fn reconnected_json(state: &str) -> String {
    format!(r#"{{"type":"reconnected","state":{state}}}"#)
}

/// Returns the JSON string for the server's untagged error frame.
pub fn error_json(message: &str) -> String {
    format!(r#"{{"error":"{message}"}}"#)
}

/// Returns the JSON for an empty `rows` x `cols` state payload.
pub fn empty_state_json(rows: usize, cols: usize, turn: u8) -> String {
    let row = format!("[{}]", vec!["0"; cols].join(","));
    let board = vec![row; rows].join(",");
    format!(r#"{{"rows":{rows},"cols":{cols},"board":[{board}],"turn":{turn}}}"#)
}
