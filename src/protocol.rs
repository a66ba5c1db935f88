//! Wire-compatible protocol types for the Fourline game server.
//!
//! Every type in this module produces identical JSON to the server's frame
//! shapes. The duplex channel carries flat JSON objects discriminated by a
//! `type` tag, with one exception: server error frames carry no tag at all
//! and consist of a single `error` field (see [`crate::codec::decode`]).
//!
//! Field names are camelCase on the wire (`roomId`, `gameId`, `roomName`)
//! because that is what the server reads and writes; snake_case Rust field
//! names are renamed per field rather than per container.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Literal `result` value the server sends for a drawn game.
pub const DRAW_TOKEN: &str = "draw";

// ── Outbound intents ────────────────────────────────────────────────

/// Message types sent from client to server.
///
/// The server expects the first frame on a fresh connection to be `Join`,
/// `CreateRoom`, or `JoinRoom`; `Move` frames follow once a game is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Enter the quick-match queue under a display name.
    Join { username: String },
    /// Create a named room and wait for an opponent to join it.
    CreateRoom {
        username: String,
        #[serde(rename = "roomName")]
        room_name: String,
    },
    /// Join an existing room by its server-issued id.
    JoinRoom {
        username: String,
        #[serde(rename = "roomId")]
        room_id: String,
    },
    /// Drop a disc in the given column of a running game.
    Move {
        #[serde(rename = "gameId")]
        game_id: String,
        col: usize,
    },
}

// ── Inbound frames ──────────────────────────────────────────────────

/// Raw game-state payload embedded in `start`, `state`, and `reconnected`
/// frames. Validated and converted to [`crate::state::GameSnapshot`] by the
/// codec; never handed to the session controller as-is.
///
/// The server also includes a `started` timestamp which the client ignores.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StateWire {
    pub rows: usize,
    pub cols: usize,
    /// `[row][col]` grid of cell values: 0 empty, 1 seat one, 2 seat two.
    pub board: Vec<Vec<u8>>,
    /// Seat number whose move the server currently accepts (1 or 2).
    pub turn: u8,
}

/// Lifecycle status reported on every `state` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Moves are still being accepted.
    Playing,
    /// The game reached a terminal result.
    Finished,
}

/// Room object embedded in `room_created` / `room_joined` frames.
///
/// Occupancy is derived from the non-empty player slots; room capacity is
/// fixed at two seats.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct RoomWire {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub player1: String,
    #[serde(default)]
    pub player2: String,
    #[serde(default)]
    pub status: String,
}

impl RoomWire {
    /// Number of occupied seats.
    pub fn occupancy(&self) -> u8 {
        u8::from(!self.player1.is_empty()) + u8::from(!self.player2.is_empty())
    }
}

/// Typed server frames, discriminated by the `type` tag.
///
/// This is the raw wire shape; [`crate::codec::decode`] validates embedded
/// state payloads and produces [`crate::codec::ServerEvent`] values for the
/// session controller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Queued for matchmaking; `timeout` is display-only (the server
    /// enforces it).
    Waiting { timeout: u64 },
    /// A room was created for this client.
    RoomCreated {
        #[serde(rename = "roomId")]
        room_id: String,
        room: RoomWire,
    },
    /// This client joined an existing room that is still waiting.
    RoomJoined {
        #[serde(rename = "roomId")]
        room_id: String,
        room: RoomWire,
    },
    /// A game started; `you` is this client's seat number.
    Start {
        #[serde(rename = "gameId")]
        game_id: String,
        you: u8,
        opponent: String,
        state: StateWire,
    },
    /// Authoritative whole-board update. `result` is present only on
    /// finished games: the draw token, or a winner's display name.
    State {
        state: StateWire,
        status: GameStatus,
        #[serde(default)]
        result: Option<String>,
    },
    /// The server restored this client into an in-progress game.
    Reconnected { state: StateWire },
}

// ── HTTP polling payloads ───────────────────────────────────────────

/// `GET /leaderboard` response: display name to win count.
pub type Leaderboard = BTreeMap<String, u64>;

/// One entry of the `GET /rooms` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: String,
    pub name: String,
    pub creator: String,
    /// Seats currently occupied.
    pub players: u8,
    pub max_players: u8,
    #[serde(default)]
    pub status: String,
}
