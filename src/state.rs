//! Session data model: the single source of UI truth.
//!
//! [`Session`] is the one mutable root owned by the
//! [`SessionController`](crate::session::SessionController). The render
//! projector and the polling client only ever read it; nothing else writes
//! to it. All fields are plain data so tests and projections can inspect
//! the session without accessors.

use crate::protocol::RoomWire;

// ── Scalar types ────────────────────────────────────────────────────

/// A player's fixed position within one game instance.
///
/// The seat determines turn order and disc color and is never reassigned
/// for the lifetime of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    /// Wire representation (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            Seat::One => 1,
            Seat::Two => 2,
        }
    }

    /// The other seat.
    pub fn other(self) -> Seat {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }

    /// Parse a wire seat number.
    pub fn from_number(n: u8) -> Option<Seat> {
        match n {
            1 => Some(Seat::One),
            2 => Some(Seat::Two),
            _ => None,
        }
    }
}

/// Occupancy of one board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Seat(Seat),
}

impl Cell {
    /// Parse a wire cell value (0 empty, 1 or 2 a seat's disc).
    pub fn from_number(n: u8) -> Option<Cell> {
        match n {
            0 => Some(Cell::Empty),
            n => Seat::from_number(n).map(Cell::Seat),
        }
    }
}

/// Connection lifecycle of the single duplex transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

/// Where the session is in the visitor → player → finished lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    ChoosingMode,
    CreatingRoom,
    BrowsingRooms,
    WaitingInRoom,
    Matchmaking,
    InGame,
    Finished,
}

// ── Composite records ───────────────────────────────────────────────

/// A validated game-state payload: rectangular board, in-range cells and
/// turn seat. Produced by the codec; raw wire payloads never reach the
/// controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub rows: usize,
    pub cols: usize,
    /// `[row][col]`, row 0 at the top.
    pub board: Vec<Vec<Cell>>,
    pub turn: Seat,
}

/// The live game record. Created wholesale on a `start` frame, board and
/// turn replaced wholesale on every `state` frame, destroyed on reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub game_id: String,
    /// This client's seat, fixed for the lifetime of the game.
    pub local_seat: Seat,
    pub opponent: String,
    pub rows: usize,
    pub cols: usize,
    pub board: Vec<Vec<Cell>>,
    pub turn: Seat,
}

impl Game {
    /// Build a fresh game from a `start` frame.
    pub fn from_start(game_id: String, local_seat: Seat, opponent: String, state: GameSnapshot) -> Game {
        Game {
            game_id,
            local_seat,
            opponent,
            rows: state.rows,
            cols: state.cols,
            board: state.board,
            turn: state.turn,
        }
    }

    /// Whether a snapshot's dimensions match this game's fixed board shape.
    pub fn accepts(&self, state: &GameSnapshot) -> bool {
        state.rows == self.rows && state.cols == self.cols
    }

    /// Replace board and turn wholesale. The caller must have checked
    /// [`accepts`](Game::accepts) first.
    pub fn apply(&mut self, state: GameSnapshot) {
        self.board = state.board;
        self.turn = state.turn;
    }

    /// True when the server currently accepts a move from this client.
    pub fn is_local_turn(&self) -> bool {
        self.turn == self.local_seat
    }
}

/// Reference to the room this session created, joined, or is inspecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRef {
    pub room_id: String,
    pub name: String,
    pub creator: String,
    pub occupancy: u8,
    pub capacity: u8,
}

impl RoomRef {
    /// Build a room reference from the wire room object.
    pub fn from_wire(room_id: String, room: &RoomWire) -> RoomRef {
        RoomRef {
            room_id,
            name: room.name.clone(),
            creator: room.creator.clone(),
            occupancy: room.occupancy(),
            capacity: 2,
        }
    }
}

/// Terminal outcome of a finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Draw,
    Won {
        winner: String,
        /// Whether `winner` is this session's own identity.
        by_self: bool,
    },
    /// The server reported a finished game without a usable result.
    Unknown,
}

/// Transient user-visible message layered over the regular status banner:
/// validation failures, server-reported errors, disconnect notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

impl Notice {
    pub fn error(text: impl Into<String>) -> Notice {
        Notice {
            text: text.into(),
            kind: NoticeKind::Error,
        }
    }

    pub fn info(text: impl Into<String>) -> Notice {
        Notice {
            text: text.into(),
            kind: NoticeKind::Info,
        }
    }
}

// ── Session root ────────────────────────────────────────────────────

/// The single mutable session root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Chosen display name. Set exactly once; cleared only by a full reset.
    pub identity: Option<String>,
    pub connection: ConnectionStatus,
    pub mode: Mode,
    /// Present only while a room reference is relevant.
    pub room: Option<RoomRef>,
    /// Present iff `mode` is `InGame` or `Finished`.
    pub game: Option<Game>,
    pub last_result: Option<Outcome>,
    /// Matchmaking timeout reported by the last `waiting` frame, seconds.
    /// Display only; expiry is server-driven.
    pub wait_timeout_secs: Option<u64>,
    pub notice: Option<Notice>,
}

impl Session {
    /// A fresh, empty session.
    pub fn new() -> Session {
        Session::default()
    }

    /// Clear every field back to the initial empty form.
    pub fn reset(&mut self) {
        *self = Session::default();
    }

    /// Structural invariants, checked after every controller transition.
    ///
    /// - `game` is present iff `mode` is `InGame` or `Finished`
    /// - `room` and `game` are never both present
    /// - a game's board always matches its fixed dimensions
    pub fn invariants_hold(&self) -> bool {
        let gameful_mode = matches!(self.mode, Mode::InGame | Mode::Finished);
        if self.game.is_some() != gameful_mode {
            return false;
        }
        if self.game.is_some() && self.room.is_some() {
            return false;
        }
        if let Some(game) = &self.game {
            if game.board.len() != game.rows || game.board.iter().any(|r| r.len() != game.cols) {
                return false;
            }
        }
        true
    }
}
