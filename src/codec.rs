//! Message codec: serializes outbound intents and parses inbound frames
//! into a closed set of typed events.
//!
//! [`decode`] is the only place raw server JSON is interpreted. It handles
//! the protocol's one irregularity (error frames carry no `type` tag, just
//! an `error` field), validates every embedded game-state payload, and
//! rejects malformed input with a [`DecodeError`] instead of panicking.
//! Callers treat a decode failure as "ignored malformed message": log it,
//! drop the frame, leave the session untouched.

use serde_json::Value;
use thiserror::Error;

use crate::protocol::{GameStatus, Intent, ServerFrame, StateWire};
use crate::state::{Cell, GameSnapshot, Seat};

/// Why an inbound frame was rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no `type` tag and no `error` field")]
    MissingTag,

    #[error("unknown frame type `{0}`")]
    UnknownType(String),

    #[error("board has {got} rows, declared {declared}")]
    WrongRowCount { declared: usize, got: usize },

    #[error("board row {row} has {got} cells, declared {declared}")]
    RaggedBoard {
        row: usize,
        declared: usize,
        got: usize,
    },

    #[error("invalid cell value {value} at row {row}, col {col}")]
    InvalidCell { row: usize, col: usize, value: u8 },

    #[error("invalid seat number {0}")]
    InvalidSeat(u8),
}

/// Decoded, validated inbound events handed to the session controller.
///
/// A closed set: the controller matches exhaustively, so an unhandled
/// message type is a compile error rather than a silent gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Waiting {
        timeout_secs: u64,
    },
    RoomCreated {
        room_id: String,
        room: crate::protocol::RoomWire,
    },
    RoomJoined {
        room_id: String,
        room: crate::protocol::RoomWire,
    },
    Started {
        game_id: String,
        local_seat: Seat,
        opponent: String,
        state: GameSnapshot,
    },
    StateUpdated {
        state: GameSnapshot,
        status: GameStatus,
        /// Raw result string. Interpreting who it refers to (self, opponent,
        /// draw) is the controller's job, not the codec's.
        result: Option<String>,
    },
    Reconnected {
        state: GameSnapshot,
    },
    /// Server-reported error, surfaced verbatim.
    ErrorNotice {
        message: String,
    },
}

/// Serialize an outbound intent to a wire frame.
pub fn encode(intent: &Intent) -> serde_json::Result<String> {
    serde_json::to_string(intent)
}

/// Parse and validate one inbound text frame.
pub fn decode(text: &str) -> Result<ServerEvent, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

    // Error frames are the one shape without a `type` tag.
    if let Some(err) = obj.get("error") {
        let message = err
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| err.to_string());
        return Ok(ServerEvent::ErrorNotice { message });
    }

    // Surface unknown tags distinctly from structural errors so callers can
    // log them usefully; serde would otherwise fold both into one error.
    match obj.get("type").and_then(Value::as_str) {
        None => return Err(DecodeError::MissingTag),
        Some("waiting" | "room_created" | "room_joined" | "start" | "state" | "reconnected") => {}
        Some(other) => return Err(DecodeError::UnknownType(other.to_owned())),
    }

    let frame: ServerFrame = serde_json::from_value(value)?;
    match frame {
        ServerFrame::Waiting { timeout } => Ok(ServerEvent::Waiting {
            timeout_secs: timeout,
        }),
        ServerFrame::RoomCreated { room_id, room } => {
            Ok(ServerEvent::RoomCreated { room_id, room })
        }
        ServerFrame::RoomJoined { room_id, room } => Ok(ServerEvent::RoomJoined { room_id, room }),
        ServerFrame::Start {
            game_id,
            you,
            opponent,
            state,
        } => Ok(ServerEvent::Started {
            game_id,
            local_seat: Seat::from_number(you).ok_or(DecodeError::InvalidSeat(you))?,
            opponent,
            state: validate_state(state)?,
        }),
        ServerFrame::State {
            state,
            status,
            result,
        } => Ok(ServerEvent::StateUpdated {
            state: validate_state(state)?,
            status,
            result,
        }),
        ServerFrame::Reconnected { state } => Ok(ServerEvent::Reconnected {
            state: validate_state(state)?,
        }),
    }
}

/// Check a raw state payload against its own declared dimensions and value
/// ranges, converting it to the typed [`GameSnapshot`].
fn validate_state(wire: StateWire) -> Result<GameSnapshot, DecodeError> {
    if wire.board.len() != wire.rows {
        return Err(DecodeError::WrongRowCount {
            declared: wire.rows,
            got: wire.board.len(),
        });
    }

    let mut board = Vec::with_capacity(wire.rows);
    for (r, row) in wire.board.into_iter().enumerate() {
        if row.len() != wire.cols {
            return Err(DecodeError::RaggedBoard {
                row: r,
                declared: wire.cols,
                got: row.len(),
            });
        }
        let mut cells = Vec::with_capacity(wire.cols);
        for (c, value) in row.into_iter().enumerate() {
            let cell = Cell::from_number(value).ok_or(DecodeError::InvalidCell {
                row: r,
                col: c,
                value,
            })?;
            cells.push(cell);
        }
        board.push(cells);
    }

    let turn = Seat::from_number(wire.turn).ok_or(DecodeError::InvalidSeat(wire.turn))?;

    Ok(GameSnapshot {
        rows: wire.rows,
        cols: wire.cols,
        board,
        turn,
    })
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn encode_join_produces_flat_frame() {
        let json = encode(&Intent::Join {
            username: "alice".into(),
        })
        .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "join");
        assert_eq!(value["username"], "alice");
    }

    #[test]
    fn encode_move_uses_camel_case_game_id() {
        let json = encode(&Intent::Move {
            game_id: "g_1".into(),
            col: 3,
        })
        .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "move");
        assert_eq!(value["gameId"], "g_1");
        assert_eq!(value["col"], 3);
    }

    #[test]
    fn decode_error_frame_without_type_tag() {
        let event = decode(r#"{"error":"room not found"}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::ErrorNotice {
                message: "room not found".into()
            }
        );
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        let err = decode(r#"{"type":"levitate"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownType(t) if t == "levitate"));
    }

    #[test]
    fn decode_rejects_missing_tag() {
        let err = decode(r#"{"timeout":15}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingTag));
    }

    #[test]
    fn decode_rejects_ragged_board() {
        let err = decode(
            r#"{"type":"reconnected","state":{"rows":2,"cols":2,"board":[[0,0],[0]],"turn":1}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::RaggedBoard { row: 1, .. }));
    }

    #[test]
    fn decode_rejects_out_of_range_cell() {
        let err = decode(
            r#"{"type":"reconnected","state":{"rows":1,"cols":2,"board":[[0,7]],"turn":1}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidCell {
                row: 0,
                col: 1,
                value: 7
            }
        ));
    }

    #[test]
    fn decode_state_ignores_extra_fields() {
        // The server includes a `started` timestamp in state payloads.
        let event = decode(
            r#"{"type":"reconnected","state":{"rows":1,"cols":1,"board":[[2]],"turn":2,"started":"2024-01-01T00:00:00Z"}}"#,
        )
        .unwrap();
        match event {
            ServerEvent::Reconnected { state } => {
                assert_eq!(state.board[0][0], Cell::Seat(Seat::Two));
                assert_eq!(state.turn, Seat::Two);
            }
            other => panic!("expected Reconnected, got {other:?}"),
        }
    }
}
