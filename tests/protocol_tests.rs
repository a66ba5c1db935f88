#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire-format tests for the Fourline Client.
//!
//! Verifies that outbound intents serialize to exactly the JSON the server
//! expects (flat objects, camelCase keys) and that inbound frames — including
//! the untagged `{"error": ...}` frame — decode and validate correctly.
//! Fixtures match real server output.

use fourline_client::codec::{decode, encode, DecodeError, ServerEvent};
use fourline_client::protocol::{GameStatus, Intent, Leaderboard, RoomSummary};
use fourline_client::{Cell, Seat};

// ════════════════════════════════════════════════════════════════════
// Outbound intents
// ════════════════════════════════════════════════════════════════════

fn encoded_value(intent: &Intent) -> serde_json::Value {
    serde_json::from_str(&encode(intent).expect("encode")).expect("valid json")
}

#[test]
fn join_encodes_flat_with_type_tag() {
    let value = encoded_value(&Intent::Join {
        username: "alice".into(),
    });
    assert_eq!(
        value,
        serde_json::json!({"type": "join", "username": "alice"})
    );
}

#[test]
fn create_room_encodes_camel_case_room_name() {
    let value = encoded_value(&Intent::CreateRoom {
        username: "alice".into(),
        room_name: "the den".into(),
    });
    assert_eq!(
        value,
        serde_json::json!({"type": "create_room", "username": "alice", "roomName": "the den"})
    );
}

#[test]
fn join_room_encodes_camel_case_room_id() {
    let value = encoded_value(&Intent::JoinRoom {
        username: "bob".into(),
        room_id: "r_17".into(),
    });
    assert_eq!(
        value,
        serde_json::json!({"type": "join_room", "username": "bob", "roomId": "r_17"})
    );
}

#[test]
fn move_encodes_camel_case_game_id() {
    let value = encoded_value(&Intent::Move {
        game_id: "g_4".into(),
        col: 3,
    });
    assert_eq!(
        value,
        serde_json::json!({"type": "move", "gameId": "g_4", "col": 3})
    );
}

// ════════════════════════════════════════════════════════════════════
// Inbound frames
// ════════════════════════════════════════════════════════════════════

#[test]
fn waiting_frame_decodes() {
    let event = decode(r#"{"type":"waiting","timeout":15}"#).unwrap();
    assert_eq!(event, ServerEvent::Waiting { timeout_secs: 15 });
}

#[test]
fn room_created_frame_decodes() {
    let event = decode(
        r#"{"type":"room_created","roomId":"r_1","room":{"id":"r_1","name":"den","creator":"alice","player1":"alice","player2":"","status":"waiting"}}"#,
    )
    .unwrap();
    match event {
        ServerEvent::RoomCreated { room_id, room } => {
            assert_eq!(room_id, "r_1");
            assert_eq!(room.name, "den");
            assert_eq!(room.occupancy(), 1);
        }
        other => panic!("expected RoomCreated, got {other:?}"),
    }
}

#[test]
fn start_frame_decodes_with_validated_state() {
    let event = decode(
        r#"{"type":"start","gameId":"g_1","you":2,"opponent":"alice","state":{"rows":2,"cols":3,"board":[[0,1,2],[0,0,0]],"turn":1}}"#,
    )
    .unwrap();
    match event {
        ServerEvent::Started {
            game_id,
            local_seat,
            opponent,
            state,
        } => {
            assert_eq!(game_id, "g_1");
            assert_eq!(local_seat, Seat::Two);
            assert_eq!(opponent, "alice");
            assert_eq!(state.board[0][1], Cell::Seat(Seat::One));
            assert_eq!(state.board[0][2], Cell::Seat(Seat::Two));
            assert_eq!(state.board[1][0], Cell::Empty);
            assert_eq!(state.turn, Seat::One);
        }
        other => panic!("expected Started, got {other:?}"),
    }
}

#[test]
fn state_frame_decodes_with_status_and_result() {
    let event = decode(
        r#"{"type":"state","state":{"rows":1,"cols":1,"board":[[1]],"turn":2},"status":"finished","result":"draw"}"#,
    )
    .unwrap();
    match event {
        ServerEvent::StateUpdated { status, result, .. } => {
            assert_eq!(status, GameStatus::Finished);
            assert_eq!(result.as_deref(), Some("draw"));
        }
        other => panic!("expected StateUpdated, got {other:?}"),
    }
}

#[test]
fn state_frame_without_result_decodes() {
    let event = decode(
        r#"{"type":"state","state":{"rows":1,"cols":1,"board":[[0]],"turn":1},"status":"playing"}"#,
    )
    .unwrap();
    match event {
        ServerEvent::StateUpdated { status, result, .. } => {
            assert_eq!(status, GameStatus::Playing);
            assert!(result.is_none());
        }
        other => panic!("expected StateUpdated, got {other:?}"),
    }
}

#[test]
fn state_payload_tolerates_extra_fields() {
    // Real server state payloads carry a `started` flag the client ignores.
    let event = decode(
        r#"{"type":"state","state":{"rows":1,"cols":1,"board":[[0]],"turn":1,"started":true},"status":"playing"}"#,
    );
    assert!(event.is_ok());
}

#[test]
fn reconnected_frame_decodes() {
    let event = decode(
        r#"{"type":"reconnected","state":{"rows":1,"cols":2,"board":[[1,0]],"turn":2}}"#,
    )
    .unwrap();
    assert!(matches!(event, ServerEvent::Reconnected { .. }));
}

#[test]
fn error_frame_has_no_type_tag() {
    let event = decode(r#"{"error":"room is full"}"#).unwrap();
    assert_eq!(
        event,
        ServerEvent::ErrorNotice {
            message: "room is full".into()
        }
    );
}

// ════════════════════════════════════════════════════════════════════
// Decode failures
// ════════════════════════════════════════════════════════════════════

#[test]
fn non_json_input_fails() {
    assert!(matches!(decode("not json"), Err(DecodeError::Json(_))));
}

#[test]
fn non_object_frame_fails() {
    assert!(matches!(decode("[1,2,3]"), Err(DecodeError::NotAnObject)));
}

#[test]
fn missing_type_tag_fails() {
    assert!(matches!(
        decode(r#"{"timeout":15}"#),
        Err(DecodeError::MissingTag)
    ));
}

#[test]
fn unknown_type_tag_fails() {
    match decode(r#"{"type":"chat","text":"hi"}"#) {
        Err(DecodeError::UnknownType(tag)) => assert_eq!(tag, "chat"),
        other => panic!("expected UnknownType, got {other:?}"),
    }
}

#[test]
fn board_with_wrong_row_count_fails() {
    let result = decode(
        r#"{"type":"reconnected","state":{"rows":3,"cols":1,"board":[[0]],"turn":1}}"#,
    );
    assert!(matches!(
        result,
        Err(DecodeError::WrongRowCount {
            declared: 3,
            got: 1
        })
    ));
}

#[test]
fn ragged_board_fails() {
    let result = decode(
        r#"{"type":"reconnected","state":{"rows":2,"cols":2,"board":[[0,0],[0]],"turn":1}}"#,
    );
    assert!(matches!(result, Err(DecodeError::RaggedBoard { row: 1, .. })));
}

#[test]
fn out_of_range_cell_fails() {
    let result = decode(
        r#"{"type":"reconnected","state":{"rows":1,"cols":2,"board":[[0,3]],"turn":1}}"#,
    );
    assert!(matches!(
        result,
        Err(DecodeError::InvalidCell {
            row: 0,
            col: 1,
            value: 3
        })
    ));
}

#[test]
fn invalid_turn_seat_fails() {
    let result = decode(
        r#"{"type":"reconnected","state":{"rows":1,"cols":1,"board":[[0]],"turn":0}}"#,
    );
    assert!(matches!(result, Err(DecodeError::InvalidSeat(0))));
}

// ════════════════════════════════════════════════════════════════════
// HTTP panel payloads
// ════════════════════════════════════════════════════════════════════

#[test]
fn leaderboard_deserializes_from_name_to_wins_map() {
    let board: Leaderboard = serde_json::from_str(r#"{"alice":3,"bob":7}"#).unwrap();
    assert_eq!(board.get("alice"), Some(&3));
    assert_eq!(board.get("bob"), Some(&7));
}

#[test]
fn room_summary_deserializes_from_rooms_endpoint_shape() {
    let rooms: Vec<RoomSummary> = serde_json::from_str(
        r#"[{"id":"r_1","name":"den","creator":"alice","players":1,"max_players":2,"status":"waiting"}]"#,
    )
    .unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].id, "r_1");
    assert_eq!(rooms[0].players, 1);
    assert_eq!(rooms[0].max_players, 2);
}
