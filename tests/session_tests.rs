#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! End-to-end session scenarios driven through the decoded wire frames.
//!
//! Each test feeds the controller the exact frame sequence a real server
//! produces for one user journey, checking the session, the emitted actions,
//! and the projected view after every step. Complements the per-transition
//! unit tests inside `src/session.rs`.

mod common;

use fourline_client::codec::decode;
use fourline_client::protocol::Intent;
use fourline_client::view::{project, Panel, StatusKind};
use fourline_client::{
    Action, Cell, ConnectionStatus, Mode, Outcome, Seat, SessionController, TimerKind,
    TransportStatus, UserIntent,
};

use common::{
    empty_state_json, error_json, finished_json, reconnected_json, room_created_json,
    room_joined_json, start_json, state_json, waiting_json,
};

/// Feed a raw server frame through the codec into the controller.
fn feed(ctrl: &mut SessionController, frame: &str) -> Vec<Action> {
    ctrl.handle_event(decode(frame).expect("valid frame"))
}

/// A connected controller with an identity chosen.
fn connected_as(name: &str) -> SessionController {
    let mut ctrl = SessionController::new();
    ctrl.handle_transport(TransportStatus::Opened);
    ctrl.handle_intent(UserIntent::SetIdentity(name.into()));
    ctrl
}

// ════════════════════════════════════════════════════════════════════
// Quick match: full winning game
// ════════════════════════════════════════════════════════════════════

#[test]
fn quick_match_game_to_victory() {
    let mut ctrl = connected_as("alice");

    // Queue up.
    let actions = ctrl.handle_intent(UserIntent::ChooseQuickMatch);
    assert_eq!(
        actions,
        vec![Action::Send(Intent::Join {
            username: "alice".into()
        })]
    );

    // Server acknowledges with the matchmaking timeout.
    feed(&mut ctrl, &waiting_json());
    assert_eq!(ctrl.session().wait_timeout_secs, Some(15));
    let view = project(ctrl.session());
    assert_eq!(view.panel, Panel::WaitingBanner);
    assert_eq!(view.banner.text, "⏳ Waiting for opponent... (timeout: 15s)");

    // Opponent found; alice is seat 1, so it is her turn on an empty board.
    let actions = feed(&mut ctrl, &start_json("g_1", 1, "bob"));
    assert!(actions.contains(&Action::RefreshPanels));
    assert_eq!(ctrl.session().mode, Mode::InGame);
    let view = project(ctrl.session());
    assert_eq!(view.panel, Panel::Game);
    assert_eq!(view.banner.text, "🎮 Game started! Playing against bob");
    assert_eq!(view.turn_indicator.as_deref(), Some("🎯 Your turn! (Player 1)"));
    assert!(view.board.as_ref().unwrap().cells.iter().all(|c| c.clickable));

    // Drop a disc.
    let actions = ctrl.handle_intent(UserIntent::SubmitMove { column: 3 });
    assert_eq!(
        actions,
        vec![Action::Send(Intent::Move {
            game_id: "g_1".into(),
            col: 3
        })]
    );

    // Server echoes the new board with the turn token flipped.
    feed(
        &mut ctrl,
        &state_json(
            r#"{"rows":6,"cols":7,"board":[[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,1,0,0,0]],"turn":2}"#,
        ),
    );
    let game = ctrl.session().game.as_ref().unwrap();
    assert_eq!(game.board[5][3], Cell::Seat(Seat::One));
    assert!(!game.is_local_turn());
    let view = project(ctrl.session());
    assert_eq!(
        view.turn_indicator.as_deref(),
        Some("⏳ Opponent's turn... (Player 2)")
    );
    assert!(view.board.as_ref().unwrap().cells.iter().all(|c| !c.clickable));

    // Off-turn clicks send nothing.
    assert!(ctrl
        .handle_intent(UserIntent::SubmitMove { column: 0 })
        .is_empty());

    // The server declares alice the winner.
    let actions = feed(
        &mut ctrl,
        &finished_json(&empty_state_json(6, 7, 2), "alice"),
    );
    assert!(actions.contains(&Action::ScheduleTimer(TimerKind::FinishedReset)));
    assert_eq!(ctrl.session().mode, Mode::Finished);
    assert_eq!(
        ctrl.session().last_result,
        Some(Outcome::Won {
            winner: "alice".into(),
            by_self: true
        })
    );
    let view = project(ctrl.session());
    assert_eq!(view.banner.text, "🎉 You won!");
    assert_eq!(view.banner.kind, StatusKind::Finished);
    let announcement = view.announcement.unwrap();
    assert_eq!(announcement.headline, "You Won!");
    assert_eq!(
        announcement.countdown.as_deref(),
        Some("Redirecting in 10 seconds...")
    );

    // The deferred reset restores a blank identity-entry session.
    let actions = ctrl.handle_timer(TimerKind::FinishedReset);
    assert!(actions.contains(&Action::Disconnect));
    assert_eq!(ctrl.session().mode, Mode::Idle);
    assert!(ctrl.session().identity.is_none());
    assert_eq!(project(ctrl.session()).panel, Panel::IdentityEntry);
}

// ════════════════════════════════════════════════════════════════════
// Create room, wait, opponent joins
// ════════════════════════════════════════════════════════════════════

#[test]
fn created_room_waits_then_starts() {
    let mut ctrl = connected_as("alice");

    let actions = ctrl.handle_intent(UserIntent::ChooseCreateRoom {
        room_name: "the den".into(),
    });
    assert_eq!(
        actions,
        vec![Action::Send(Intent::CreateRoom {
            username: "alice".into(),
            room_name: "the den".into()
        })]
    );

    feed(&mut ctrl, &room_created_json("r_1", "the den", "alice"));
    let room = ctrl.session().room.as_ref().unwrap();
    assert_eq!(room.room_id, "r_1");
    assert_eq!(room.name, "the den");
    assert_eq!((room.occupancy, room.capacity), (1, 2));

    // The waiting frame keeps a room-bound session in its room.
    feed(&mut ctrl, &waiting_json());
    assert_eq!(ctrl.session().mode, Mode::WaitingInRoom);

    // Someone joins and the game begins; the room binding is dropped.
    feed(&mut ctrl, &start_json("g_2", 1, "bob"));
    assert_eq!(ctrl.session().mode, Mode::InGame);
    assert!(ctrl.session().room.is_none());
}

// ════════════════════════════════════════════════════════════════════
// Browse and join an existing room
// ════════════════════════════════════════════════════════════════════

#[test]
fn joining_listed_room_starts_as_seat_two() {
    let mut ctrl = connected_as("bob");

    let actions = ctrl.handle_intent(UserIntent::ChooseBrowseRooms);
    assert_eq!(actions, vec![Action::RefreshPanels]);
    assert_eq!(project(ctrl.session()).panel, Panel::RoomBrowser);

    let actions = ctrl.handle_intent(UserIntent::JoinRoomById {
        room_id: "r_1".into(),
    });
    assert_eq!(
        actions,
        vec![Action::Send(Intent::JoinRoom {
            username: "bob".into(),
            room_id: "r_1".into()
        })]
    );
    // Still browsing until the server confirms.
    assert_eq!(ctrl.session().mode, Mode::BrowsingRooms);

    feed(
        &mut ctrl,
        &room_joined_json("r_1", "the den", "alice", "bob"),
    );
    assert_eq!(ctrl.session().mode, Mode::WaitingInRoom);
    assert_eq!(ctrl.session().room.as_ref().unwrap().occupancy, 2);

    feed(&mut ctrl, &start_json("g_3", 2, "alice"));
    let game = ctrl.session().game.as_ref().unwrap();
    assert_eq!(game.local_seat, Seat::Two);
    assert_eq!(game.opponent, "alice");
    // Seat one opens, so bob waits.
    assert!(!game.is_local_turn());
}

// ════════════════════════════════════════════════════════════════════
// Server error path
// ════════════════════════════════════════════════════════════════════

#[test]
fn join_rejection_shows_error_then_force_resets() {
    let mut ctrl = connected_as("bob");
    ctrl.handle_intent(UserIntent::ChooseBrowseRooms);
    ctrl.handle_intent(UserIntent::JoinRoomById {
        room_id: "r_9".into(),
    });

    let actions = feed(&mut ctrl, &error_json("room is full"));
    assert_eq!(actions, vec![Action::ScheduleTimer(TimerKind::ErrorReset)]);
    assert_eq!(ctrl.session().connection, ConnectionStatus::Errored);
    let view = project(ctrl.session());
    assert_eq!(view.banner.text, "room is full");
    assert_eq!(view.banner.kind, StatusKind::Error);

    let actions = ctrl.handle_timer(TimerKind::ErrorReset);
    assert!(actions.contains(&Action::Disconnect));
    assert_eq!(ctrl.session().mode, Mode::Idle);
    assert!(ctrl.session().identity.is_none());
}

// ════════════════════════════════════════════════════════════════════
// Reconnection into a running game
// ════════════════════════════════════════════════════════════════════

#[test]
fn reconnected_restores_board_without_touching_seat() {
    let mut ctrl = connected_as("alice");
    ctrl.handle_intent(UserIntent::ChooseQuickMatch);
    feed(&mut ctrl, &start_json("g_1", 1, "bob"));

    feed(
        &mut ctrl,
        &reconnected_json(
            r#"{"rows":6,"cols":7,"board":[[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[1,2,0,0,0,0,0]],"turn":1}"#,
        ),
    );
    let game = ctrl.session().game.as_ref().unwrap();
    assert_eq!(game.board[5][0], Cell::Seat(Seat::One));
    assert_eq!(game.board[5][1], Cell::Seat(Seat::Two));
    assert_eq!(game.local_seat, Seat::One);
    assert_eq!(game.opponent, "bob");
    assert_eq!(ctrl.session().connection, ConnectionStatus::Connected);
}

#[test]
fn reconnected_without_game_is_a_protocol_violation() {
    let mut ctrl = connected_as("alice");
    let before = ctrl.session().clone();
    let actions = feed(&mut ctrl, &reconnected_json(&empty_state_json(6, 7, 1)));
    assert!(actions.is_empty());
    assert_eq!(ctrl.session(), &before);
}

// ════════════════════════════════════════════════════════════════════
// Disconnect mid-activity
// ════════════════════════════════════════════════════════════════════

#[test]
fn disconnect_while_waiting_resets_with_notice() {
    let mut ctrl = connected_as("alice");
    ctrl.handle_intent(UserIntent::ChooseQuickMatch);
    feed(&mut ctrl, &waiting_json());

    ctrl.handle_transport(TransportStatus::Closed);
    assert_eq!(ctrl.session().mode, Mode::Idle);
    assert_eq!(ctrl.session().connection, ConnectionStatus::Disconnected);
    let view = project(ctrl.session());
    assert_eq!(view.banner.text, "Disconnected from server");
    assert_eq!(view.banner.kind, StatusKind::Error);
    // The notice survives projection but a fresh identity entry is offered.
    assert_eq!(view.panel, Panel::IdentityEntry);
}

#[test]
fn duplicate_finished_frames_are_idempotent() {
    let mut ctrl = connected_as("alice");
    ctrl.handle_intent(UserIntent::ChooseQuickMatch);
    feed(&mut ctrl, &start_json("g_1", 1, "bob"));

    let frame = finished_json(&empty_state_json(6, 7, 1), "draw");
    let first = feed(&mut ctrl, &frame);
    let after_first = ctrl.session().clone();
    let second = feed(&mut ctrl, &frame);

    assert!(first.contains(&Action::ScheduleTimer(TimerKind::FinishedReset)));
    assert!(!second.contains(&Action::ScheduleTimer(TimerKind::FinishedReset)));
    assert_eq!(ctrl.session(), &after_first);
    assert_eq!(ctrl.session().last_result, Some(Outcome::Draw));
}
