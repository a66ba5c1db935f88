//! Session controller: the client-side state machine.
//!
//! [`SessionController`] owns the [`Session`] exclusively. It consumes user
//! intents, decoded server events, transport lifecycle changes, and timer
//! firings, applies one transition to completion, and returns the side
//! effects ([`Action`]s) the surrounding runtime must perform. The
//! controller itself performs no I/O, holds no timers, and never blocks,
//! which keeps every transition in this module unit-testable without an
//! executor.
//!
//! Events are applied strictly in delivery order. A `state` frame is
//! authoritative: the board is replaced wholesale, never merged.

use tracing::{debug, warn};

use crate::codec::ServerEvent;
use crate::protocol::{GameStatus, Intent, DRAW_TOKEN};
use crate::state::{
    ConnectionStatus, Game, Mode, Notice, Outcome, RoomRef, Seat, Session,
};

// ── Inputs and outputs ──────────────────────────────────────────────

/// User-originated inputs, produced by the input-dispatch boundary (a click,
/// a form submit) and validated here before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    /// Choose a display name. Must be non-empty after trimming; set exactly
    /// once per session.
    SetIdentity(String),
    /// Enter the quick-match queue.
    ChooseQuickMatch,
    /// Create a named room and wait in it.
    ChooseCreateRoom { room_name: String },
    /// Open the room browser (rooms are fetched over HTTP, not the socket).
    ChooseBrowseRooms,
    /// Join a listed room by id.
    JoinRoomById { room_id: String },
    /// Drop a disc in `column`. Silently ignored unless it is this client's
    /// turn in a running game; the server remains authoritative either way.
    SubmitMove { column: usize },
    /// Unconditionally clear the session back to idle.
    Reset,
}

/// Transport lifecycle changes reported by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStatus {
    Opened,
    Closed,
    Errored(String),
}

/// The two deferred tasks the controller schedules. At most one of each is
/// pending at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fixed delay after a finished game before the session resets.
    FinishedReset,
    /// Short delay after a server-reported error before the forced reset.
    ErrorReset,
}

/// Side effects a transition asks the runtime to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the duplex connection (emitted only while disconnected).
    Connect,
    /// Encode and send an outbound intent.
    Send(Intent),
    /// Start the deferred task for `TimerKind`, replacing nothing: the
    /// controller guarantees no duplicate schedule for a pending kind.
    ScheduleTimer(TimerKind),
    /// Abort the pending deferred task for `TimerKind`.
    CancelTimer(TimerKind),
    /// Close the duplex connection.
    Disconnect,
    /// Leaderboard / room-list panels should refresh now.
    RefreshPanels,
}

// ── Controller ──────────────────────────────────────────────────────

/// Owns the session and applies every transition.
#[derive(Debug, Default)]
pub struct SessionController {
    session: Session,
    finished_reset_pending: bool,
    error_reset_pending: bool,
}

impl SessionController {
    pub fn new() -> SessionController {
        SessionController::default()
    }

    /// Read-only view of the session for projection and assertions.
    pub fn session(&self) -> &Session {
        &self.session
    }

    // ── User intents ────────────────────────────────────────────────

    pub fn handle_intent(&mut self, intent: UserIntent) -> Vec<Action> {
        let actions = match intent {
            UserIntent::SetIdentity(name) => self.set_identity(name),
            UserIntent::ChooseQuickMatch => self.choose_quick_match(),
            UserIntent::ChooseCreateRoom { room_name } => self.choose_create_room(room_name),
            UserIntent::ChooseBrowseRooms => self.choose_browse_rooms(),
            UserIntent::JoinRoomById { room_id } => self.join_room_by_id(room_id),
            UserIntent::SubmitMove { column } => self.submit_move(column),
            UserIntent::Reset => self.full_reset(),
        };
        debug_assert!(self.session.invariants_hold());
        actions
    }

    fn set_identity(&mut self, name: String) -> Vec<Action> {
        let name = name.trim();
        if name.is_empty() {
            self.session.notice = Some(Notice::error("Please enter a username"));
            return Vec::new();
        }
        if self.session.identity.is_some() {
            warn!("identity already set; reset the session to change it");
            self.session.notice = Some(Notice::error("Username already set"));
            return Vec::new();
        }
        if self.session.mode != Mode::Idle {
            warn!(mode = ?self.session.mode, "SetIdentity ignored outside idle");
            return Vec::new();
        }
        self.session.identity = Some(name.to_owned());
        self.session.mode = Mode::ChoosingMode;
        self.session.notice = None;
        debug!(identity = %name, "identity set");
        Vec::new()
    }

    fn choose_quick_match(&mut self) -> Vec<Action> {
        let Some(username) = self.require_chooser("ChooseQuickMatch") else {
            return Vec::new();
        };
        self.session.mode = Mode::Matchmaking;
        let mut actions = self.connect_if_needed();
        actions.push(Action::Send(Intent::Join { username }));
        actions
    }

    fn choose_create_room(&mut self, room_name: String) -> Vec<Action> {
        let Some(username) = self.require_chooser("ChooseCreateRoom") else {
            return Vec::new();
        };
        let room_name = room_name.trim();
        if room_name.is_empty() {
            self.session.notice = Some(Notice::error("Please enter a room name"));
            return Vec::new();
        }
        self.session.mode = Mode::CreatingRoom;
        self.session.notice = None;
        let mut actions = self.connect_if_needed();
        actions.push(Action::Send(Intent::CreateRoom {
            username,
            room_name: room_name.to_owned(),
        }));
        actions
    }

    fn choose_browse_rooms(&mut self) -> Vec<Action> {
        if self.require_chooser("ChooseBrowseRooms").is_none() {
            return Vec::new();
        }
        self.session.mode = Mode::BrowsingRooms;
        vec![Action::RefreshPanels]
    }

    fn join_room_by_id(&mut self, room_id: String) -> Vec<Action> {
        if self.session.mode != Mode::BrowsingRooms {
            warn!(mode = ?self.session.mode, "JoinRoomById ignored outside room browser");
            return Vec::new();
        }
        let Some(username) = self.session.identity.clone() else {
            warn!("JoinRoomById ignored without identity");
            return Vec::new();
        };
        // Mode advances to WaitingInRoom only when the server confirms with
        // a room_joined frame; a full or closed room comes back as an error
        // frame instead.
        let mut actions = self.connect_if_needed();
        actions.push(Action::Send(Intent::JoinRoom { username, room_id }));
        actions
    }

    fn submit_move(&mut self, column: usize) -> Vec<Action> {
        // Client-side UX gate only. No queued or buffered moves: a failed
        // gate sends nothing.
        if self.session.mode != Mode::InGame {
            debug!(column, "move ignored: no game in progress");
            return Vec::new();
        }
        let Some(game) = &self.session.game else {
            return Vec::new();
        };
        if !game.is_local_turn() {
            debug!(column, "move ignored: not this client's turn");
            return Vec::new();
        }
        vec![Action::Send(Intent::Move {
            game_id: game.game_id.clone(),
            col: column,
        })]
    }

    /// Require a set identity and mode-chooser state for the Choose* intents.
    fn require_chooser(&mut self, what: &str) -> Option<String> {
        if self.session.mode != Mode::ChoosingMode {
            warn!(mode = ?self.session.mode, "{what} ignored outside mode chooser");
            return None;
        }
        self.session.identity.clone()
    }

    fn connect_if_needed(&mut self) -> Vec<Action> {
        if self.session.connection == ConnectionStatus::Disconnected {
            self.session.connection = ConnectionStatus::Connecting;
            vec![Action::Connect]
        } else {
            Vec::new()
        }
    }

    // ── Server events ───────────────────────────────────────────────

    pub fn handle_event(&mut self, event: ServerEvent) -> Vec<Action> {
        let actions = match event {
            ServerEvent::Waiting { timeout_secs } => self.on_waiting(timeout_secs),
            ServerEvent::RoomCreated { room_id, room } => {
                self.on_room(room_id, &room)
            }
            ServerEvent::RoomJoined { room_id, room } => {
                self.on_room(room_id, &room)
            }
            ServerEvent::Started {
                game_id,
                local_seat,
                opponent,
                state,
            } => self.on_started(game_id, local_seat, opponent, state),
            ServerEvent::StateUpdated {
                state,
                status,
                result,
            } => self.on_state_updated(state, status, result),
            ServerEvent::Reconnected { state } => self.on_reconnected(state),
            ServerEvent::ErrorNotice { message } => self.on_error_notice(message),
        };
        debug_assert!(self.session.invariants_hold());
        actions
    }

    fn on_waiting(&mut self, timeout_secs: u64) -> Vec<Action> {
        if matches!(self.session.mode, Mode::InGame | Mode::Finished) {
            warn!(timeout_secs, "waiting frame ignored during a game");
            return Vec::new();
        }
        self.session.wait_timeout_secs = Some(timeout_secs);
        // A room-bound session stays room-bound; everyone else is in the
        // matchmaking queue. The timeout itself is server-enforced.
        if self.session.mode != Mode::WaitingInRoom {
            self.session.mode = Mode::Matchmaking;
        }
        debug!(timeout_secs, "waiting for opponent");
        Vec::new()
    }

    fn on_room(&mut self, room_id: String, room: &crate::protocol::RoomWire) -> Vec<Action> {
        if matches!(self.session.mode, Mode::InGame | Mode::Finished) {
            warn!(%room_id, "room frame ignored during a game");
            return Vec::new();
        }
        self.session.room = Some(RoomRef::from_wire(room_id, room));
        self.session.mode = Mode::WaitingInRoom;
        self.session.notice = None;
        Vec::new()
    }

    fn on_started(
        &mut self,
        game_id: String,
        local_seat: Seat,
        opponent: String,
        state: crate::state::GameSnapshot,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        // A new game before a pending redirect fires supersedes the reset.
        if self.finished_reset_pending {
            self.finished_reset_pending = false;
            actions.push(Action::CancelTimer(TimerKind::FinishedReset));
        }
        debug!(%game_id, seat = local_seat.number(), %opponent, "game started");
        self.session.game = Some(Game::from_start(game_id, local_seat, opponent, state));
        self.session.mode = Mode::InGame;
        self.session.room = None;
        self.session.last_result = None;
        self.session.wait_timeout_secs = None;
        self.session.notice = None;
        actions.push(Action::RefreshPanels);
        actions
    }

    fn on_state_updated(
        &mut self,
        state: crate::state::GameSnapshot,
        status: GameStatus,
        result: Option<String>,
    ) -> Vec<Action> {
        let Some(game) = &mut self.session.game else {
            warn!("state frame ignored: no game established");
            return Vec::new();
        };
        if !game.accepts(&state) {
            warn!(
                expected_rows = game.rows,
                expected_cols = game.cols,
                got_rows = state.rows,
                got_cols = state.cols,
                "state frame ignored: board dimensions changed mid-game"
            );
            return Vec::new();
        }
        game.apply(state);

        match status {
            GameStatus::Playing => Vec::new(),
            GameStatus::Finished => {
                self.session.last_result = Some(self.interpret_result(result));
                self.session.mode = Mode::Finished;
                let mut actions = vec![Action::RefreshPanels];
                // A repeated finished frame must not arm a second timer.
                if !self.finished_reset_pending {
                    self.finished_reset_pending = true;
                    actions.push(Action::ScheduleTimer(TimerKind::FinishedReset));
                }
                actions
            }
        }
    }

    /// Map the raw `result` string onto a terminal outcome. The codec hands
    /// the string through untouched; only here does identity matter.
    fn interpret_result(&self, result: Option<String>) -> Outcome {
        let winner = match result {
            Some(s) => s.trim().to_owned(),
            None => String::new(),
        };
        if winner.is_empty() {
            return Outcome::Unknown;
        }
        if winner == DRAW_TOKEN {
            return Outcome::Draw;
        }
        let by_self = self.session.identity.as_deref() == Some(winner.as_str());
        Outcome::Won { winner, by_self }
    }

    fn on_reconnected(&mut self, state: crate::state::GameSnapshot) -> Vec<Action> {
        // Reconnection is defined only for an in-progress game. A
        // reconnected frame while finished (or with no game at all) is a
        // protocol violation: dropped, session unchanged.
        if self.session.mode != Mode::InGame {
            warn!(mode = ?self.session.mode, "reconnected frame ignored outside a running game");
            return Vec::new();
        }
        let Some(game) = &mut self.session.game else {
            return Vec::new();
        };
        if !game.accepts(&state) {
            warn!("reconnected frame ignored: board dimensions do not match");
            return Vec::new();
        }
        game.apply(state);
        self.session.connection = ConnectionStatus::Connected;
        self.session.notice = None;
        debug!("restored into running game");
        Vec::new()
    }

    fn on_error_notice(&mut self, message: String) -> Vec<Action> {
        warn!(%message, "server reported an error");
        self.session.notice = Some(Notice::error(message));
        self.session.connection = ConnectionStatus::Errored;
        if self.error_reset_pending {
            return Vec::new();
        }
        self.error_reset_pending = true;
        vec![Action::ScheduleTimer(TimerKind::ErrorReset)]
    }

    // ── Transport lifecycle ─────────────────────────────────────────

    pub fn handle_transport(&mut self, status: TransportStatus) -> Vec<Action> {
        let actions = match status {
            TransportStatus::Opened => {
                self.session.connection = ConnectionStatus::Connected;
                debug!("transport connected");
                Vec::new()
            }
            TransportStatus::Closed => {
                self.on_transport_lost(ConnectionStatus::Disconnected, "Disconnected from server")
            }
            TransportStatus::Errored(reason) => {
                warn!(%reason, "transport error");
                self.on_transport_lost(ConnectionStatus::Errored, "Connection error")
            }
        };
        debug_assert!(self.session.invariants_hold());
        actions
    }

    /// Connection loss mid-activity forces the session back to idle with a
    /// visible notice. No automatic reconnection is attempted; rejoining is
    /// user-initiated. A finished session keeps its result banner and its
    /// already-scheduled reset.
    fn on_transport_lost(&mut self, status: ConnectionStatus, notice: &str) -> Vec<Action> {
        let was_active = matches!(
            self.session.mode,
            Mode::CreatingRoom | Mode::WaitingInRoom | Mode::Matchmaking | Mode::InGame
        );
        if !was_active {
            self.session.connection = status;
            return Vec::new();
        }
        let mut actions = self.full_reset();
        self.session.connection = status;
        self.session.notice = Some(Notice::error(notice));
        actions.retain(|a| *a != Action::Disconnect);
        actions
    }

    // ── Timers ──────────────────────────────────────────────────────

    pub fn handle_timer(&mut self, kind: TimerKind) -> Vec<Action> {
        let actions = match kind {
            TimerKind::FinishedReset => {
                self.finished_reset_pending = false;
                debug!("deferred reset fired");
                self.full_reset()
            }
            TimerKind::ErrorReset => {
                self.error_reset_pending = false;
                debug!("deferred error reset fired");
                self.full_reset()
            }
        };
        debug_assert!(self.session.invariants_hold());
        actions
    }

    // ── Reset ───────────────────────────────────────────────────────

    /// Tear the whole session down to its initial empty form, cancelling
    /// any pending deferred task and closing the connection if one is open.
    fn full_reset(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.finished_reset_pending {
            self.finished_reset_pending = false;
            actions.push(Action::CancelTimer(TimerKind::FinishedReset));
        }
        if self.error_reset_pending {
            self.error_reset_pending = false;
            actions.push(Action::CancelTimer(TimerKind::ErrorReset));
        }
        if self.session.connection != ConnectionStatus::Disconnected {
            actions.push(Action::Disconnect);
        }
        self.session.reset();
        actions
    }
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
    use crate::state::{Cell, GameSnapshot};

    fn empty_snapshot(rows: usize, cols: usize, turn: Seat) -> GameSnapshot {
        GameSnapshot {
            rows,
            cols,
            board: vec![vec![Cell::Empty; cols]; rows],
            turn,
        }
    }

    /// Drive a controller to the start of a standard game.
    fn in_game(identity: &str, local_seat: Seat, opponent: &str) -> SessionController {
        let mut ctrl = SessionController::new();
        ctrl.handle_transport(TransportStatus::Opened);
        ctrl.handle_intent(UserIntent::SetIdentity(identity.into()));
        ctrl.handle_intent(UserIntent::ChooseQuickMatch);
        ctrl.handle_event(ServerEvent::Started {
            game_id: "g1".into(),
            local_seat,
            opponent: opponent.into(),
            state: empty_snapshot(6, 7, Seat::One),
        });
        ctrl
    }

    #[test]
    fn set_identity_rejects_blank_name() {
        let mut ctrl = SessionController::new();
        let actions = ctrl.handle_intent(UserIntent::SetIdentity("   ".into()));
        assert!(actions.is_empty());
        assert_eq!(ctrl.session().mode, Mode::Idle);
        assert!(ctrl.session().identity.is_none());
        assert!(ctrl.session().notice.is_some());
    }

    #[test]
    fn set_identity_moves_to_mode_chooser() {
        let mut ctrl = SessionController::new();
        ctrl.handle_intent(UserIntent::SetIdentity("  alice  ".into()));
        assert_eq!(ctrl.session().identity.as_deref(), Some("alice"));
        assert_eq!(ctrl.session().mode, Mode::ChoosingMode);
    }

    #[test]
    fn identity_is_immutable_until_reset() {
        let mut ctrl = SessionController::new();
        ctrl.handle_intent(UserIntent::SetIdentity("alice".into()));
        ctrl.handle_intent(UserIntent::SetIdentity("mallory".into()));
        assert_eq!(ctrl.session().identity.as_deref(), Some("alice"));

        ctrl.handle_intent(UserIntent::Reset);
        assert!(ctrl.session().identity.is_none());
        ctrl.handle_intent(UserIntent::SetIdentity("mallory".into()));
        assert_eq!(ctrl.session().identity.as_deref(), Some("mallory"));
    }

    #[test]
    fn quick_match_connects_and_sends_join() {
        let mut ctrl = SessionController::new();
        ctrl.handle_intent(UserIntent::SetIdentity("alice".into()));
        let actions = ctrl.handle_intent(UserIntent::ChooseQuickMatch);
        assert_eq!(
            actions,
            vec![
                Action::Connect,
                Action::Send(Intent::Join {
                    username: "alice".into()
                })
            ]
        );
        assert_eq!(ctrl.session().mode, Mode::Matchmaking);
        assert_eq!(ctrl.session().connection, ConnectionStatus::Connecting);
    }

    #[test]
    fn create_room_rejects_blank_name() {
        let mut ctrl = SessionController::new();
        ctrl.handle_intent(UserIntent::SetIdentity("alice".into()));
        let actions = ctrl.handle_intent(UserIntent::ChooseCreateRoom {
            room_name: "  ".into(),
        });
        assert!(actions.is_empty());
        assert_eq!(ctrl.session().mode, Mode::ChoosingMode);
        assert!(ctrl.session().notice.is_some());
    }

    #[test]
    fn room_created_binds_room_and_waits() {
        let mut ctrl = SessionController::new();
        ctrl.handle_transport(TransportStatus::Opened);
        ctrl.handle_intent(UserIntent::SetIdentity("alice".into()));
        ctrl.handle_intent(UserIntent::ChooseCreateRoom {
            room_name: "den".into(),
        });
        ctrl.handle_event(ServerEvent::RoomCreated {
            room_id: "r1".into(),
            room: crate::protocol::RoomWire {
                id: "r1".into(),
                name: "den".into(),
                creator: "alice".into(),
                player1: "alice".into(),
                ..Default::default()
            },
        });
        let room = ctrl.session().room.as_ref().unwrap();
        assert_eq!(room.room_id, "r1");
        assert_eq!(room.occupancy, 1);
        assert_eq!(room.capacity, 2);
        assert_eq!(ctrl.session().mode, Mode::WaitingInRoom);
    }

    #[test]
    fn waiting_keeps_room_bound_sessions_in_room() {
        let mut ctrl = SessionController::new();
        ctrl.handle_transport(TransportStatus::Opened);
        ctrl.handle_intent(UserIntent::SetIdentity("alice".into()));
        ctrl.handle_intent(UserIntent::ChooseCreateRoom {
            room_name: "den".into(),
        });
        ctrl.handle_event(ServerEvent::RoomCreated {
            room_id: "r1".into(),
            room: Default::default(),
        });
        ctrl.handle_event(ServerEvent::Waiting { timeout_secs: 15 });
        assert_eq!(ctrl.session().mode, Mode::WaitingInRoom);
        assert_eq!(ctrl.session().wait_timeout_secs, Some(15));
    }

    #[test]
    fn waiting_frame_is_ignored_while_a_game_is_live() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        let actions = ctrl.handle_event(ServerEvent::Waiting { timeout_secs: 15 });
        assert!(actions.is_empty());
        assert_eq!(ctrl.session().mode, Mode::InGame);
        assert!(ctrl.session().game.is_some());
        assert_eq!(ctrl.session().wait_timeout_secs, None);

        // Same once the game has finished: the result screen stays up.
        ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::Two),
            status: GameStatus::Finished,
            result: Some("alice".into()),
        });
        ctrl.handle_event(ServerEvent::Waiting { timeout_secs: 15 });
        assert_eq!(ctrl.session().mode, Mode::Finished);
        assert!(ctrl.session().game.is_some());
    }

    #[test]
    fn started_clears_room_and_prior_result() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        let session = ctrl.session();
        assert_eq!(session.mode, Mode::InGame);
        assert!(session.room.is_none());
        assert!(session.last_result.is_none());
        let game = session.game.as_ref().unwrap();
        assert_eq!(game.local_seat, Seat::One);
        assert_eq!(game.opponent, "bob");
        assert_eq!((game.rows, game.cols), (6, 7));
    }

    #[test]
    fn game_present_iff_in_game_or_finished() {
        // Invariant after every transition of a full lifecycle.
        let mut ctrl = SessionController::new();
        let check = |c: &SessionController| {
            assert!(c.session().invariants_hold());
            let gameful = matches!(c.session().mode, Mode::InGame | Mode::Finished);
            assert_eq!(c.session().game.is_some(), gameful);
        };
        ctrl.handle_transport(TransportStatus::Opened);
        check(&ctrl);
        ctrl.handle_intent(UserIntent::SetIdentity("alice".into()));
        check(&ctrl);
        ctrl.handle_intent(UserIntent::ChooseQuickMatch);
        check(&ctrl);
        ctrl.handle_event(ServerEvent::Waiting { timeout_secs: 15 });
        check(&ctrl);
        ctrl.handle_event(ServerEvent::Started {
            game_id: "g1".into(),
            local_seat: Seat::One,
            opponent: "bob".into(),
            state: empty_snapshot(6, 7, Seat::One),
        });
        check(&ctrl);
        ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::Two),
            status: GameStatus::Finished,
            result: Some("draw".into()),
        });
        check(&ctrl);
        ctrl.handle_timer(TimerKind::FinishedReset);
        check(&ctrl);
        assert_eq!(ctrl.session().mode, Mode::Idle);
    }

    #[test]
    fn state_update_replaces_board_wholesale() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        let mut snapshot = empty_snapshot(6, 7, Seat::Two);
        snapshot.board[5][3] = Cell::Seat(Seat::One);
        ctrl.handle_event(ServerEvent::StateUpdated {
            state: snapshot.clone(),
            status: GameStatus::Playing,
            result: None,
        });
        let game = ctrl.session().game.as_ref().unwrap();
        assert_eq!(game.board[5][3], Cell::Seat(Seat::One));
        assert_eq!(game.turn, Seat::Two);
    }

    #[test]
    fn state_update_is_idempotent() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        let mut snapshot = empty_snapshot(6, 7, Seat::Two);
        snapshot.board[5][0] = Cell::Seat(Seat::One);
        let update = ServerEvent::StateUpdated {
            state: snapshot,
            status: GameStatus::Playing,
            result: None,
        };
        ctrl.handle_event(update.clone());
        let first = ctrl.session().game.clone();
        ctrl.handle_event(update);
        assert_eq!(ctrl.session().game, first);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        let before = ctrl.session().game.clone();
        let actions = ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(5, 7, Seat::Two),
            status: GameStatus::Playing,
            result: None,
        });
        assert!(actions.is_empty());
        assert_eq!(ctrl.session().game, before);
    }

    #[test]
    fn finished_result_matching_identity_is_a_win() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::One),
            status: GameStatus::Finished,
            result: Some("alice".into()),
        });
        assert_eq!(
            ctrl.session().last_result,
            Some(Outcome::Won {
                winner: "alice".into(),
                by_self: true
            })
        );
        assert_eq!(ctrl.session().mode, Mode::Finished);
    }

    #[test]
    fn finished_result_naming_opponent_is_a_loss() {
        // Scenario: local identity "bob", seat two, opponent "alice" wins.
        let mut ctrl = in_game("bob", Seat::Two, "alice");
        let actions = ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::One),
            status: GameStatus::Finished,
            result: Some("alice".into()),
        });
        assert_eq!(
            ctrl.session().last_result,
            Some(Outcome::Won {
                winner: "alice".into(),
                by_self: false
            })
        );
        assert!(actions.contains(&Action::ScheduleTimer(TimerKind::FinishedReset)));
    }

    #[test]
    fn finished_draw_token_is_a_draw() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::One),
            status: GameStatus::Finished,
            result: Some("draw".into()),
        });
        assert_eq!(ctrl.session().last_result, Some(Outcome::Draw));
    }

    #[test]
    fn finished_without_result_is_unknown() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::One),
            status: GameStatus::Finished,
            result: None,
        });
        assert_eq!(ctrl.session().last_result, Some(Outcome::Unknown));
    }

    #[test]
    fn repeated_finished_frame_schedules_one_timer() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        let finished = ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::One),
            status: GameStatus::Finished,
            result: Some("alice".into()),
        };
        let first = ctrl.handle_event(finished.clone());
        let second = ctrl.handle_event(finished);
        assert!(first.contains(&Action::ScheduleTimer(TimerKind::FinishedReset)));
        assert!(!second.contains(&Action::ScheduleTimer(TimerKind::FinishedReset)));
    }

    #[test]
    fn move_is_sent_only_on_local_turn() {
        // Seat one, turn one: the move goes out.
        let mut ctrl = in_game("alice", Seat::One, "bob");
        let actions = ctrl.handle_intent(UserIntent::SubmitMove { column: 3 });
        assert_eq!(
            actions,
            vec![Action::Send(Intent::Move {
                game_id: "g1".into(),
                col: 3
            })]
        );
    }

    #[test]
    fn move_off_turn_sends_nothing() {
        // Seat one, but the turn token is on seat two.
        let mut ctrl = in_game("alice", Seat::One, "bob");
        ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::Two),
            status: GameStatus::Playing,
            result: None,
        });
        let actions = ctrl.handle_intent(UserIntent::SubmitMove { column: 3 });
        assert!(actions.is_empty());
    }

    #[test]
    fn move_outside_game_sends_nothing() {
        let mut ctrl = SessionController::new();
        ctrl.handle_intent(UserIntent::SetIdentity("alice".into()));
        let actions = ctrl.handle_intent(UserIntent::SubmitMove { column: 0 });
        assert!(actions.is_empty());
    }

    #[test]
    fn error_notice_schedules_forced_reset_once() {
        let mut ctrl = SessionController::new();
        ctrl.handle_transport(TransportStatus::Opened);
        ctrl.handle_intent(UserIntent::SetIdentity("alice".into()));
        ctrl.handle_intent(UserIntent::ChooseQuickMatch);
        let first = ctrl.handle_event(ServerEvent::ErrorNotice {
            message: "room not found".into(),
        });
        assert_eq!(first, vec![Action::ScheduleTimer(TimerKind::ErrorReset)]);
        assert_eq!(ctrl.session().connection, ConnectionStatus::Errored);
        assert_eq!(
            ctrl.session().notice.as_ref().unwrap().text,
            "room not found"
        );
        let second = ctrl.handle_event(ServerEvent::ErrorNotice {
            message: "again".into(),
        });
        assert!(second.is_empty());
    }

    #[test]
    fn error_reset_timer_forces_idle_and_clears_identity() {
        let mut ctrl = SessionController::new();
        ctrl.handle_transport(TransportStatus::Opened);
        ctrl.handle_intent(UserIntent::SetIdentity("alice".into()));
        ctrl.handle_intent(UserIntent::ChooseQuickMatch);
        ctrl.handle_event(ServerEvent::ErrorNotice {
            message: "boom".into(),
        });
        let actions = ctrl.handle_timer(TimerKind::ErrorReset);
        assert!(actions.contains(&Action::Disconnect));
        assert_eq!(ctrl.session().mode, Mode::Idle);
        assert!(ctrl.session().identity.is_none());
        assert_eq!(ctrl.session().connection, ConnectionStatus::Disconnected);
    }

    #[test]
    fn reset_cancels_pending_finished_timer() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::One),
            status: GameStatus::Finished,
            result: Some("draw".into()),
        });
        let actions = ctrl.handle_intent(UserIntent::Reset);
        assert!(actions.contains(&Action::CancelTimer(TimerKind::FinishedReset)));
        assert_eq!(ctrl.session(), &Session::default());
    }

    #[test]
    fn new_game_cancels_pending_finished_timer() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::One),
            status: GameStatus::Finished,
            result: Some("draw".into()),
        });
        let actions = ctrl.handle_event(ServerEvent::Started {
            game_id: "g2".into(),
            local_seat: Seat::Two,
            opponent: "carol".into(),
            state: empty_snapshot(6, 7, Seat::One),
        });
        assert!(actions.contains(&Action::CancelTimer(TimerKind::FinishedReset)));
        assert_eq!(ctrl.session().mode, Mode::InGame);
        assert!(ctrl.session().last_result.is_none());
    }

    #[test]
    fn transport_close_mid_game_forces_idle_with_notice() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        ctrl.handle_transport(TransportStatus::Closed);
        assert_eq!(ctrl.session().mode, Mode::Idle);
        assert!(ctrl.session().game.is_none());
        assert_eq!(ctrl.session().connection, ConnectionStatus::Disconnected);
        assert_eq!(
            ctrl.session().notice.as_ref().unwrap().text,
            "Disconnected from server"
        );
    }

    #[test]
    fn transport_close_while_idle_is_quiet() {
        let mut ctrl = SessionController::new();
        ctrl.handle_transport(TransportStatus::Opened);
        ctrl.handle_transport(TransportStatus::Closed);
        assert_eq!(ctrl.session().mode, Mode::Idle);
        assert!(ctrl.session().notice.is_none());
    }

    #[test]
    fn transport_close_while_finished_keeps_result_banner() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::One),
            status: GameStatus::Finished,
            result: Some("alice".into()),
        });
        ctrl.handle_transport(TransportStatus::Closed);
        // The scheduled reset will clean up; the result stays visible.
        assert_eq!(ctrl.session().mode, Mode::Finished);
        assert!(ctrl.session().last_result.is_some());
        assert_eq!(ctrl.session().connection, ConnectionStatus::Disconnected);
    }

    #[test]
    fn reconnected_replaces_board_of_running_game() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        let mut snapshot = empty_snapshot(6, 7, Seat::Two);
        snapshot.board[5][6] = Cell::Seat(Seat::Two);
        ctrl.handle_event(ServerEvent::Reconnected { state: snapshot });
        let game = ctrl.session().game.as_ref().unwrap();
        assert_eq!(game.board[5][6], Cell::Seat(Seat::Two));
        assert_eq!(game.turn, Seat::Two);
        assert_eq!(game.local_seat, Seat::One);
        assert_eq!(ctrl.session().connection, ConnectionStatus::Connected);
    }

    #[test]
    fn reconnected_after_finish_is_ignored() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::One),
            status: GameStatus::Finished,
            result: Some("alice".into()),
        });
        let before = ctrl.session().clone();
        let actions = ctrl.handle_event(ServerEvent::Reconnected {
            state: empty_snapshot(6, 7, Seat::Two),
        });
        assert!(actions.is_empty());
        assert_eq!(ctrl.session(), &before);
    }

    #[test]
    fn finished_reset_timer_restores_initial_session() {
        let mut ctrl = in_game("alice", Seat::One, "bob");
        ctrl.handle_event(ServerEvent::StateUpdated {
            state: empty_snapshot(6, 7, Seat::One),
            status: GameStatus::Finished,
            result: Some("bob".into()),
        });
        let actions = ctrl.handle_timer(TimerKind::FinishedReset);
        assert!(actions.contains(&Action::Disconnect));
        assert_eq!(ctrl.session(), &Session::default());
    }
}
