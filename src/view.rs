//! Render projector: a pure mapping from the session to a view model.
//!
//! [`project`] never mutates anything and consults nothing but the
//! [`Session`] it is given, so the same session always projects to the same
//! [`ViewModel`]. Frontends render the model verbatim; none of the strings
//! here are formatted further downstream.

use crate::protocol::{Leaderboard, RoomSummary};
use crate::state::{Cell, Mode, NoticeKind, Outcome, Seat, Session};

// ── View model ──────────────────────────────────────────────────────

/// Everything a frontend needs to draw one frame of the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    /// Which primary panel is visible.
    pub panel: Panel,
    /// The persistent status line.
    pub banner: Banner,
    /// Turn prompt, shown only while a game is running.
    pub turn_indicator: Option<String>,
    /// Board grid, present in game and finished modes.
    pub board: Option<BoardView>,
    /// The two player name plates, present alongside the board.
    pub players: Option<PlayerPanels>,
    /// Game-over overlay, present only in finished mode.
    pub announcement: Option<Announcement>,
}

/// The primary panel for each session mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    IdentityEntry,
    ModeChooser,
    CreateRoomForm,
    RoomBrowser,
    WaitingBanner,
    Game,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub text: String,
    pub kind: StatusKind,
}

/// Styling hint for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Idle,
    Waiting,
    Playing,
    Finished,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub rows: usize,
    pub cols: usize,
    /// Row-major, `rows * cols` cells.
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellView {
    pub occupant: Cell,
    /// Whether dropping a disc here may be attempted right now.
    pub clickable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerPanels {
    pub seat1: PlayerSlot,
    pub seat2: PlayerSlot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSlot {
    pub label: String,
    /// Highlighted while this seat holds the turn token.
    pub active: bool,
}

/// Game-over overlay content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub headline: String,
    pub detail: Option<String>,
    pub countdown: Option<String>,
}

// ── Projection ──────────────────────────────────────────────────────

/// Project the session into a complete view model.
pub fn project(session: &Session) -> ViewModel {
    ViewModel {
        panel: panel_for(session.mode),
        banner: banner_for(session),
        turn_indicator: turn_indicator_for(session),
        board: board_for(session),
        players: players_for(session),
        announcement: announcement_for(session),
    }
}

fn panel_for(mode: Mode) -> Panel {
    match mode {
        Mode::Idle => Panel::IdentityEntry,
        Mode::ChoosingMode => Panel::ModeChooser,
        Mode::CreatingRoom => Panel::CreateRoomForm,
        Mode::BrowsingRooms => Panel::RoomBrowser,
        Mode::WaitingInRoom | Mode::Matchmaking => Panel::WaitingBanner,
        Mode::InGame | Mode::Finished => Panel::Game,
    }
}

fn banner_for(session: &Session) -> Banner {
    // An active notice wins over everything else.
    if let Some(notice) = &session.notice {
        return Banner {
            text: notice.text.clone(),
            kind: match notice.kind {
                NoticeKind::Error => StatusKind::Error,
                NoticeKind::Info => StatusKind::Idle,
            },
        };
    }
    match session.mode {
        Mode::Finished => Banner {
            text: result_banner(session),
            kind: StatusKind::Finished,
        },
        Mode::InGame => Banner {
            text: match &session.game {
                Some(game) => format!("🎮 Game started! Playing against {}", game.opponent),
                None => String::new(),
            },
            kind: StatusKind::Playing,
        },
        Mode::Matchmaking | Mode::WaitingInRoom => match session.wait_timeout_secs {
            Some(secs) => Banner {
                text: format!("⏳ Waiting for opponent... (timeout: {secs}s)"),
                kind: StatusKind::Waiting,
            },
            None => connected_banner(session),
        },
        Mode::ChoosingMode | Mode::CreatingRoom | Mode::BrowsingRooms => connected_banner(session),
        Mode::Idle => Banner {
            text: "Ready to play! Enter your username and join.".to_owned(),
            kind: StatusKind::Idle,
        },
    }
}

fn connected_banner(session: &Session) -> Banner {
    let name = session.identity.as_deref().unwrap_or_default();
    Banner {
        text: format!("Connected as {name}"),
        kind: StatusKind::Idle,
    }
}

fn result_banner(session: &Session) -> String {
    match &session.last_result {
        Some(Outcome::Draw) => "🤝 Game ended in a draw!".to_owned(),
        Some(Outcome::Won { by_self: true, .. }) => "🎉 You won!".to_owned(),
        Some(Outcome::Won {
            winner,
            by_self: false,
        }) => format!("😔 {winner} won! You lost!"),
        Some(Outcome::Unknown) | None => "Game finished".to_owned(),
    }
}

fn turn_indicator_for(session: &Session) -> Option<String> {
    if session.mode != Mode::InGame {
        return None;
    }
    let game = session.game.as_ref()?;
    let text = if game.is_local_turn() {
        format!("🎯 Your turn! (Player {})", game.local_seat.number())
    } else {
        format!("⏳ Opponent's turn... (Player {})", game.turn.number())
    };
    Some(text)
}

fn board_for(session: &Session) -> Option<BoardView> {
    let game = session.game.as_ref()?;
    let clickable = session.mode == Mode::InGame && game.is_local_turn();
    let mut cells = Vec::with_capacity(game.rows * game.cols);
    for row in &game.board {
        for cell in row {
            cells.push(CellView {
                occupant: *cell,
                clickable,
            });
        }
    }
    Some(BoardView {
        rows: game.rows,
        cols: game.cols,
        cells,
    })
}

fn players_for(session: &Session) -> Option<PlayerPanels> {
    let game = session.game.as_ref()?;
    let local_name = session.identity.as_deref().unwrap_or_default();
    let slot = |seat: Seat| {
        let label = if seat == game.local_seat {
            format!("{local_name} (You)")
        } else {
            game.opponent.clone()
        };
        PlayerSlot {
            label,
            active: session.mode == Mode::InGame && game.turn == seat,
        }
    };
    Some(PlayerPanels {
        seat1: slot(Seat::One),
        seat2: slot(Seat::Two),
    })
}

fn announcement_for(session: &Session) -> Option<Announcement> {
    if session.mode != Mode::Finished {
        return None;
    }
    let countdown = Some("Redirecting in 10 seconds...".to_owned());
    let announcement = match &session.last_result {
        Some(Outcome::Draw) => Announcement {
            headline: "Draw!".to_owned(),
            detail: None,
            countdown,
        },
        Some(Outcome::Won { by_self: true, .. }) => Announcement {
            headline: "You Won!".to_owned(),
            detail: Some("Congratulations!".to_owned()),
            countdown,
        },
        Some(Outcome::Won {
            winner,
            by_self: false,
        }) => Announcement {
            headline: format!("{winner} Won!"),
            detail: Some("You Lost!".to_owned()),
            countdown,
        },
        Some(Outcome::Unknown) | None => Announcement {
            headline: "Game Finished".to_owned(),
            detail: None,
            countdown: None,
        },
    };
    Some(announcement)
}

// ── Side panels ─────────────────────────────────────────────────────

/// Result of one background fetch, kept as-is until the next one lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState<T> {
    Loaded(T),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardView {
    /// Sorted by wins descending; ranks start at 1.
    pub rows: Vec<LeaderboardRow>,
    /// Set instead of rows when there is nothing to show.
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub name: String,
    pub wins: u64,
}

/// Project a leaderboard fetch into its panel.
pub fn project_leaderboard(fetch: &FetchState<Leaderboard>) -> LeaderboardView {
    match fetch {
        FetchState::Failed => LeaderboardView {
            rows: Vec::new(),
            placeholder: Some("Failed to load leaderboard".to_owned()),
        },
        FetchState::Loaded(board) if board.is_empty() => LeaderboardView {
            rows: Vec::new(),
            placeholder: Some("No games played yet".to_owned()),
        },
        FetchState::Loaded(board) => {
            let mut entries: Vec<(&String, &u64)> = board.iter().collect();
            // Stable sort: ties keep the map's name ordering.
            entries.sort_by(|a, b| b.1.cmp(a.1));
            let rows = entries
                .into_iter()
                .enumerate()
                .map(|(idx, (name, wins))| LeaderboardRow {
                    rank: idx + 1,
                    name: name.clone(),
                    wins: *wins,
                })
                .collect();
            LeaderboardView {
                rows,
                placeholder: None,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListView {
    pub rooms: Vec<RoomSummary>,
    pub placeholder: Option<String>,
}

/// Project a room-list fetch into its panel.
pub fn project_rooms(fetch: &FetchState<Vec<RoomSummary>>) -> RoomListView {
    match fetch {
        FetchState::Failed => RoomListView {
            rooms: Vec::new(),
            placeholder: Some("Failed to load rooms".to_owned()),
        },
        FetchState::Loaded(rooms) if rooms.is_empty() => RoomListView {
            rooms: Vec::new(),
            placeholder: Some("No rooms available".to_owned()),
        },
        FetchState::Loaded(rooms) => RoomListView {
            rooms: rooms.clone(),
            placeholder: None,
        },
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
    use crate::state::{ConnectionStatus, Game, GameSnapshot, Notice};

    fn game(local_seat: Seat, turn: Seat) -> Game {
        Game::from_start(
            "g1".into(),
            local_seat,
            "bob".into(),
            GameSnapshot {
                rows: 6,
                cols: 7,
                board: vec![vec![Cell::Empty; 7]; 6],
                turn,
            },
        )
    }

    fn in_game_session(local_seat: Seat, turn: Seat) -> Session {
        Session {
            identity: Some("alice".into()),
            connection: ConnectionStatus::Connected,
            mode: Mode::InGame,
            game: Some(game(local_seat, turn)),
            ..Session::default()
        }
    }

    #[test]
    fn idle_session_projects_identity_entry() {
        let view = project(&Session::default());
        assert_eq!(view.panel, Panel::IdentityEntry);
        assert_eq!(
            view.banner.text,
            "Ready to play! Enter your username and join."
        );
        assert!(view.board.is_none());
        assert!(view.players.is_none());
        assert!(view.announcement.is_none());
    }

    #[test]
    fn waiting_banner_includes_timeout() {
        let session = Session {
            identity: Some("alice".into()),
            connection: ConnectionStatus::Connected,
            mode: Mode::Matchmaking,
            wait_timeout_secs: Some(15),
            ..Session::default()
        };
        let view = project(&session);
        assert_eq!(view.panel, Panel::WaitingBanner);
        assert_eq!(view.banner.text, "⏳ Waiting for opponent... (timeout: 15s)");
        assert_eq!(view.banner.kind, StatusKind::Waiting);
    }

    #[test]
    fn local_turn_marks_cells_clickable() {
        let view = project(&in_game_session(Seat::One, Seat::One));
        assert_eq!(view.turn_indicator.as_deref(), Some("🎯 Your turn! (Player 1)"));
        let board = view.board.unwrap();
        assert_eq!(board.cells.len(), 42);
        assert!(board.cells.iter().all(|c| c.clickable));
    }

    #[test]
    fn opponent_turn_locks_the_board() {
        let view = project(&in_game_session(Seat::One, Seat::Two));
        assert_eq!(
            view.turn_indicator.as_deref(),
            Some("⏳ Opponent's turn... (Player 2)")
        );
        assert!(view.board.unwrap().cells.iter().all(|c| !c.clickable));
    }

    #[test]
    fn player_panels_mark_local_seat_and_turn() {
        let view = project(&in_game_session(Seat::Two, Seat::One));
        let players = view.players.unwrap();
        assert_eq!(players.seat1.label, "bob");
        assert!(players.seat1.active);
        assert_eq!(players.seat2.label, "alice (You)");
        assert!(!players.seat2.active);
    }

    #[test]
    fn win_projects_banner_and_announcement() {
        let mut session = in_game_session(Seat::One, Seat::One);
        session.mode = Mode::Finished;
        session.last_result = Some(Outcome::Won {
            winner: "alice".into(),
            by_self: true,
        });
        let view = project(&session);
        assert_eq!(view.banner.text, "🎉 You won!");
        assert_eq!(view.banner.kind, StatusKind::Finished);
        let announcement = view.announcement.unwrap();
        assert_eq!(announcement.headline, "You Won!");
        assert_eq!(announcement.detail.as_deref(), Some("Congratulations!"));
        assert_eq!(
            announcement.countdown.as_deref(),
            Some("Redirecting in 10 seconds...")
        );
        assert!(view.turn_indicator.is_none());
    }

    #[test]
    fn loss_names_the_winner() {
        let mut session = in_game_session(Seat::Two, Seat::One);
        session.last_result = Some(Outcome::Won {
            winner: "bob".into(),
            by_self: false,
        });
        session.mode = Mode::Finished;
        let view = project(&session);
        assert_eq!(view.banner.text, "😔 bob won! You lost!");
        let announcement = view.announcement.unwrap();
        assert_eq!(announcement.headline, "bob Won!");
        assert_eq!(announcement.detail.as_deref(), Some("You Lost!"));
    }

    #[test]
    fn draw_projects_draw_strings() {
        let mut session = in_game_session(Seat::One, Seat::One);
        session.last_result = Some(Outcome::Draw);
        session.mode = Mode::Finished;
        let view = project(&session);
        assert_eq!(view.banner.text, "🤝 Game ended in a draw!");
        assert_eq!(view.announcement.unwrap().headline, "Draw!");
    }

    #[test]
    fn unknown_result_has_no_countdown() {
        let mut session = in_game_session(Seat::One, Seat::One);
        session.last_result = Some(Outcome::Unknown);
        session.mode = Mode::Finished;
        let view = project(&session);
        assert_eq!(view.banner.text, "Game finished");
        let announcement = view.announcement.unwrap();
        assert_eq!(announcement.headline, "Game Finished");
        assert!(announcement.countdown.is_none());
    }

    #[test]
    fn notice_overrides_mode_banner() {
        let session = Session {
            identity: Some("alice".into()),
            mode: Mode::ChoosingMode,
            notice: Some(Notice::error("Disconnected from server")),
            ..Session::default()
        };
        let view = project(&session);
        assert_eq!(view.banner.text, "Disconnected from server");
        assert_eq!(view.banner.kind, StatusKind::Error);
    }

    #[test]
    fn projection_is_deterministic() {
        let session = in_game_session(Seat::One, Seat::Two);
        assert_eq!(project(&session), project(&session));
    }

    #[test]
    fn leaderboard_sorts_by_wins_descending() {
        let mut board = Leaderboard::new();
        board.insert("alice".into(), 3);
        board.insert("bob".into(), 7);
        board.insert("carol".into(), 3);
        let view = project_leaderboard(&FetchState::Loaded(board));
        assert!(view.placeholder.is_none());
        let names: Vec<&str> = view.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["bob", "alice", "carol"]);
        assert_eq!(view.rows[0].rank, 1);
        assert_eq!(view.rows[2].rank, 3);
    }

    #[test]
    fn empty_leaderboard_shows_placeholder() {
        let view = project_leaderboard(&FetchState::Loaded(Leaderboard::new()));
        assert_eq!(view.placeholder.as_deref(), Some("No games played yet"));
        assert!(view.rows.is_empty());
    }

    #[test]
    fn failed_fetches_show_error_placeholders() {
        let lb = project_leaderboard(&FetchState::Failed);
        assert_eq!(lb.placeholder.as_deref(), Some("Failed to load leaderboard"));
        let rooms = project_rooms(&FetchState::Failed);
        assert_eq!(rooms.placeholder.as_deref(), Some("Failed to load rooms"));
    }
}
