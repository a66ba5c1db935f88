#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration tests for the Fourline Client.
//!
//! Drives `FourlineClient` against mock transports: the scripted
//! `MockTransport` from `tests/common` for fixed frame sequences, and a
//! channel-fed transport for flows where the test must interleave its own
//! intents with server frames.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use fourline_client::protocol::Intent;
use fourline_client::view::{Panel, ViewModel};
use fourline_client::{
    ClientEvent, FourlineClient, FourlineConfig, FourlineError, Transport,
};

use common::{
    empty_state_json, error_json, finished_json, reconnected_json, room_created_json, start_json,
    state_json, waiting_json, MockTransport,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

/// A transport whose incoming frames are fed by the test over a channel,
/// so server frames can be interleaved with client intents. Dropping the
/// sender reads as a clean server-side close.
struct ChannelTransport {
    rx: mpsc::UnboundedReceiver<Result<String, FourlineError>>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl ChannelTransport {
    #[allow(clippy::type_complexity)]
    fn new() -> (
        Self,
        mpsc::UnboundedSender<Result<String, FourlineError>>,
        Arc<StdMutex<Vec<String>>>,
        Arc<AtomicBool>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            rx,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, tx, sent, closed)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, message: String) -> Result<(), FourlineError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, FourlineError>> {
        self.rx.recv().await
    }

    async fn close(&mut self) -> Result<(), FourlineError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// Receive the next `View` event, skipping `RefreshPanels`.
async fn next_view(events: &mut mpsc::Receiver<ClientEvent>) -> Box<ViewModel> {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event in time")
            .expect("event channel open")
        {
            ClientEvent::View(view) => return view,
            ClientEvent::RefreshPanels => {}
            other => panic!("expected View event, got {other:?}"),
        }
    }
}

/// Receive events until a `Disconnected` arrives, returning its reason.
async fn await_disconnected(events: &mut mpsc::Receiver<ClientEvent>) -> Option<String> {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event in time")
            .expect("event channel open")
        {
            ClientEvent::Disconnected { reason } => return reason,
            _ => {}
        }
    }
}

fn last_sent_intent(sent: &Arc<StdMutex<Vec<String>>>) -> Intent {
    let messages = sent.lock().unwrap();
    serde_json::from_str(messages.last().expect("a sent message")).expect("valid intent json")
}

// ════════════════════════════════════════════════════════════════════
// Full quick-match game over the wire
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn quick_match_game_end_to_end() {
    let (transport, server_tx, sent, closed) = ChannelTransport::new();
    let config = FourlineConfig::new().with_reset_delay(Duration::from_millis(20));
    let (client, mut events) = FourlineClient::start(transport, config);

    assert!(matches!(
        events.recv().await.unwrap(),
        ClientEvent::Connected
    ));
    let view = next_view(&mut events).await;
    assert_eq!(view.panel, Panel::IdentityEntry);

    client.set_identity("alice").unwrap();
    let view = next_view(&mut events).await;
    assert_eq!(view.panel, Panel::ModeChooser);
    assert_eq!(view.banner.text, "Connected as alice");

    client.quick_match().unwrap();
    let _ = next_view(&mut events).await;
    assert_eq!(
        last_sent_intent(&sent),
        Intent::Join {
            username: "alice".into()
        }
    );

    server_tx.send(Ok(waiting_json())).unwrap();
    let view = next_view(&mut events).await;
    assert_eq!(view.banner.text, "⏳ Waiting for opponent... (timeout: 15s)");

    server_tx.send(Ok(start_json("g_1", 1, "bob"))).unwrap();
    let view = next_view(&mut events).await;
    assert_eq!(view.panel, Panel::Game);
    assert_eq!(view.turn_indicator.as_deref(), Some("🎯 Your turn! (Player 1)"));
    let players = view.players.as_ref().unwrap();
    assert_eq!(players.seat1.label, "alice (You)");
    assert_eq!(players.seat2.label, "bob");

    client.submit_move(3).unwrap();
    let _ = next_view(&mut events).await;
    assert_eq!(
        last_sent_intent(&sent),
        Intent::Move {
            game_id: "g_1".into(),
            col: 3
        }
    );

    server_tx
        .send(Ok(state_json(&empty_state_json(6, 7, 2))))
        .unwrap();
    let view = next_view(&mut events).await;
    assert_eq!(
        view.turn_indicator.as_deref(),
        Some("⏳ Opponent's turn... (Player 2)")
    );

    server_tx
        .send(Ok(finished_json(&empty_state_json(6, 7, 2), "alice")))
        .unwrap();
    let view = next_view(&mut events).await;
    assert_eq!(view.banner.text, "🎉 You won!");
    let announcement = view.announcement.as_ref().unwrap();
    assert_eq!(announcement.headline, "You Won!");
    assert_eq!(announcement.detail.as_deref(), Some("Congratulations!"));

    // The deferred reset fires, the session clears, and the loop winds down.
    let view = next_view(&mut events).await;
    assert_eq!(view.panel, Panel::IdentityEntry);
    assert!(await_disconnected(&mut events).await.is_none());
    assert!(closed.load(Ordering::Relaxed));
    assert!(!client.is_connected());
}

// ════════════════════════════════════════════════════════════════════
// Create-room flow
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn create_room_flow_reaches_game() {
    let (transport, server_tx, sent, _closed) = ChannelTransport::new();
    let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

    let _ = events.recv().await; // Connected
    let _ = next_view(&mut events).await;

    client.set_identity("alice").unwrap();
    let _ = next_view(&mut events).await;

    client.create_room("the den").unwrap();
    let _ = next_view(&mut events).await;
    assert_eq!(
        last_sent_intent(&sent),
        Intent::CreateRoom {
            username: "alice".into(),
            room_name: "the den".into()
        }
    );

    server_tx
        .send(Ok(room_created_json("r_1", "the den", "alice")))
        .unwrap();
    let view = next_view(&mut events).await;
    assert_eq!(view.panel, Panel::WaitingBanner);

    server_tx.send(Ok(start_json("g_2", 1, "bob"))).unwrap();
    let view = next_view(&mut events).await;
    assert_eq!(view.panel, Panel::Game);
    assert_eq!(view.banner.text, "🎮 Game started! Playing against bob");

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Room-join rejection
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn join_rejection_shows_error_then_resets() {
    let (transport, server_tx, sent, _closed) = ChannelTransport::new();
    let config = FourlineConfig::new().with_error_reset_delay(Duration::from_millis(20));
    let (client, mut events) = FourlineClient::start(transport, config);

    let _ = events.recv().await; // Connected
    let _ = next_view(&mut events).await;

    client.set_identity("bob").unwrap();
    let _ = next_view(&mut events).await;
    client.browse_rooms().unwrap();
    let view = next_view(&mut events).await;
    assert_eq!(view.panel, Panel::RoomBrowser);

    client.join_room("r_9").unwrap();
    let _ = next_view(&mut events).await;
    assert_eq!(
        last_sent_intent(&sent),
        Intent::JoinRoom {
            username: "bob".into(),
            room_id: "r_9".into()
        }
    );

    server_tx.send(Ok(error_json("room is full"))).unwrap();
    let view = next_view(&mut events).await;
    assert_eq!(view.banner.text, "room is full");

    // The forced reset disconnects and ends the loop.
    let view = next_view(&mut events).await;
    assert_eq!(view.panel, Panel::IdentityEntry);
    let _ = await_disconnected(&mut events).await;
    assert!(!client.is_connected());
}

// ════════════════════════════════════════════════════════════════════
// Scripted flows on the fixed-sequence transport
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn reconnected_frame_restores_running_game() {
    let board =
        r#"{"rows":6,"cols":7,"board":[[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[0,0,0,0,0,0,0],[1,2,0,0,0,0,0]],"turn":1}"#;
    let (transport, _sent, _closed) = MockTransport::new(vec![
        Some(Ok(start_json("g_1", 1, "bob"))),
        Some(Ok(reconnected_json(board))),
    ]);
    let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

    let _ = events.recv().await; // Connected
    let _ = next_view(&mut events).await; // initial
    let _ = next_view(&mut events).await; // game on empty board

    let view = next_view(&mut events).await; // after reconnected
    assert_eq!(view.panel, Panel::Game);
    let cells = &view.board.as_ref().unwrap().cells;
    // Bottom-left two cells are occupied in the restored board.
    assert_eq!(cells.len(), 42);
    assert!(cells[35].occupant != fourline_client::Cell::Empty);
    assert!(cells[36].occupant != fourline_client::Cell::Empty);

    client.shutdown().await;
}

#[tokio::test]
async fn malformed_frame_is_dropped_without_killing_the_loop() {
    let (transport, _sent, _closed) = MockTransport::new(vec![
        Some(Ok("{definitely not json".to_owned())),
        Some(Ok(waiting_json())),
    ]);
    let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

    let _ = events.recv().await; // Connected
    let _ = next_view(&mut events).await; // initial

    // The bad frame emits nothing; the next valid frame still comes through.
    let view = next_view(&mut events).await;
    assert_eq!(view.banner.text, "⏳ Waiting for opponent... (timeout: 15s)");

    client.shutdown().await;
}

#[tokio::test]
async fn server_close_mid_wait_ends_with_notice() {
    let (transport, _sent, _closed) =
        MockTransport::new(vec![Some(Ok(waiting_json())), None]);
    let (client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

    let _ = events.recv().await; // Connected
    let _ = next_view(&mut events).await; // initial
    let _ = next_view(&mut events).await; // waiting

    let view = next_view(&mut events).await;
    assert_eq!(view.banner.text, "Disconnected from server");
    assert!(await_disconnected(&mut events).await.is_none());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn shutdown_closes_transport_and_reports_reason() {
    let (transport, _sent, closed) = MockTransport::new(vec![]);
    let (mut client, mut events) = FourlineClient::start(transport, FourlineConfig::new());

    let _ = events.recv().await; // Connected
    let _ = next_view(&mut events).await;

    client.shutdown().await;

    let reason = await_disconnected(&mut events).await;
    assert_eq!(reason.as_deref(), Some("client shut down"));
    assert!(closed.load(Ordering::Relaxed));
    assert!(matches!(
        client.quick_match(),
        Err(FourlineError::NotConnected)
    ));
}
