//! HTTP polling client for the leaderboard and room-list panels.
//!
//! These panels ride a plain HTTP side channel, separate from the duplex
//! game connection, and never touch the session. [`PollingClient::run`]
//! emits a fresh [`PanelSnapshot`] immediately on start, then on a fixed
//! interval, plus whenever a refresh is requested. A failed fetch becomes
//! [`FetchState::Failed`] so the panels can render their placeholders; it is
//! retried no sooner than the next tick.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::protocol::{Leaderboard, RoomSummary};
use crate::view::FetchState;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// One round of panel data, sent as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSnapshot {
    pub leaderboard: FetchState<Leaderboard>,
    pub rooms: FetchState<Vec<RoomSummary>>,
}

/// Fetches `GET {base_url}/leaderboard` and `GET {base_url}/rooms`.
#[derive(Debug, Clone)]
pub struct PollingClient {
    http: reqwest::Client,
    base_url: String,
    interval: Duration,
}

impl PollingClient {
    /// Create a polling client for a server base URL such as
    /// `http://127.0.0.1:8080`. A trailing slash is tolerated.
    pub fn new(base_url: impl Into<String>) -> PollingClient {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        PollingClient {
            http: reqwest::Client::new(),
            base_url,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the poll interval. Mostly useful for tests.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> PollingClient {
        self.interval = interval;
        self
    }

    pub async fn fetch_leaderboard(&self) -> FetchState<Leaderboard> {
        let url = format!("{}/leaderboard", self.base_url);
        match self.get_json::<Leaderboard>(&url).await {
            Ok(board) => FetchState::Loaded(board),
            Err(err) => {
                warn!(%url, error = %err, "leaderboard fetch failed");
                FetchState::Failed
            }
        }
    }

    pub async fn fetch_rooms(&self) -> FetchState<Vec<RoomSummary>> {
        let url = format!("{}/rooms", self.base_url);
        match self.get_json::<Vec<RoomSummary>>(&url).await {
            Ok(rooms) => FetchState::Loaded(rooms),
            Err(err) => {
                warn!(%url, error = %err, "room list fetch failed");
                FetchState::Failed
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> reqwest::Result<T> {
        self.http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }

    /// Fetch both panels once.
    pub async fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            leaderboard: self.fetch_leaderboard().await,
            rooms: self.fetch_rooms().await,
        }
    }

    /// Poll until the output channel closes. A message on `refresh_rx`
    /// forces an immediate round; the first round runs without waiting for
    /// the interval.
    pub async fn run(
        self,
        mut refresh_rx: mpsc::UnboundedReceiver<()>,
        out: mpsc::Sender<PanelSnapshot>,
    ) {
        info!(base_url = %self.base_url, interval = ?self.interval, "panel polling started");
        let mut ticker = tokio::time::interval(self.interval);
        // Once every refresh handle is dropped the channel yields `None`
        // forever, so its select arm has to be disarmed, not retried.
        let mut refresh_open = true;
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                refresh = refresh_rx.recv(), if refresh_open => {
                    if refresh.is_none() {
                        refresh_open = false;
                        continue;
                    }
                    debug!("panel refresh requested");
                }
            }
            let snapshot = self.snapshot().await;
            if out.send(snapshot).await.is_err() {
                info!("panel consumer gone, polling stopped");
                return;
            }
        }
    }
}

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
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned HTTP responses: `/leaderboard` and `/rooms` get the
    /// given JSON bodies, everything else a 404.
    async fn stub_server(leaderboard: &'static str, rooms: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 1024];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).into_owned();
                let (status, body) = if request.starts_with("GET /leaderboard") {
                    ("200 OK", leaderboard)
                } else if request.starts_with("GET /rooms") {
                    ("200 OK", rooms)
                } else {
                    ("404 Not Found", "{}")
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn snapshot_fetches_both_panels() {
        let base = stub_server(
            r#"{"alice":3,"bob":7}"#,
            r#"[{"id":"r1","name":"den","creator":"alice","players":1,"max_players":2,"status":"waiting"}]"#,
        )
        .await;
        let client = PollingClient::new(base);
        let snapshot = client.snapshot().await;
        match snapshot.leaderboard {
            FetchState::Loaded(board) => {
                assert_eq!(board.get("bob"), Some(&7));
                assert_eq!(board.len(), 2);
            }
            FetchState::Failed => panic!("leaderboard should load"),
        }
        match snapshot.rooms {
            FetchState::Loaded(rooms) => {
                assert_eq!(rooms.len(), 1);
                assert_eq!(rooms[0].id, "r1");
                assert_eq!(rooms[0].max_players, 2);
            }
            FetchState::Failed => panic!("rooms should load"),
        }
    }

    #[tokio::test]
    async fn unreachable_server_maps_to_failed() {
        // Nothing listens on this address.
        let client = PollingClient::new("http://127.0.0.1:1");
        let snapshot = client.snapshot().await;
        assert_eq!(snapshot.leaderboard, FetchState::Failed);
        assert_eq!(snapshot.rooms, FetchState::Failed);
    }

    #[tokio::test]
    async fn http_error_status_maps_to_failed() {
        let base = stub_server("not json", "[]").await;
        let client = PollingClient::new(format!("{base}/missing"));
        let snapshot = client.snapshot().await;
        assert_eq!(snapshot.leaderboard, FetchState::Failed);
    }

    #[tokio::test]
    async fn run_emits_an_immediate_snapshot_and_honors_refresh() {
        let base = stub_server("{}", "[]").await;
        let client = PollingClient::new(base).with_interval(Duration::from_secs(60));
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let task = tokio::spawn(client.run(refresh_rx, out_tx));

        // First snapshot arrives without waiting for the long interval.
        let first = tokio::time::timeout(Duration::from_secs(5), out_rx.recv())
            .await
            .expect("first snapshot in time")
            .expect("channel open");
        assert_eq!(first.leaderboard, FetchState::Loaded(Leaderboard::new()));

        refresh_tx.send(()).unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), out_rx.recv())
            .await
            .expect("refresh snapshot in time")
            .expect("channel open");
        assert_eq!(second.rooms, FetchState::Loaded(Vec::new()));

        drop(out_rx);
        refresh_tx.send(()).unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
    }

    #[tokio::test]
    async fn run_keeps_ticking_after_refresh_handle_is_dropped() {
        let base = stub_server("{}", "[]").await;
        let client = PollingClient::new(base).with_interval(Duration::from_millis(20));
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel::<()>();
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let task = tokio::spawn(client.run(refresh_rx, out_tx));
        drop(refresh_tx);

        // Interval-driven snapshots keep flowing with no refresh sender left.
        for _ in 0..3 {
            let snapshot = tokio::time::timeout(Duration::from_secs(5), out_rx.recv())
                .await
                .expect("tick snapshot in time")
                .expect("channel open");
            assert_eq!(snapshot.leaderboard, FetchState::Loaded(Leaderboard::new()));
        }

        drop(out_rx);
        let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
    }
}
