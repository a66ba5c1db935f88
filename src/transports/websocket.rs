//! WebSocket game transport built on `tokio-tungstenite`.
//!
//! The game server speaks JSON over a single WebSocket per player, one
//! frame per message. [`WebSocketTransport`] maps that onto the
//! [`Transport`] contract: text frames pass through, control frames are
//! absorbed, and a close frame ends the stream. Both `ws://` and `wss://`
//! work; TLS rides on [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! Available with the `transport-websocket` feature (on by default).
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), fourline_client::FourlineError> {
//! use fourline_client::{Transport, WebSocketTransport};
//!
//! let mut ws = WebSocketTransport::connect("ws://localhost:8080/ws").await?;
//! ws.send(r#"{"type":"join","username":"alice"}"#.to_string()).await?;
//! while let Some(Ok(frame)) = ws.recv().await {
//!     println!("server: {frame}");
//! }
//! ws.close().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, warn};

use crate::error::FourlineError;
use crate::transport::Transport;

/// The connected stream type `tokio-tungstenite` produces.
///
/// Public so callers doing their own handshake (custom TLS, proxies,
/// extra headers) can hand the result to
/// [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// [`Transport`] over one player's WebSocket to the game server.
///
/// Built with [`connect`](Self::connect) (or
/// [`connect_with_timeout`](Self::connect_with_timeout)) for the common
/// case, or wrapped around a pre-established stream with
/// [`from_stream`](Self::from_stream).
///
/// `recv` is cancel-safe: the stream half of `tungstenite` buffers whole
/// messages, so dropping an in-flight `recv` future loses nothing. That is
/// what lets the client loop poll it inside `tokio::select!`.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

/// Preserve the I/O error kind where there is one; handshake and protocol
/// failures collapse to `Other`.
fn connect_error(err: tungstenite::Error) -> FourlineError {
    let kind = match &err {
        tungstenite::Error::Io(io) => io.kind(),
        _ => std::io::ErrorKind::Other,
    };
    FourlineError::Io(std::io::Error::new(kind, err))
}

impl WebSocketTransport {
    /// Dial the game server at `url` (`ws://` or `wss://`).
    ///
    /// # Errors
    ///
    /// Returns [`FourlineError::Io`] when the URL is invalid or the
    /// handshake fails.
    pub async fn connect(url: &str) -> Result<Self, FourlineError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(connect_error)?;
        debug!(%url, "websocket session established");
        Ok(Self::from_stream(stream))
    }

    /// Like [`connect`](Self::connect), bounded by a deadline.
    ///
    /// # Errors
    ///
    /// Returns [`FourlineError::Timeout`] when the deadline elapses first,
    /// otherwise whatever [`connect`](Self::connect) returns.
    pub async fn connect_with_timeout(
        url: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, FourlineError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| FourlineError::Timeout)?
    }

    /// Wrap an already-connected stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), FourlineError> {
        if self.closed {
            return Err(FourlineError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| FourlineError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, FourlineError>> {
        while let Some(item) = self.stream.next().await {
            let msg = match item {
                Ok(msg) => msg,
                Err(e) => return Some(Err(FourlineError::TransportReceive(e.to_string()))),
            };
            match msg {
                // `Utf8Bytes` has no by-value route to the inner buffer, so
                // the payload is copied out.
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    debug!(?frame, "server closed the session");
                    return None;
                }
                Message::Binary(payload) => {
                    // The game protocol is text-only.
                    warn!(len = payload.len(), "discarding binary frame");
                }
                // tungstenite answers pings itself, and the read half never
                // yields raw `Frame`s; none of these reach the game layer.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        None
    }

    async fn close(&mut self) -> Result<(), FourlineError> {
        // tungstenite errors on a second close, so track it ourselves and
        // keep close idempotent for the client loop.
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| FourlineError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
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
    use tokio::net::TcpListener;

    /// Accept one WebSocket connection on an ephemeral port, run `server`
    /// against it, and hand back the url to dial.
    async fn one_shot_server<F, Fut>(server: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            server(tokio_tungstenite::accept_async(tcp).await.unwrap()).await;
        });
        format!("ws://{addr}")
    }

    /// A server that drains client frames until the client hangs up.
    async fn drain(mut ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) {
        while let Some(Ok(_)) = ws.next().await {}
    }

    #[test]
    fn transport_is_send_and_debug() {
        fn assert_send<T: Send>() {}
        fn assert_debug<T: std::fmt::Debug>() {}
        assert_send::<WebSocketTransport>();
        assert_debug::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_rejects_a_malformed_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, FourlineError::Io(_)));
    }

    #[tokio::test]
    async fn connect_fails_when_nothing_listens() {
        let err = WebSocketTransport::connect("ws://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err, FourlineError::Io(_)));
    }

    #[tokio::test]
    async fn connect_with_timeout_gives_up_at_the_deadline() {
        // Non-routable TEST-NET-1 address: the dial hangs until the deadline.
        let err = WebSocketTransport::connect_with_timeout(
            "ws://192.0.2.1:1",
            std::time::Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FourlineError::Timeout));
    }

    #[tokio::test]
    async fn server_frames_arrive_in_order() {
        let url = one_shot_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"waiting","timeout":15}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"error":"room not found"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"waiting","timeout":15}"#
        );
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"error":"room not found"}"#
        );
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn moves_round_trip_through_the_server() {
        let url = one_shot_server(|mut ws| async move {
            // Echo the move back as if it were a state broadcast.
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(text)).await.unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport
            .send(r#"{"type":"move","gameId":"g_1","col":3}"#.to_string())
            .await
            .unwrap();
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"move","gameId":"g_1","col":3}"#
        );
    }

    #[tokio::test]
    async fn binary_frames_never_reach_the_game_layer() {
        let url = one_shot_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"waiting","timeout":15}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"waiting","timeout":15}"#
        );
    }

    #[tokio::test]
    async fn close_frame_ends_the_stream() {
        let url = one_shot_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn closed_transport_rejects_sends_and_tolerates_reclose() {
        let url = one_shot_server(drain).await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport
            .send(r#"{"type":"join","username":"late"}"#.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, FourlineError::TransportClosed));
    }

    #[tokio::test]
    async fn recv_after_local_close_does_not_hang() {
        let url = one_shot_server(drain).await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();

        match transport.recv().await {
            None | Some(Err(_)) => {}
            Some(Ok(frame)) => panic!("unexpected frame after close: {frame:?}"),
        }
    }

    #[tokio::test]
    async fn from_stream_wraps_an_existing_connection() {
        let url = one_shot_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"waiting","timeout":15}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let (ws_stream, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        let mut transport = WebSocketTransport::from_stream(ws_stream);
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"waiting","timeout":15}"#
        );
    }
}
