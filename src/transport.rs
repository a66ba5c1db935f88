//! Duplex text-frame transport used by the client loop.
//!
//! A Fourline session is a stream of whole JSON text frames in both
//! directions: intents out, game frames in. [`Transport`] is the seam
//! between the session layer and whatever carries those frames, so the
//! state machine never sees sockets. The crate ships a WebSocket
//! implementation behind the `transport-websocket` feature; anything that
//! can move complete text messages qualifies, down to an in-process
//! channel pair in tests.
//!
//! Connection setup is deliberately outside the trait: every backend has
//! its own dial parameters, so `FourlineClient::start` takes a transport
//! that is already connected.
//!
//! A minimal channel-backed implementation:
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use tokio::sync::mpsc;
//! use fourline_client::{FourlineError, Transport};
//!
//! struct Loopback {
//!     inbound: mpsc::UnboundedReceiver<String>,
//!     outbound: mpsc::UnboundedSender<String>,
//! }
//!
//! #[async_trait]
//! impl Transport for Loopback {
//!     async fn send(&mut self, frame: String) -> Result<(), FourlineError> {
//!         self.outbound
//!             .send(frame)
//!             .map_err(|_| FourlineError::TransportClosed)
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, FourlineError>> {
//!         self.inbound.recv().await.map(Ok)
//!     }
//!
//!     async fn close(&mut self) -> Result<(), FourlineError> {
//!         self.inbound.close();
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::FourlineError;

/// One bidirectional game connection, framed as whole text messages.
///
/// Each [`send`](Transport::send) carries exactly one serialized intent;
/// each [`recv`](Transport::recv) yields exactly one server frame. Framing
/// is the implementation's problem (WebSocket messages, length prefixes,
/// newline-delimited lines).
///
/// The trait is object-safe, so `Box<dyn Transport>` works, though the
/// client loop takes `impl Transport` and monomorphizes.
///
/// # Cancel Safety
///
/// The client loop polls [`recv`](Transport::recv) inside `tokio::select!`,
/// so a `recv` future that is dropped before completing must not lose a
/// frame. Receivers built on `mpsc` or on `tungstenite`'s stream half are
/// cancel-safe already.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Transmit one complete text frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`FourlineError::TransportSend`] when the frame could not be
    /// written, or [`FourlineError::TransportClosed`] after a local close.
    async fn send(&mut self, message: String) -> Result<(), FourlineError>;

    /// Wait for the next text frame from the server.
    ///
    /// `Some(Ok(frame))` is a complete frame, `Some(Err(_))` a transport
    /// failure, and `None` a clean end of stream. After `None` the session
    /// is over; the client loop winds down rather than retrying.
    ///
    /// Must be cancel-safe (see the [trait documentation](Transport)).
    async fn recv(&mut self) -> Option<Result<String, FourlineError>>;

    /// Shut the connection down in an orderly way.
    ///
    /// Called exactly once by the client loop on the way out; extra calls
    /// should be harmless. Implementations release their resources even
    /// when the close handshake itself fails.
    ///
    /// # Errors
    ///
    /// Returns an error when the graceful shutdown could not be completed.
    async fn close(&mut self) -> Result<(), FourlineError>;
}
