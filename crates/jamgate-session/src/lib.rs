//! Session management for the gateway.
//!
//! A "session" is the live pairing of one browser-side WebSocket peer
//! with one upstream game-server connection, plus the queue of frames
//! the browser sent before the upstream finished connecting.
//!
//! This crate owns the lifecycle glue:
//!
//! 1. **Queuing** — frames written before the upstream is ready wait in
//!    FIFO order and drain through the normal write path once it is
//!    ([`ClientSession`]).
//! 2. **Forwarding** — decoded upstream frames go to the peer verbatim,
//!    or are dropped once the peer is gone.
//! 3. **Teardown** — one idempotent cleanup path closes both sides and
//!    removes the registry entry, whatever failed first.
//!
//! # How it fits in the stack
//!
//! ```text
//! Gateway (above)   ← accepts peers, routes their frames here
//!     ↕
//! Session (this crate)  ← pairing, queue, teardown
//!     ↕
//! Upstream (below)  ← the TLS socket to the game server
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::ClientSession;

use std::fmt;

use bytes::Bytes;

/// Opaque identity of one browser-side WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(u64);

impl PeerId {
    /// Creates a new `PeerId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// The browser side of a session, as the session layer sees it.
///
/// The gateway implements this over a WebSocket sink; tests substitute
/// recording doubles.
pub trait PeerLink: Send + 'static {
    /// The error type for peer operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Delivers one decoded upstream frame to the browser, unmodified.
    async fn forward(&mut self, frame: Bytes) -> Result<(), Self::Error>;

    /// Closes the peer transport.
    async fn close(&mut self) -> Result<(), Self::Error>;

    /// Whether the transport is still open for delivery.
    fn is_open(&self) -> bool;
}
