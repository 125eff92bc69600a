//! The gateway's connection to the legacy game server.
//!
//! One [`UpstreamConnection`] owns exactly one TLS socket. Decoded
//! frames and lifecycle changes are surfaced as [`UpstreamEvent`]s on an
//! mpsc channel returned by [`UpstreamConnection::connect`]; writes go
//! through [`UpstreamConnection::write`], which appends the frame
//! delimiter when absent and awaits the transport flush.
//!
//! The TLS session is established **without certificate verification**:
//! the game server presents a certificate that is not publicly trusted,
//! and the deployment pins the endpoint by host instead. See DESIGN.md.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──connect()──→ Connecting ──→ Connected ──→ Closed
//!                          │                          ↑
//!                          └──── handshake failed ────┘
//! ```
//!
//! `Closed` is final for an instance; reconnecting means building a new
//! [`UpstreamConnection`].

#![allow(async_fn_in_trait)]

mod connection;
mod error;

pub use connection::{ConnectionState, UpstreamConnection, UpstreamEvent};
pub use error::UpstreamError;

use bytes::Bytes;

/// The write side of an upstream connection, as the session layer sees
/// it.
///
/// [`UpstreamConnection`] is the production implementation; session
/// tests substitute recording doubles.
pub trait UpstreamLink: Send + 'static {
    /// Writes one frame to the game server.
    async fn write(&mut self, frame: Bytes) -> Result<(), UpstreamError>;

    /// Forcibly closes the socket, if any. Idempotent.
    fn destroy(&mut self);
}

impl UpstreamLink for UpstreamConnection {
    async fn write(&mut self, frame: Bytes) -> Result<(), UpstreamError> {
        UpstreamConnection::write(self, frame).await
    }

    fn destroy(&mut self) {
        UpstreamConnection::destroy(self);
    }
}
