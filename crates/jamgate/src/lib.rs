//! # Jamgate
//!
//! WebSocket gateway that lets the browser build of Animal Jam Classic
//! speak to the legacy TLS game server — browsers cannot open the raw
//! TLS socket the game protocol needs, so this process does it for
//! them and relays framed messages both ways.
//!
//! ```text
//! browser ──ws──→ GatewayServer ──ClientSession──→ UpstreamConnection ──tls──→ game server
//! browser ←──ws── ClientSession ←──────────────── decoded frames ←──────────── game server
//! ```
//!
//! One session per peer; frames sent before the upstream is ready are
//! queued and drained in order; either side going away tears the whole
//! pairing down exactly once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jamgate::GatewayServer;
//!
//! # async fn run() -> Result<(), jamgate::GatewayError> {
//! let server = GatewayServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod peer;
mod server;

pub use error::GatewayError;
pub use peer::{WsPeer, WsSink};
pub use server::{
    DEFAULT_UPSTREAM_HOST, DEFAULT_UPSTREAM_PORT, GatewayConfig,
    GatewayRegistry, GatewayServer, GatewayServerBuilder, GatewaySession,
};

// Re-export the sub-crate surface so daemon code depends on one crate.
pub use jamgate_protocol::{DELIMITER, FrameCodec};
pub use jamgate_session::{
    ClientSession, PeerId, PeerLink, SessionError, SessionRegistry,
};
pub use jamgate_upstream::{
    ConnectionState, UpstreamConnection, UpstreamError, UpstreamEvent,
    UpstreamLink,
};
