//! Unified error type for the gateway.

use jamgate_session::SessionError;
use jamgate_upstream::UpstreamError;

/// Top-level error: gateway-local failure modes plus transparent
/// wrappers for the sub-crate errors, so callers of the `jamgate`
/// crate deal with one type and `?` converts automatically.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Binding the listen socket failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// The WebSocket handshake failed before any session existed.
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tokio_tungstenite::tungstenite::Error),

    /// The handshake query string carried no usable credentials; the
    /// socket was closed with a policy-violation code.
    #[error("missing credentials in connection request")]
    MissingCredentials,

    /// An upstream connection error.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// A session-level error.
    #[error(transparent)]
    Session(#[from] SessionError),
}
