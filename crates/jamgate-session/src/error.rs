//! Error types for the session layer.

/// Errors that can occur while driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session has already been torn down; the frame was dropped.
    #[error("session is torn down")]
    TornDown,

    /// The browser peer went away mid-delivery.
    #[error("peer transport failed")]
    PeerGone,

    /// The upstream write path failed.
    #[error(transparent)]
    Upstream(#[from] jamgate_upstream::UpstreamError),
}
