/// Errors raised by the upstream connection.
///
/// `Connect` and `Tls` cover the connect path; `Write` and
/// `NotConnected` cover the write path. Framing itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The TCP connection to the game server could not be established.
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// The TLS handshake (or connector construction) failed.
    #[error("tls handshake failed: {0}")]
    Tls(#[source] native_tls::Error),

    /// A write failed mid-flight. The connection is closed afterwards.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    /// A write was attempted while no socket is open. The socket is
    /// never touched in this case.
    #[error("connection is not open")]
    NotConnected,
}
