//! Integration tests for connect-path failures against real sockets.
//!
//! The happy path needs a TLS endpoint and is covered by the in-memory
//! reader/writer tests inside the crate; here we verify what happens
//! when the network says no.

use bytes::Bytes;
use jamgate_upstream::{ConnectionState, UpstreamConnection, UpstreamError};

#[tokio::test]
async fn test_write_before_connect_fails_immediately() {
    let mut conn = UpstreamConnection::new("127.0.0.1", 443);

    let err = conn.write(Bytes::from_static(b"hi")).await.unwrap_err();

    assert!(matches!(err, UpstreamError::NotConnected));
    assert_eq!(conn.state(), ConnectionState::Idle);
}

#[tokio::test]
async fn test_connect_refused_reports_connect_error_and_closes() {
    // Bind then drop a listener so the port is known-dead.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let port = listener.local_addr().expect("should have addr").port();
    drop(listener);

    let mut conn = UpstreamConnection::new("127.0.0.1", port);

    let err = conn.connect().await.unwrap_err();

    assert!(matches!(err, UpstreamError::Connect(_)));
    assert_eq!(conn.state(), ConnectionState::Closed);

    // The instance is done for: writes fail fast from here on.
    let err = conn.write(Bytes::from_static(b"late")).await.unwrap_err();
    assert!(matches!(err, UpstreamError::NotConnected));
}

#[tokio::test]
async fn test_connect_to_non_tls_endpoint_fails_handshake() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let port = listener.local_addr().expect("should have addr").port();

    // Accept and immediately hang up: the handshake can never finish.
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });

    let mut conn = UpstreamConnection::new("127.0.0.1", port);

    let err = conn.connect().await.unwrap_err();

    assert!(matches!(err, UpstreamError::Tls(_)));
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_destroy_is_idempotent_from_any_state() {
    let mut conn = UpstreamConnection::new("127.0.0.1", 443);

    conn.destroy();
    conn.destroy();

    assert_eq!(conn.state(), ConnectionState::Closed);
}
