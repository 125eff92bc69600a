//! Integration tests for the gateway accept path over real sockets.
//!
//! No real TLS endpoint exists here, so the upstream is either a
//! known-dead port (connect fails fast) or a listener that never
//! answers (connect hangs until the bounded wait expires) — which is
//! exactly what the credential, queuing, and teardown paths need. The
//! full relay pipeline is covered by the in-memory tests in the
//! session and upstream crates.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use jamgate::{GatewayRegistry, GatewayServerBuilder};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Binds and drops a listener so the port is known-dead.
async fn dead_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let port = listener.local_addr().expect("should have addr").port();
    drop(listener);
    port
}

/// A listener that accepts TCP but never speaks TLS, so an upstream
/// connect through it hangs until the gateway's bounded wait expires.
/// Keep the returned listener alive for the duration of the test.
async fn hanging_upstream() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let port = listener.local_addr().expect("should have addr").port();
    (listener, port)
}

/// Starts a gateway aimed at the given upstream port; returns its
/// address and a handle on the registry.
async fn start_gateway(
    upstream_port: u16,
    connect_timeout: Duration,
) -> (String, Arc<GatewayRegistry>) {
    let server = GatewayServerBuilder::new()
        .bind("127.0.0.1:0")
        .upstream("127.0.0.1", upstream_port)
        .connect_timeout(connect_timeout)
        .build()
        .await
        .expect("gateway should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let registry = Arc::clone(server.registry());

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, registry)
}

async fn connect(url: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("should connect");
    ws
}

/// Waits for the server to close the socket, tolerating either a clean
/// close frame or an abrupt drop.
async fn expect_closed(ws: &mut ClientWs) {
    let outcome =
        tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(msg) = ws.next().await {
                match msg {
                    Ok(Message::Close(_)) | Err(_) => return,
                    Ok(_) => continue,
                }
            }
        })
        .await;
    assert!(outcome.is_ok(), "gateway should have closed the socket");
}

#[tokio::test]
async fn test_handshake_without_credentials_closes_with_policy_code() {
    let (addr, registry) =
        start_gateway(dead_port().await, Duration::from_secs(2)).await;
    let mut ws = connect(&format!("ws://{addr}")).await;

    let msg = ws
        .next()
        .await
        .expect("should receive a frame")
        .expect("frame should parse");
    match msg {
        Message::Close(Some(frame)) => {
            assert_eq!(frame.code, CloseCode::Policy);
            assert_eq!(frame.reason.as_str(), "missing credentials");
        }
        other => panic!("expected policy close, got {other:?}"),
    }

    assert!(
        registry.is_empty().await,
        "no session may be created for a credential-less peer"
    );
}

#[tokio::test]
async fn test_handshake_with_partial_credentials_is_rejected() {
    let (addr, registry) =
        start_gateway(dead_port().await, Duration::from_secs(2)).await;
    let mut ws =
        connect(&format!("ws://{addr}/?screen_name=abc")).await;

    let msg = ws
        .next()
        .await
        .expect("should receive a frame")
        .expect("frame should parse");
    assert!(
        matches!(msg, Message::Close(Some(ref frame)) if frame.code == CloseCode::Policy),
        "expected policy close, got {msg:?}"
    );
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_dead_upstream_closes_peer_with_no_messages() {
    let (addr, registry) =
        start_gateway(dead_port().await, Duration::from_secs(2)).await;
    let mut ws =
        connect(&format!("ws://{addr}/?screen_name=abc&token=xyz"))
            .await;

    // The upstream connect fails, the session is cleaned up, and the
    // only thing the peer ever sees is the closure.
    expect_closed(&mut ws).await;

    // Cleanup removes the registry entry shortly after the close.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_messages_before_ready_are_accepted() {
    // An upstream that hangs keeps the session in its pre-ready window
    // for the whole test.
    let (_upstream, port) = hanging_upstream().await;
    let (addr, registry) =
        start_gateway(port, Duration::from_millis(500)).await;
    let mut ws =
        connect(&format!("ws://{addr}/?screen_name=abc&token=xyz"))
            .await;

    // Fire straight away: the frame queues while the upstream is still
    // connecting, and the gateway must not error the socket for
    // sending "too early".
    ws.send(Message::Binary(Bytes::from_static(b"hello")))
        .await
        .expect("send should succeed");

    // Well before the 500 ms bounded wait expires, the session exists.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(registry.len().await, 1, "session should be registered");

    // The bounded wait expires, which counts as a connection failure:
    // teardown closes the peer.
    expect_closed(&mut ws).await;
}

#[tokio::test]
async fn test_peer_close_tears_down_session_mid_connect() {
    let (_upstream, port) = hanging_upstream().await;
    let (addr, registry) =
        start_gateway(port, Duration::from_secs(5)).await;
    let mut ws =
        connect(&format!("ws://{addr}/?screen_name=abc&token=xyz"))
            .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(registry.len().await, 1);

    // Peer hangs up while the upstream is still connecting.
    ws.send(Message::Close(None)).await.expect("close should send");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(
        registry.is_empty().await,
        "peer close must remove the session"
    );
}
