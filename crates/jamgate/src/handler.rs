//! Per-connection handler: handshake, credential check, and the two
//! relay directions.
//!
//! Each accepted socket runs this flow on its own task:
//!   1. WebSocket handshake, capturing the request URI
//!   2. Extract `screen_name` + `token` from the query string —
//!      missing either closes the socket with a policy code, no
//!      session is created
//!   3. Register a session, kick off the upstream connect + event pump
//!      on a second task
//!   4. Loop: peer messages → `enqueue_or_send`; peer close → cleanup

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures_util::StreamExt;
use jamgate_session::{ClientSession, PeerId};
use jamgate_upstream::UpstreamConnection;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::GatewayError;
use crate::peer::WsPeer;
use crate::server::{GatewayConfig, GatewayRegistry, GatewaySession};

/// Counter for minting peer identities.
static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

/// What the browser must present in the handshake query string.
struct Credentials {
    screen_name: String,
    auth_token: String,
}

impl Credentials {
    /// Pulls `screen_name` and `token` out of a query string. A missing
    /// or empty value means the connection gets no session at all.
    fn from_query(query: Option<&str>) -> Option<Self> {
        let query = query?;
        let mut screen_name = None;
        let mut auth_token = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "screen_name" if !value.is_empty() => {
                    screen_name = Some(value.into_owned());
                }
                "token" if !value.is_empty() => {
                    auth_token = Some(value.into_owned());
                }
                _ => {}
            }
        }
        Some(Self {
            screen_name: screen_name?,
            auth_token: auth_token?,
        })
    }
}

/// Handles a single browser connection from accept to close.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    config: Arc<GatewayConfig>,
    registry: Arc<GatewayRegistry>,
) -> Result<(), GatewayError> {
    // The handshake request is the only place the URI is visible, so
    // capture it from the header callback.
    let mut request_uri = None;
    let mut ws = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            request_uri = Some(req.uri().clone());
            Ok(resp)
        },
    )
    .await
    .map_err(GatewayError::Handshake)?;

    let credentials = request_uri
        .as_ref()
        .and_then(|uri| Credentials::from_query(uri.query()));

    let Some(credentials) = credentials else {
        tracing::error!(%addr, "websocket handshake without credentials");
        let _ = ws
            .close(Some(CloseFrame {
                code: CloseCode::Policy,
                reason: "missing credentials".into(),
            }))
            .await;
        return Err(GatewayError::MissingCredentials);
    };

    let peer_id =
        PeerId::new(NEXT_PEER_ID.fetch_add(1, Ordering::Relaxed));
    tracing::info!(
        %peer_id,
        %addr,
        screen_name = %credentials.screen_name,
        token_bytes = credentials.auth_token.len(),
        "peer connected"
    );

    let (sink, mut inbound) = ws.split();
    let session: Arc<GatewaySession> =
        Arc::new(ClientSession::new(peer_id, WsPeer::new(sink)));
    registry.insert(Arc::clone(&session)).await;

    // Upstream establishment and the event pump run on their own task:
    // a slow TLS handshake must never stall this peer's read loop, let
    // alone anybody else's.
    tokio::spawn({
        let session = Arc::clone(&session);
        let registry = Arc::clone(&registry);
        let config = Arc::clone(&config);
        async move {
            bridge_upstream(&session, &registry, &config).await;
        }
    });

    while let Some(message) = inbound.next().await {
        match message {
            Ok(Message::Binary(data)) => {
                route_inbound(&registry, peer_id, data).await;
            }
            Ok(Message::Text(text)) => {
                let data = Bytes::from(text.as_bytes().to_vec());
                route_inbound(&registry, peer_id, data).await;
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(%peer_id, "peer sent close");
                break;
            }
            Ok(_) => continue, // ping/pong/frame
            Err(e) => {
                tracing::debug!(%peer_id, error = %e, "peer read failed");
                break;
            }
        }
    }

    // The peer is gone, whatever the reason: both sides come down.
    session.cleanup(&registry).await;
    Ok(())
}

/// Connects to the game server and drives the session to ready, then
/// pumps upstream events until the connection dies.
async fn bridge_upstream(
    session: &Arc<GatewaySession>,
    registry: &Arc<GatewayRegistry>,
    config: &GatewayConfig,
) {
    let peer_id = session.peer_id();
    let mut upstream = UpstreamConnection::new(
        config.upstream_host.clone(),
        config.upstream_port,
    );

    let events = match tokio::time::timeout(
        config.connect_timeout,
        upstream.connect(),
    )
    .await
    {
        Ok(Ok(events)) => events,
        Ok(Err(e)) => {
            tracing::error!(
                %peer_id,
                error = %e,
                "upstream connect failed"
            );
            session.cleanup(registry).await;
            return;
        }
        Err(_) => {
            tracing::error!(%peer_id, "upstream connect timed out");
            session.cleanup(registry).await;
            return;
        }
    };

    if let Err(e) = session.mark_ready(upstream).await {
        // Peer left during the handshake, or the queued drain failed.
        tracing::debug!(%peer_id, error = %e, "session never became ready");
        session.cleanup(registry).await;
        return;
    }

    session.pump_events(events, registry).await;
}

/// Routes one inbound peer frame to its session.
///
/// An untracked peer is a defensive no-op, not an error — the message
/// is dropped. A failed write means the session is done for.
async fn route_inbound(
    registry: &GatewayRegistry,
    peer_id: PeerId,
    frame: Bytes,
) {
    let Some(session) = registry.get(peer_id).await else {
        tracing::warn!(%peer_id, "no session for inbound message");
        return;
    };
    if let Err(e) = session.enqueue_or_send(frame).await {
        tracing::debug!(%peer_id, error = %e, "inbound write failed");
        session.cleanup(registry).await;
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query_with_both_values_succeeds() {
        let creds =
            Credentials::from_query(Some("screen_name=abc&token=xyz"))
                .expect("should parse");
        assert_eq!(creds.screen_name, "abc");
        assert_eq!(creds.auth_token, "xyz");
    }

    #[test]
    fn test_from_query_order_and_extra_params_are_irrelevant() {
        let creds = Credentials::from_query(Some(
            "lang=en&token=t0&screen_name=jammer",
        ))
        .expect("should parse");
        assert_eq!(creds.screen_name, "jammer");
        assert_eq!(creds.auth_token, "t0");
    }

    #[test]
    fn test_from_query_percent_encoding_is_decoded() {
        let creds = Credentials::from_query(Some(
            "screen_name=a%20b&token=x%2By",
        ))
        .expect("should parse");
        assert_eq!(creds.screen_name, "a b");
        assert_eq!(creds.auth_token, "x+y");
    }

    #[test]
    fn test_from_query_missing_token_rejected() {
        assert!(Credentials::from_query(Some("screen_name=abc")).is_none());
    }

    #[test]
    fn test_from_query_missing_screen_name_rejected() {
        assert!(Credentials::from_query(Some("token=xyz")).is_none());
    }

    #[test]
    fn test_from_query_empty_values_rejected() {
        assert!(
            Credentials::from_query(Some("screen_name=&token=xyz"))
                .is_none()
        );
    }

    #[test]
    fn test_from_query_no_query_string_rejected() {
        assert!(Credentials::from_query(None).is_none());
    }
}
