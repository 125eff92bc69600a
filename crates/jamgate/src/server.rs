//! `GatewayServer` builder and accept loop.
//!
//! The entry point for running the gateway: configure where to listen
//! and which game server to dial, then [`GatewayServer::run`] accepts
//! browser WebSockets and wires a session per peer.

use std::sync::Arc;
use std::time::Duration;

use jamgate_session::{ClientSession, SessionRegistry};
use jamgate_upstream::UpstreamConnection;
use tokio::net::TcpListener;

use crate::GatewayError;
use crate::handler::handle_connection;
use crate::peer::WsPeer;

/// The production game-server endpoint the original client talks to.
pub const DEFAULT_UPSTREAM_HOST: &str =
    "lb-iss02-classic-prod.animaljam.com";
/// Default game-server port.
pub const DEFAULT_UPSTREAM_PORT: u16 = 443;

/// A session as the gateway instantiates it: TLS upstream, WebSocket
/// peer.
pub type GatewaySession = ClientSession<UpstreamConnection, WsPeer>;
/// The registry of live gateway sessions.
pub type GatewayRegistry = SessionRegistry<UpstreamConnection, WsPeer>;

/// Runtime configuration for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Game server to bridge every peer to.
    pub upstream_host: String,
    /// Game server port.
    pub upstream_port: u16,
    /// Bounded wait for the upstream TCP + TLS establishment. Expiry
    /// is treated exactly like a connection failure: the session is
    /// torn down and the peer socket closed.
    pub connect_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            upstream_host: DEFAULT_UPSTREAM_HOST.to_string(),
            upstream_port: DEFAULT_UPSTREAM_PORT,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Builder for configuring and starting a gateway.
///
/// # Example
///
/// ```rust,ignore
/// let server = GatewayServer::builder()
///     .bind("0.0.0.0:8080")
///     .upstream("lb-iss02-classic-prod.animaljam.com", 443)
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct GatewayServerBuilder {
    bind_addr: String,
    config: GatewayConfig,
}

impl GatewayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            config: GatewayConfig::default(),
        }
    }

    /// Sets the address to listen on for browser connections.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the upstream game-server endpoint.
    pub fn upstream(mut self, host: &str, port: u16) -> Self {
        self.config.upstream_host = host.to_string();
        self.config.upstream_port = port;
        self
    }

    /// Sets the bounded wait for upstream establishment.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Binds the listen socket and builds the server.
    pub async fn build(self) -> Result<GatewayServer, GatewayError> {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(GatewayError::Bind)?;
        tracing::info!(
            addr = %self.bind_addr,
            upstream = %self.config.upstream_host,
            "gateway listening"
        );

        Ok(GatewayServer {
            listener,
            config: Arc::new(self.config),
            registry: Arc::new(SessionRegistry::new()),
        })
    }
}

impl Default for GatewayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running gateway.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GatewayServer {
    listener: TcpListener,
    config: Arc<GatewayConfig>,
    registry: Arc<GatewayRegistry>,
}

impl GatewayServer {
    /// Creates a new builder.
    pub fn builder() -> GatewayServerBuilder {
        GatewayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// The live-session registry.
    pub fn registry(&self) -> &Arc<GatewayRegistry> {
        &self.registry
    }

    /// Runs the accept loop.
    ///
    /// Each accepted socket gets its own task for the WebSocket
    /// handshake and peer message loop; a failed accept is logged and
    /// the loop continues. Runs until the process is terminated.
    pub async fn run(self) -> Result<(), GatewayError> {
        tracing::info!("gateway running");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let config = Arc::clone(&self.config);
                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(
                            stream, addr, config, registry,
                        )
                        .await
                        {
                            tracing::debug!(
                                %addr,
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
