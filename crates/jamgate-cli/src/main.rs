//! The gateway daemon: parse flags, set up logging, run the server.

use std::time::Duration;

use clap::Parser;
use jamgate::{
    DEFAULT_UPSTREAM_HOST, DEFAULT_UPSTREAM_PORT, GatewayError,
    GatewayServer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// WebSocket gateway for the legacy Animal Jam Classic game protocol.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on for browser WebSocket connections
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Game server host to bridge peers to
    #[arg(long, default_value = DEFAULT_UPSTREAM_HOST)]
    upstream_host: String,

    /// Game server port
    #[arg(long, default_value_t = DEFAULT_UPSTREAM_PORT)]
    upstream_port: u16,

    /// Seconds to wait for the upstream TCP + TLS establishment
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    // RUST_LOG wins; default to info otherwise.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!(
        bind = %args.bind,
        upstream = %args.upstream_host,
        port = args.upstream_port,
        "starting jamgate"
    );

    let server = GatewayServer::builder()
        .bind(&args.bind)
        .upstream(&args.upstream_host, args.upstream_port)
        .connect_timeout(Duration::from_secs(args.connect_timeout))
        .build()
        .await?;

    server.run().await
}
