use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use pingsrv::common::{logging, TlsConfig};
use pingsrv::service::config::DEFAULT_ADDRESS;
use pingsrv::{PingServer, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// gRPC ping server
#[derive(Parser, Debug)]
#[command(name = "pingsrv", version, about)]
struct Args {
    /// The server address
    #[arg(long, env = "PING_ADDRESS", default_value = DEFAULT_ADDRESS)]
    address: SocketAddr,

    /// Path to file containing the CA root cert file
    #[arg(long, env = "PING_CA")]
    ca: Option<PathBuf>,

    /// Path to TLS cert file
    #[arg(long, env = "PING_CERT")]
    cert: Option<PathBuf>,

    /// Path to TLS key file
    #[arg(long, env = "PING_KEY")]
    key: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, env = "PING_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // JSON logs on stdout; RUST_LOG overrides the debug toggle
    logging::init(args.debug, &["pingsrv"]);

    let config = ServerConfig {
        bind_addr: args.address,
        tls: TlsConfig {
            ca_path: args.ca,
            cert_path: args.cert,
            key_path: args.key,
            peer_name: None,
        },
        ..Default::default()
    };

    info!(address = %config.bind_addr, tls = config.tls.is_requested(), "Starting ping server");

    let server = PingServer::new(config);
    server.run().await.wrap_err("Failed to run ping server")?;

    Ok(())
}
