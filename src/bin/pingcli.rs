use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use pingsrv::common::{logging, TlsConfig};
use pingsrv::{ClientConfigBuilder, PingClient};
use std::path::PathBuf;
use tracing::info;

/// gRPC ping client
#[derive(Parser, Debug)]
#[command(name = "pingcli", version, about)]
struct Args {
    /// Server address
    #[arg(long, env = "PING_ADDRESS", default_value = "127.0.0.1:50505")]
    address: String,

    /// Path to file containing the CA root cert file
    #[arg(long, env = "PING_CA")]
    ca: Option<PathBuf>,

    /// Path to TLS cert file
    #[arg(long, env = "PING_CERT")]
    cert: Option<PathBuf>,

    /// Path to TLS key file
    #[arg(long, env = "PING_KEY")]
    key: Option<PathBuf>,

    /// Hostname expected in the server's TLS certificate
    #[arg(long, env = "PING_HOST")]
    host: Option<String>,

    /// ID of this client
    #[arg(long = "client", env = "PING_CLIENT_ID", default_value = "demo")]
    client_id: String,

    /// Verbose logging
    #[arg(long, env = "PING_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one message
    Ping { message: String },
    /// Send several messages over one stream
    Stream {
        #[arg(required = true)]
        messages: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // JSON logs on stdout; RUST_LOG overrides the debug toggle
    logging::init(args.debug, &["pingsrv", "pingcli"]);

    let tls = TlsConfig {
        ca_path: args.ca,
        cert_path: args.cert,
        key_path: args.key,
        peer_name: args.host,
    };
    let config = ClientConfigBuilder::new()
        .target(args.address)
        .client_id(args.client_id)
        .tls(tls)
        .build();

    let client = PingClient::connect_with_config(config)
        .await
        .wrap_err("Failed to connect")?;

    match args.command {
        Command::Ping { message } => {
            let (reversed, sequence) = client.ping(&message).await?;
            println!("{reversed} - #{sequence}");
        }
        Command::Stream { messages } => {
            let responses = client.stream(messages).await.wrap_err("Stream failed")?;
            for response in &responses {
                println!("{} - #{}", response.transformed, response.sequence);
            }
            info!(count = responses.len(), "done");
        }
    }

    Ok(())
}
