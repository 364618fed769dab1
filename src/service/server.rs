use super::{PingService, SequenceCounter, ServerConfig};
use crate::api::descriptor;
use crate::api::server::PingServiceServer;
use crate::security::{self, Role, TransportCredential};
use crate::{PingError, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;

/// gRPC server hosting a [`PingService`]
///
/// # Examples
///
/// Server with graceful shutdown:
///
/// ```no_run
/// use pingsrv::{PingServer, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = PingServer::new(ServerConfig::default());
///     let shutdown_signal = server.shutdown_signal();
///
///     // Run server in background
///     let server_handle = tokio::spawn(async move {
///         server.run().await
///     });
///
///     // Do other work...
///
///     // Gracefully shutdown
///     shutdown_signal.cancel();
///     server_handle.await??;
///     Ok(())
/// }
/// ```
pub struct PingServer {
    config: ServerConfig,
    counter: Arc<SequenceCounter>,
    shutdown_signal: CancellationToken,
}

impl PingServer {
    /// Creates a new server with a fresh sequence counter
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            counter: Arc::new(SequenceCounter::new()),
            shutdown_signal: CancellationToken::new(),
        }
    }

    /// Counter shared with the service this server hosts
    pub fn counter(&self) -> Arc<SequenceCounter> {
        Arc::clone(&self.counter)
    }

    /// Token that stops the server when cancelled
    pub fn shutdown_signal(&self) -> CancellationToken {
        self.shutdown_signal.clone()
    }

    /// Binds the configured address and serves until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| PingError::Config(format!("Failed to bind {}: {e}", self.config.bind_addr)))?;
        self.run_with_listener(listener).await
    }

    /// Serves on an already-bound listener until shutdown
    ///
    /// When any certificate material is configured the server only starts
    /// with complete, loadable credentials and then requires verified client
    /// certificates on every connection. gRPC server reflection (v1) is
    /// served next to the ping service.
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let address = listener
            .local_addr()
            .map_err(|e| PingError::Config(format!("Failed to get local address: {e}")))?;

        let mut builder = Server::builder()
            .tcp_keepalive(self.config.tcp_keepalive)
            .max_concurrent_streams(self.config.max_concurrent_streams);
        if self.config.tls.is_requested() {
            let tls = match security::build(&self.config.tls, Role::Server)? {
                TransportCredential::Server(tls) => tls,
                TransportCredential::Client(_) => {
                    return Err(PingError::Config("expected server credentials".to_string()));
                }
            };
            builder = builder.tls_config(tls)?;
        }

        let reflection = tonic_reflection::server::Builder::configure()
            .register_file_descriptor_set(descriptor::file_descriptor_set())
            .build_v1()
            .map_err(|e| PingError::Config(format!("Failed to build reflection service: {e}")))?;

        let service = PingService::with_counter(address, self.counter());
        let router = builder
            .add_service(PingServiceServer::new(service))
            .add_service(reflection);

        info!(%address, tls = self.config.tls.is_requested(), "Starting gRPC server");

        let shutdown = self.shutdown_signal.clone();
        let incoming = TcpListenerStream::new(listener);
        router
            .serve_with_incoming_shutdown(incoming, async move {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received shutdown signal, stopping server"),
                    _ = shutdown.cancelled() => info!("Received internal shutdown signal, stopping server"),
                }
            })
            .await?;

        info!(sequence = self.counter.current(), "gRPC server stopped");
        Ok(())
    }
}
