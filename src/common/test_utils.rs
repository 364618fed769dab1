use crate::common::TlsConfig;
use crate::service::{PingServer, SequenceCounter, ServerConfig};
use crate::{PingError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A ping server running in the background on a loopback port
pub struct TestServer {
    /// Handle of the serving task
    pub handle: JoinHandle<Result<()>>,
    /// Address the server is bound to
    pub addr: SocketAddr,
    /// Counter shared with the running service
    pub counter: Arc<SequenceCounter>,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Signals the server to stop and waits for it
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.cancel();
        self.handle
            .await
            .map_err(|e| PingError::Config(format!("Server task failed: {e}")))?
    }
}

/// Starts a ping server on `127.0.0.1` with an ephemeral port
///
/// The listener is bound before the server task starts, so the returned
/// address accepts connections immediately.
pub async fn spawn_test_server(tls: TlsConfig) -> Result<TestServer> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| PingError::Config(format!("Failed to bind listener: {e}")))?;
    let addr = listener
        .local_addr()
        .map_err(|e| PingError::Config(format!("Failed to get local address: {e}")))?;

    let config = ServerConfig {
        bind_addr: addr,
        tls,
        ..Default::default()
    };
    let server = PingServer::new(config);
    let counter = server.counter();
    let shutdown = server.shutdown_signal();

    let handle = tokio::spawn(async move { server.run_with_listener(listener).await });

    Ok(TestServer {
        handle,
        addr,
        counter,
        shutdown,
    })
}
