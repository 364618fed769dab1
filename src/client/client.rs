use super::ClientConfig;
use crate::api::client::PingServiceClient;
use crate::api::{Content, PingRequest, PingResponse};
use crate::common::{CallContext, TlsConfig};
use crate::security::{self, Role, TransportCredential};
use crate::{PingError, Result};
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinError;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::Streaming;
use tracing::{debug, info, warn};

/// Requests buffered between the send path and the transport
const STREAM_BUFFER: usize = 16;

/// Client for the ping service
///
/// Cloning is cheap; clones share the underlying connection.
///
/// # Examples
///
/// ```no_run
/// use pingsrv::PingClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = PingClient::connect("127.0.0.1:50505", "demo", None).await?;
///
///     let (reversed, sequence) = client.ping("hello").await?;
///     println!("{reversed} - #{sequence}");
///
///     let responses = client.stream(["ab", "cd", "ef"]).await?;
///     assert_eq!(responses.len(), 3);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PingClient {
    client: PingServiceClient<Channel>,
    config: ClientConfig,
}

impl PingClient {
    /// Connect to `target` as `client_id`
    ///
    /// Mutual TLS is used when `tls` carries complete credentials, plaintext
    /// otherwise.
    pub async fn connect(
        target: impl Into<String>,
        client_id: impl Into<String>,
        tls: Option<TlsConfig>,
    ) -> Result<Self> {
        let config = ClientConfig {
            target: target.into(),
            client_id: client_id.into(),
            tls,
            ..Default::default()
        };
        Self::connect_with_config(config).await
    }

    /// Connect with custom configuration
    pub async fn connect_with_config(config: ClientConfig) -> Result<Self> {
        if config.target.is_empty() {
            return Err(PingError::Config("target required".to_string()));
        }

        let tls = client_tls(config.tls.as_ref())?;
        let uri = endpoint_uri(&config.target, tls.is_some());
        let connect_error = |source| PingError::Connect {
            target: uri.clone(),
            source,
        };

        info!(address = %uri, tls = tls.is_some(), "Dialing");
        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(connect_error)?
            .connect_timeout(config.connect_timeout);
        if let Some(tls) = tls {
            endpoint = endpoint.tls_config(tls).map_err(connect_error)?;
        }
        let channel = endpoint.connect().await.map_err(connect_error)?;
        info!(address = %uri, "Connected");

        Ok(Self {
            client: PingServiceClient::new(channel),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Creates a request for `message` at position `index` of a batch
    pub fn make_request(&self, message: &str, index: usize) -> PingRequest {
        build_request(&self.config.client_id, message, index)
    }

    /// Sends one message and returns its reversed form and sequence number
    ///
    /// The call is bounded by the configured call timeout and never retried.
    pub async fn ping(&self, message: &str) -> Result<(String, u64)> {
        let mut request = tonic::Request::new(self.make_request(message, 0));
        request.set_timeout(self.config.call_timeout);

        let mut client = self.client.clone();
        let response = match timeout(self.config.call_timeout, client.ping(request)).await {
            Ok(Ok(response)) => response.into_inner(),
            Ok(Err(status)) => return Err(PingError::from(status).for_message(message)),
            Err(_) => return Err(PingError::DeadlineExceeded.for_message(message)),
        };

        debug!(id = %response.id, sequence = response.sequence, "Received response");
        Ok((response.transformed, response.sequence))
    }

    /// Streams `messages` over one call and collects the responses
    ///
    /// Sending and receiving run as separate tasks so responses are drained
    /// while requests are still going out. The whole exchange is bounded by
    /// the call timeout; the first error from either side is returned.
    pub async fn stream<I, S>(&self, messages: I) -> Result<Vec<PingResponse>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let messages: Vec<String> = messages.into_iter().map(Into::into).collect();
        let ctx = CallContext::with_timeout(self.config.call_timeout);
        let result = self.exchange(&ctx, messages).await;
        // Stops whichever path is still running.
        ctx.cancel();
        result
    }

    async fn exchange(&self, ctx: &CallContext, messages: Vec<String>) -> Result<Vec<PingResponse>> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let mut request = tonic::Request::new(ReceiverStream::new(rx));
        request.set_timeout(self.config.call_timeout);

        let mut sender = tokio::spawn(send_all(
            ctx.clone(),
            self.config.client_id.clone(),
            messages,
            tx,
        ));

        let mut client = self.client.clone();
        let opened = tokio::select! {
            err = ctx.done() => Err(err),
            opened = client.stream(request) => opened.map_err(PingError::from),
        };
        let inbound = match opened {
            Ok(response) => response.into_inner(),
            Err(e) => {
                sender.abort();
                return Err(e);
            }
        };

        let (done_tx, mut done_rx) = oneshot::channel();
        let drain_ctx = ctx.clone();
        tokio::spawn(async move {
            let _ = done_tx.send(drain(&drain_ctx, inbound).await);
        });

        tokio::select! {
            sent = &mut sender => {
                joined(sent)?;
                received(done_rx.await)
            }
            drained = &mut done_rx => {
                let responses = received(drained);
                if responses.is_err() {
                    sender.abort();
                    return responses;
                }
                joined(sender.await)?;
                responses
            }
        }
    }
}

/// Sends every message in order, then closes the send side
async fn send_all(
    ctx: CallContext,
    client_id: String,
    messages: Vec<String>,
    tx: mpsc::Sender<PingRequest>,
) -> Result<()> {
    for (index, message) in messages.iter().enumerate() {
        let request = build_request(&client_id, message, index);
        tokio::select! {
            err = ctx.done() => return Err(err.for_message(message.as_str())),
            sent = tx.send(request) => {
                if sent.is_err() {
                    return Err(PingError::Io("error sending stream request: stream closed".to_string())
                        .for_message(message.as_str()));
                }
            }
        }
        debug!(index, "Sent request");
    }
    debug!(count = messages.len(), "Closing send side");
    Ok(())
}

/// Reads responses until the server ends the stream
async fn drain(ctx: &CallContext, mut inbound: Streaming<PingResponse>) -> Result<Vec<PingResponse>> {
    let mut responses = Vec::new();
    loop {
        let next = tokio::select! {
            err = ctx.done() => return Err(err),
            next = inbound.message() => next,
        };
        match next {
            Ok(Some(response)) => {
                debug!(id = %response.id, sequence = response.sequence, "Received response");
                responses.push(response);
            }
            Ok(None) => {
                debug!("no more responses");
                return Ok(responses);
            }
            Err(status) => return Err(status.into()),
        }
    }
}

fn joined(result: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    result.map_err(|e| PingError::Io(format!("send path failed: {e}")))?
}

fn received(
    result: std::result::Result<Result<Vec<PingResponse>>, oneshot::error::RecvError>,
) -> Result<Vec<PingResponse>> {
    result.map_err(|_| PingError::Io("receive path ended without a result".to_string()))?
}

fn build_request(client_id: &str, message: &str, index: usize) -> PingRequest {
    PingRequest::new(Content {
        id: uuid::Uuid::new_v4().to_string(),
        data: message.as_bytes().to_vec(),
        metadata: HashMap::from([
            ("client-id".to_string(), client_id.to_string()),
            (
                "created-on".to_string(),
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("message-index".to_string(), index.to_string()),
        ]),
    })
}

/// Client credentials when `tls` is complete; partial material is ignored
fn client_tls(tls: Option<&TlsConfig>) -> Result<Option<ClientTlsConfig>> {
    match tls {
        Some(tls) if tls.has_credentials() => match security::build(tls, Role::Client)? {
            TransportCredential::Client(tls) => Ok(Some(tls)),
            TransportCredential::Server(_) => {
                Err(PingError::Config("expected client credentials".to_string()))
            }
        },
        Some(tls) if tls.is_requested() => {
            warn!("Incomplete TLS configuration (need ca, cert and key), connecting without TLS");
            Ok(None)
        }
        _ => Ok(None),
    }
}

fn endpoint_uri(target: &str, tls: bool) -> String {
    if target.contains("://") {
        target.to_string()
    } else if tls {
        format!("https://{target}")
    } else {
        format!("http://{target}")
    }
}
