use super::counter::SequenceCounter;
use super::format::reverse_string;
use crate::api::server::PingApi;
use crate::api::{now_nanos, PingRequest, PingResponse};
use crate::common::CallContext;
use crate::{PingError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn, Instrument};

/// Responses buffered between a stream loop and the transport
const STREAM_BUFFER: usize = 16;

/// Ping service: reverses payloads and numbers every accepted request
///
/// The only shared state is the [`SequenceCounter`]; clones of a service
/// share it.
#[derive(Debug, Clone)]
pub struct PingService {
    counter: Arc<SequenceCounter>,
    address: SocketAddr,
}

impl PingService {
    /// Creates a service with a fresh counter, reporting `address` in responses
    pub fn new(address: SocketAddr) -> Self {
        Self::with_counter(address, Arc::new(SequenceCounter::new()))
    }

    /// Creates a service that increments an existing counter
    pub fn with_counter(address: SocketAddr, counter: Arc<SequenceCounter>) -> Self {
        Self { counter, address }
    }

    pub fn counter(&self) -> &Arc<SequenceCounter> {
        &self.counter
    }

    /// Handles one request: validates it, takes a sequence number and
    /// builds the response
    pub fn process(&self, request: &PingRequest) -> Result<PingResponse> {
        let content = request
            .content
            .as_ref()
            .ok_or_else(|| PingError::InvalidArgument("nil request".to_string()))?;
        let text = std::str::from_utf8(&content.data)
            .map_err(|e| PingError::InvalidArgument(format!("payload is not valid UTF-8: {e}")))?;
        debug!(id = %content.id, size = content.data.len(), metadata = ?content.metadata, "Processing request");

        let sequence = self.counter.increment_and_read();

        let id = if content.id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            content.id.clone()
        };

        Ok(PingResponse {
            id,
            payload: content.data.clone(),
            transformed: reverse_string(text),
            sequence,
            created_at: now_nanos(),
            metadata: HashMap::from([("address".to_string(), self.address.to_string())]),
        })
    }

    /// Runs the receive/process/send loop of one stream call
    ///
    /// Requests are handled strictly one at a time: the response to a
    /// request is written before the next request is read. The context is
    /// checked before every read and while waiting on the transport. End of
    /// input ends the loop successfully; returns the number of responses
    /// written.
    pub async fn run_stream<S>(
        &self,
        ctx: &CallContext,
        inbound: S,
        outbound: &mpsc::Sender<std::result::Result<PingResponse, Status>>,
    ) -> Result<u64>
    where
        S: Stream<Item = std::result::Result<PingRequest, Status>>,
    {
        let mut inbound = pin!(inbound);
        let mut sent = 0;

        loop {
            ctx.check()?;

            let next = tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                _ = outbound.closed() => return Err(PingError::Cancelled),
                next = inbound.next() => next,
            };

            let request = match next {
                None => {
                    debug!("no more data");
                    break;
                }
                Some(Ok(request)) => request,
                Some(Err(status)) => {
                    return Err(PingError::Io(format!("error receiving stream: {status}")));
                }
            };

            let response = self.process(&request)?;
            let sequence = response.sequence;

            tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                result = outbound.send(Ok(response)) => {
                    result.map_err(|_| {
                        PingError::Io("error sending stream response: receiver closed".to_string())
                    })?;
                }
            }

            debug!(sequence, "Sent stream response");
            sent += 1;
        }

        Ok(sent)
    }
}

#[async_trait]
impl PingApi for PingService {
    type StreamStream = ReceiverStream<std::result::Result<PingResponse, Status>>;

    async fn ping(
        &self,
        request: Request<PingRequest>,
    ) -> std::result::Result<Response<PingResponse>, Status> {
        let request = request.into_inner();
        match self.process(&request) {
            Ok(response) => {
                info!(id = %response.id, sequence = response.sequence, "Ping");
                Ok(Response::new(response))
            }
            Err(e) => {
                warn!(error = %e, "Rejected ping");
                Err(e.into())
            }
        }
    }

    async fn stream(
        &self,
        request: Request<Streaming<PingRequest>>,
    ) -> std::result::Result<Response<Self::StreamStream>, Status> {
        let ctx = CallContext::from_metadata(request.metadata());
        let peer = request.remote_addr();
        let inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        let service = self.clone();
        let span = tracing::info_span!("stream", peer = ?peer);
        tokio::spawn(
            async move {
                info!("Stream opened");
                match service.run_stream(&ctx, inbound, &tx).await {
                    Ok(sent) => info!(sent, "Stream closed"),
                    Err(e) => {
                        warn!(error = %e, "Stream aborted");
                        // The peer may already be gone; nothing more to report then.
                        let _ = tx.send(Err(e.into())).await;
                    }
                }
            }
            .instrument(span),
        );

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
