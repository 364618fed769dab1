//! gRPC client stub for `ping.v1.PingService`

use super::{PingRequest, PingResponse, PING_PATH, SERVICE_NAME, STREAM_PATH};
use tonic::codegen::*;

/// Low-level client for the ping service
#[derive(Debug, Clone)]
pub struct PingServiceClient<T> {
    inner: tonic::client::Grpc<T>,
}

impl PingServiceClient<tonic::transport::Channel> {
    /// Create a new client from a channel
    pub fn new(channel: tonic::transport::Channel) -> Self {
        let inner = tonic::client::Grpc::new(channel);
        Self { inner }
    }
}

impl<T> PingServiceClient<T>
where
    T: tonic::client::GrpcService<tonic::body::BoxBody>,
    T::Error: Into<StdError>,
    T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
    <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
{
    /// Wrap any gRPC service, e.g. an intercepted channel
    pub fn with_service(inner: T) -> Self {
        Self {
            inner: tonic::client::Grpc::new(inner),
        }
    }

    async fn ready(&mut self) -> std::result::Result<(), tonic::Status> {
        self.inner.ready().await.map_err(|e| {
            tonic::Status::new(
                tonic::Code::Unknown,
                format!("Service was not ready: {}", e.into()),
            )
        })
    }

    /// Unary ping
    pub async fn ping(
        &mut self,
        request: impl tonic::IntoRequest<PingRequest>,
    ) -> std::result::Result<tonic::Response<PingResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = http::uri::PathAndQuery::from_static(PING_PATH);
        let mut req = request.into_request();
        req.extensions_mut()
            .insert(GrpcMethod::new(SERVICE_NAME, "Ping"));
        self.inner.unary(req, path, codec).await
    }

    /// Bidirectional stream of pings
    pub async fn stream(
        &mut self,
        request: impl tonic::IntoStreamingRequest<Message = PingRequest>,
    ) -> std::result::Result<tonic::Response<tonic::codec::Streaming<PingResponse>>, tonic::Status>
    {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = http::uri::PathAndQuery::from_static(STREAM_PATH);
        let mut req = request.into_streaming_request();
        req.extensions_mut()
            .insert(GrpcMethod::new(SERVICE_NAME, "Stream"));
        self.inner.streaming(req, path, codec).await
    }
}
