//! gRPC server glue for `ping.v1.PingService`

use super::{PingRequest, PingResponse, PING_PATH, SERVICE_NAME, STREAM_PATH};
use tonic::codegen::*;

/// The complete operation set of the ping service
///
/// Every method is required; there is no fallback implementation. A build
/// that cannot serve an operation returns [`crate::PingError::Unimplemented`]
/// from it explicitly.
#[async_trait]
pub trait PingApi: std::marker::Send + std::marker::Sync + 'static {
    /// Response stream returned by [`PingApi::stream`]
    type StreamStream: tokio_stream::Stream<Item = std::result::Result<PingResponse, tonic::Status>>
        + std::marker::Send
        + 'static;

    /// Handle a unary ping
    async fn ping(
        &self,
        request: tonic::Request<PingRequest>,
    ) -> std::result::Result<tonic::Response<PingResponse>, tonic::Status>;

    /// Handle a bidirectional stream of pings
    async fn stream(
        &self,
        request: tonic::Request<tonic::Streaming<PingRequest>>,
    ) -> std::result::Result<tonic::Response<Self::StreamStream>, tonic::Status>;
}

/// Tower service routing gRPC requests to a [`PingApi`] implementation
#[derive(Debug)]
pub struct PingServiceServer<T: PingApi> {
    inner: Arc<T>,
}

impl<T: PingApi> PingServiceServer<T> {
    pub fn new(inner: T) -> Self {
        Self::from_arc(Arc::new(inner))
    }

    pub fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

impl<T: PingApi> Clone for PingServiceServer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PingApi> tonic::server::NamedService for PingServiceServer<T> {
    const NAME: &'static str = SERVICE_NAME;
}

impl<T, B> Service<http::Request<B>> for PingServiceServer<T>
where
    T: PingApi,
    B: Body + std::marker::Send + 'static,
    B::Error: Into<StdError> + std::marker::Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let inner = Arc::clone(&self.inner);

        match req.uri().path() {
            PING_PATH => Box::pin(async move {
                let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                Ok(grpc.unary(PingSvc(inner), req).await)
            }),
            STREAM_PATH => Box::pin(async move {
                let mut grpc = tonic::server::Grpc::new(tonic::codec::ProstCodec::default());
                Ok(grpc.streaming(StreamSvc(inner), req).await)
            }),
            _ => Box::pin(async move { Ok(unimplemented_response()) }),
        }
    }
}

/// Trailers-only response carrying `grpc-status: UNIMPLEMENTED`
fn unimplemented_response() -> http::Response<tonic::body::BoxBody> {
    let mut response = http::Response::new(empty_body());
    let headers = response.headers_mut();
    headers.insert(
        "grpc-status",
        http::HeaderValue::from(tonic::Code::Unimplemented as i32),
    );
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/grpc"),
    );
    response
}

struct PingSvc<T: PingApi>(Arc<T>);

impl<T: PingApi> tonic::server::UnaryService<PingRequest> for PingSvc<T> {
    type Response = PingResponse;
    type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

    fn call(&mut self, request: tonic::Request<PingRequest>) -> Self::Future {
        let inner = Arc::clone(&self.0);
        Box::pin(async move { inner.ping(request).await })
    }
}

struct StreamSvc<T: PingApi>(Arc<T>);

impl<T: PingApi> tonic::server::StreamingService<PingRequest> for StreamSvc<T> {
    type Response = PingResponse;
    type ResponseStream = T::StreamStream;
    type Future = BoxFuture<tonic::Response<Self::ResponseStream>, tonic::Status>;

    fn call(&mut self, request: tonic::Request<tonic::Streaming<PingRequest>>) -> Self::Future {
        let inner = Arc::clone(&self.0);
        Box::pin(async move { inner.stream(request).await })
    }
}
