use super::{PingService, SequenceCounter};
use crate::api::server::PingApi;
use crate::api::{Content, PingRequest, PingResponse};
use crate::common::CallContext;
use crate::PingError;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;

fn test_addr() -> SocketAddr {
    "127.0.0.1:50505".parse().unwrap()
}

fn test_request(message: &str) -> PingRequest {
    PingRequest::new(Content {
        id: "test-id".to_string(),
        data: message.as_bytes().to_vec(),
        metadata: HashMap::from([("client-id".to_string(), "test".to_string())]),
    })
}

type Inbound = mpsc::Sender<Result<PingRequest, Status>>;
type Outbound = mpsc::Receiver<Result<PingResponse, Status>>;

/// Starts a stream loop fed by channels; returns its handle and both ends
fn start_stream(
    service: &PingService,
    ctx: &CallContext,
) -> (tokio::task::JoinHandle<crate::Result<u64>>, Inbound, Outbound) {
    let (in_tx, in_rx) = mpsc::channel(8);
    let (out_tx, out_rx) = mpsc::channel(8);
    let service = service.clone();
    let ctx = ctx.clone();
    let handle = tokio::spawn(async move {
        service
            .run_stream(&ctx, ReceiverStream::new(in_rx), &out_tx)
            .await
    });
    (handle, in_tx, out_rx)
}

#[test]
fn test_ping_sans_content() {
    let service = PingService::new(test_addr());
    let request = PingRequest {
        sent: 0,
        content: None,
    };

    let err = service.process(&request).unwrap_err();
    assert!(matches!(err, PingError::InvalidArgument(_)));
    assert_eq!(service.counter().current(), 0);
}

#[test]
fn test_ping_with_args() {
    let service = PingService::new(test_addr());
    let response = service.process(&test_request("test")).unwrap();

    assert_eq!(response.id, "test-id");
    assert_eq!(response.payload, b"test");
    assert_eq!(response.transformed, "tset");
    assert_eq!(response.sequence, 1);
    assert!(response.created_at > 0);
    assert_eq!(response.metadata.get("address").unwrap(), "127.0.0.1:50505");
}

#[test]
fn test_ping_count_increases() {
    let service = PingService::new(test_addr());
    let first = service.process(&test_request("test")).unwrap();
    let second = service.process(&test_request("test")).unwrap();
    assert!(second.sequence > first.sequence);
}

#[test]
fn test_ping_assigns_missing_id() {
    let service = PingService::new(test_addr());
    let mut request = test_request("test");
    if let Some(content) = request.content.as_mut() {
        content.id.clear();
    }

    let response = service.process(&request).unwrap();
    assert!(uuid::Uuid::parse_str(&response.id).is_ok());
}

#[test]
fn test_invalid_utf8_is_rejected() {
    let service = PingService::new(test_addr());
    let mut request = test_request("");
    if let Some(content) = request.content.as_mut() {
        content.data = vec![0xff, 0xfe];
    }

    let err = service.process(&request).unwrap_err();
    assert!(matches!(err, PingError::InvalidArgument(_)));
    assert_eq!(service.counter().current(), 0);
}

#[test]
fn test_independent_counters() {
    let shared = Arc::new(SequenceCounter::new());
    let a = PingService::with_counter(test_addr(), Arc::clone(&shared));
    let b = PingService::with_counter(test_addr(), Arc::clone(&shared));
    let other = PingService::new(test_addr());

    a.process(&test_request("x")).unwrap();
    b.process(&test_request("y")).unwrap();
    assert_eq!(shared.current(), 2);
    assert_eq!(other.process(&test_request("z")).unwrap().sequence, 1);
}

#[tokio::test]
async fn test_ping_api_maps_invalid_argument() {
    let service = PingService::new(test_addr());
    let status = service
        .ping(tonic::Request::new(PingRequest::default()))
        .await
        .unwrap_err();
    assert_eq!(status.code(), tonic::Code::InvalidArgument);
}

#[tokio::test]
async fn test_concurrent_pings_have_unique_sequences() {
    let service = PingService::new(test_addr());
    let tasks = 8;
    let per_task = 50;

    let handles: Vec<_> = (0..tasks)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                let mut sequences = Vec::new();
                for j in 0..per_task {
                    let request = test_request(&format!("{i}-{j}"));
                    let response = service.ping(tonic::Request::new(request)).await.unwrap();
                    sequences.push(response.into_inner().sequence);
                }
                sequences
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    all.sort_unstable();
    all.dedup();

    assert_eq!(all.len(), tasks * per_task);
    assert_eq!(service.counter().current(), (tasks * per_task) as u64);
}

#[tokio::test]
async fn test_stream_in_order() {
    let service = PingService::new(test_addr());
    let ctx = CallContext::new();
    let (handle, in_tx, mut out_rx) = start_stream(&service, &ctx);

    for message in ["ab", "cd", "ef"] {
        in_tx.send(Ok(test_request(message))).await.unwrap();
    }
    drop(in_tx);

    let mut transformed = Vec::new();
    let mut sequences = Vec::new();
    while let Some(response) = out_rx.recv().await {
        let response = response.unwrap();
        transformed.push(response.transformed);
        sequences.push(response.sequence);
    }

    assert_eq!(transformed, vec!["ba", "dc", "fe"]);
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(handle.await.unwrap().unwrap(), 3);
}

#[tokio::test]
async fn test_stream_end_of_input_without_requests() {
    let service = PingService::new(test_addr());
    let ctx = CallContext::new();
    let (handle, in_tx, mut out_rx) = start_stream(&service, &ctx);

    drop(in_tx);
    assert_eq!(handle.await.unwrap().unwrap(), 0);
    assert!(out_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_stream_cancelled_mid_stream() {
    let service = PingService::new(test_addr());
    let ctx = CallContext::new();
    let (handle, in_tx, mut out_rx) = start_stream(&service, &ctx);

    in_tx.send(Ok(test_request("ab"))).await.unwrap();
    let first = out_rx.recv().await.unwrap().unwrap();
    assert_eq!(first.transformed, "ba");

    ctx.cancel();
    // The loop may already be gone; a late request must not be answered.
    let _ = in_tx.send(Ok(test_request("cd"))).await;

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(PingError::Cancelled)));
    assert!(out_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_stream_deadline_exceeded() {
    let service = PingService::new(test_addr());
    let ctx = CallContext::with_timeout(Duration::from_millis(50));
    let (handle, _in_tx, mut out_rx) = start_stream(&service, &ctx);

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(PingError::DeadlineExceeded)));
    assert!(out_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_stream_read_error_aborts() {
    let service = PingService::new(test_addr());
    let ctx = CallContext::new();
    let (handle, in_tx, _out_rx) = start_stream(&service, &ctx);

    in_tx
        .send(Err(Status::data_loss("connection reset")))
        .await
        .unwrap();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(PingError::Io(_))));
}

#[tokio::test]
async fn test_stream_bad_request_ends_stream() {
    let service = PingService::new(test_addr());
    let ctx = CallContext::new();
    let (handle, in_tx, mut out_rx) = start_stream(&service, &ctx);

    in_tx.send(Ok(test_request("ok"))).await.unwrap();
    in_tx.send(Ok(PingRequest::default())).await.unwrap();
    in_tx.send(Ok(test_request("never"))).await.unwrap();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(PingError::InvalidArgument(_))));

    assert_eq!(out_rx.recv().await.unwrap().unwrap().transformed, "ko");
    assert!(out_rx.recv().await.is_none());
    assert_eq!(service.counter().current(), 1);
}

#[tokio::test]
async fn test_stream_receiver_gone_is_cancelled() {
    let service = PingService::new(test_addr());
    let ctx = CallContext::new();
    let (handle, _in_tx, out_rx) = start_stream(&service, &ctx);

    drop(out_rx);
    let result = handle.await.unwrap();
    assert!(matches!(result, Err(PingError::Cancelled)));
}
