use color_eyre::eyre::{eyre, Result};
use pingsrv::api::client::PingServiceClient;
use pingsrv::common::{spawn_test_server, TlsConfig};
use pingsrv::{
    ClientConfigBuilder, Content, PingClient, PingError, PingRequest, PingServer, ServerConfig,
};
use prost::Message;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic_reflection::pb::v1::server_reflection_client::ServerReflectionClient;
use tonic_reflection::pb::v1::server_reflection_request::MessageRequest;
use tonic_reflection::pb::v1::server_reflection_response::MessageResponse;
use tonic_reflection::pb::v1::ServerReflectionRequest;

async fn channel(addr: SocketAddr) -> Result<Channel> {
    Ok(Channel::from_shared(format!("http://{addr}"))?.connect().await?)
}

fn request(message: &str) -> PingRequest {
    PingRequest::new(Content {
        id: String::new(),
        data: message.as_bytes().to_vec(),
        metadata: HashMap::new(),
    })
}

/// Sends one reflection request and returns the single answer
async fn reflect(channel: Channel, message_request: MessageRequest) -> Result<MessageResponse> {
    let mut client = ServerReflectionClient::new(channel);
    let request = ServerReflectionRequest {
        host: String::new(),
        message_request: Some(message_request),
    };
    let mut responses = client
        .server_reflection_info(tokio_stream::iter(vec![request]))
        .await?
        .into_inner();
    responses
        .message()
        .await?
        .and_then(|response| response.message_response)
        .ok_or_else(|| eyre!("empty reflection response"))
}

#[tokio::test]
async fn test_unary_ping() -> Result<()> {
    let server = spawn_test_server(TlsConfig::default()).await?;
    let client = PingClient::connect(server.addr.to_string(), "test", None).await?;

    let (reversed, first) = client.ping("test").await?;
    assert_eq!(reversed, "tset");

    let (reversed, second) = client.ping("héllo wörld").await?;
    assert_eq!(reversed, "dlröw olléh");
    assert!(second > first);

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_stream_returns_ordered_responses() -> Result<()> {
    let server = spawn_test_server(TlsConfig::default()).await?;
    let client = PingClient::connect(server.addr.to_string(), "test", None).await?;

    let responses = client.stream(["ab", "cd", "ef"]).await?;

    let transformed: Vec<_> = responses.iter().map(|r| r.transformed.as_str()).collect();
    assert_eq!(transformed, vec!["ba", "dc", "fe"]);
    assert!(responses.windows(2).all(|w| w[0].sequence < w[1].sequence));
    for response in &responses {
        assert_eq!(response.metadata["address"], server.addr.to_string());
    }
    assert_eq!(server.counter.current(), 3);

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_empty_stream_succeeds() -> Result<()> {
    let server = spawn_test_server(TlsConfig::default()).await?;
    let client = PingClient::connect(server.addr.to_string(), "test", None).await?;

    let responses = client.stream(Vec::<String>::new()).await?;
    assert!(responses.is_empty());
    assert_eq!(server.counter.current(), 0);

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_large_stream_does_not_stall() -> Result<()> {
    let server = spawn_test_server(TlsConfig::default()).await?;
    let client = PingClient::connect(server.addr.to_string(), "test", None).await?;

    // Far more messages than either side buffers.
    let messages: Vec<String> = (0..2000).map(|i| format!("message-{i}")).collect();
    let responses = client.stream(messages.clone()).await?;

    assert_eq!(responses.len(), messages.len());
    for (message, response) in messages.iter().zip(&responses) {
        assert_eq!(response.payload, message.as_bytes());
        assert_eq!(response.transformed, message.chars().rev().collect::<String>());
    }

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_clients_get_unique_sequences() -> Result<()> {
    let server = spawn_test_server(TlsConfig::default()).await?;
    let clients = 8;
    let per_client = 25;

    let mut handles = Vec::new();
    for i in 0..clients {
        let target = server.addr.to_string();
        handles.push(tokio::spawn(async move {
            let client = PingClient::connect(target, format!("client-{i}"), None).await?;
            let mut sequences = Vec::new();
            for j in 0..per_client {
                let (_, sequence) = client.ping(&format!("{i}:{j}")).await?;
                sequences.push(sequence);
            }
            Ok::<_, PingError>(sequences)
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for sequence in handle.await?? {
            assert!(seen.insert(sequence), "duplicate sequence {sequence}");
        }
    }

    assert_eq!(seen.len(), clients * per_client);
    assert_eq!(server.counter.current(), (clients * per_client) as u64);

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_call_timeout_is_tagged_with_message() -> Result<()> {
    // Accepts connections but never speaks HTTP/2.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let silent = tokio::spawn(async move {
        let mut sockets = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            sockets.push(socket);
        }
    });

    let config = ClientConfigBuilder::new()
        .target(addr.to_string())
        .call_timeout(Duration::from_millis(200))
        .connect_timeout(Duration::from_millis(200))
        .build();

    let connected = tokio::time::timeout(
        Duration::from_secs(2),
        PingClient::connect_with_config(config),
    )
    .await;
    match connected {
        Ok(Ok(client)) => {
            let err = client.ping("stuck").await.unwrap_err();
            assert!(matches!(err, PingError::Ping { ref message, .. } if message == "stuck"));
        }
        Ok(Err(err)) => assert!(matches!(err, PingError::Connect { .. })),
        // The handshake itself may be what stalls.
        Err(_) => {}
    }

    silent.abort();
    Ok(())
}

#[tokio::test]
async fn test_server_rejects_partial_tls_configuration() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let config = ServerConfig {
        bind_addr: listener.local_addr()?,
        tls: TlsConfig {
            cert_path: Some(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/server.pem").into()),
            ..Default::default()
        },
        ..Default::default()
    };

    let err = PingServer::new(config)
        .run_with_listener(listener)
        .await
        .unwrap_err();
    assert!(matches!(err, PingError::Credential(_)));
    Ok(())
}

#[tokio::test]
async fn test_client_deadline_ends_stream_on_server() -> Result<()> {
    let server = spawn_test_server(TlsConfig::default()).await?;
    let mut client = PingServiceClient::new(channel(server.addr).await?);

    let (tx, rx) = mpsc::channel(4);
    let mut call = tonic::Request::new(ReceiverStream::new(rx));
    call.set_timeout(Duration::from_millis(300));
    let mut inbound = client.stream(call).await?.into_inner();

    tx.send(request("ab")).await?;
    let first = inbound.message().await?.ok_or_else(|| eyre!("stream ended early"))?;
    assert_eq!(first.transformed, "ba");

    tokio::time::sleep(Duration::from_millis(500)).await;
    // The server side may already have hung up.
    let _ = tx.send(request("cd")).await;

    let status = inbound.message().await.unwrap_err();
    assert_eq!(status.code(), tonic::Code::DeadlineExceeded);
    assert_eq!(server.counter.current(), 1);

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_reflection_lists_ping_service() -> Result<()> {
    let server = spawn_test_server(TlsConfig::default()).await?;

    let response = reflect(
        channel(server.addr).await?,
        MessageRequest::ListServices(String::new()),
    )
    .await?;
    let list = match response {
        MessageResponse::ListServicesResponse(list) => list,
        other => return Err(eyre!("unexpected reflection response: {other:?}")),
    };
    let names: Vec<_> = list.service.iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"ping.v1.PingService"), "services: {names:?}");

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_reflection_describes_stream_method() -> Result<()> {
    let server = spawn_test_server(TlsConfig::default()).await?;

    let response = reflect(
        channel(server.addr).await?,
        MessageRequest::FileContainingSymbol("ping.v1.PingService".to_string()),
    )
    .await?;
    let files = match response {
        MessageResponse::FileDescriptorResponse(files) => files,
        other => return Err(eyre!("unexpected reflection response: {other:?}")),
    };

    let file = prost_types::FileDescriptorProto::decode(files.file_descriptor_proto[0].as_slice())?;
    assert_eq!(file.package(), "ping.v1");
    let stream = file.service[0]
        .method
        .iter()
        .find(|m| m.name() == "Stream")
        .ok_or_else(|| eyre!("Stream method missing"))?;
    assert!(stream.client_streaming() && stream.server_streaming());

    server.shutdown().await?;
    Ok(())
}
