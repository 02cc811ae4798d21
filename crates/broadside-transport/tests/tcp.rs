//! Integration tests for the TCP transport.
//!
//! These spin up a real listener on a random port and connect a real
//! client, so frames cross an actual socket.

use std::time::Duration;

use broadside_protocol::{FrameCodec, FrameType};
use broadside_transport::{Received, TcpTransport, Transport};
use tokio::io::AsyncWriteExt;

const WAIT: Duration = Duration::from_secs(2);

async fn listener(codec: FrameCodec) -> (TcpTransport, String) {
    // "127.0.0.1:0" tells the OS to pick an available port.
    let transport = TcpTransport::bind("127.0.0.1:0", codec)
        .await
        .expect("should bind");
    let addr = transport.local_addr().expect("bound").to_string();
    (transport, addr)
}

#[tokio::test]
async fn test_tcp_accept_and_exchange_frames() {
    let codec = FrameCodec::default();
    let (transport, addr) = listener(codec.clone()).await;

    let server = tokio::spawn(async move {
        transport.accept().await.expect("should accept")
    });
    let client = TcpTransport::connect(&addr, codec).await.expect("connect");
    let server_conn = server.await.expect("task should complete");

    assert!(server_conn.id().into_inner() > 0);
    assert_ne!(server_conn.id(), client.id());

    server_conn
        .send_frame(FrameType::System, "Welcome!")
        .await
        .expect("send should succeed");
    let frame = client.recv_frame(WAIT).await.into_frame().unwrap();
    assert_eq!(frame.kind, FrameType::System);
    assert_eq!(frame.text(), "Welcome!");

    client
        .send_frame(FrameType::Prompt, "new")
        .await
        .expect("send should succeed");
    let frame = server_conn.recv_frame(WAIT).await.into_frame().unwrap();
    assert_eq!(frame.kind, FrameType::Prompt);
    assert_eq!(frame.text(), "new");
}

#[tokio::test]
async fn test_tcp_client_drop_reports_closed() {
    let codec = FrameCodec::default();
    let (transport, addr) = listener(codec.clone()).await;

    let server = tokio::spawn(async move { transport.accept().await.unwrap() });
    let client = TcpTransport::connect(&addr, codec).await.unwrap();
    let server_conn = server.await.unwrap();

    client.close().await;
    drop(client);

    let outcome = server_conn.recv_frame(WAIT).await;
    assert!(outcome.is_disconnect(), "got {outcome:?}");
}

#[tokio::test]
async fn test_tcp_garbage_bytes_report_corrupt() {
    let codec = FrameCodec::default();
    let (transport, addr) = listener(codec).await;

    let server = tokio::spawn(async move { transport.accept().await.unwrap() });
    let mut raw = tokio::net::TcpStream::connect(&addr).await.unwrap();
    let server_conn = server.await.unwrap();

    // 11 bytes of prefix declaring a 4-byte body, then 4 bytes of body,
    // with a checksum that cannot match.
    let mut bytes = vec![0, 1, 6, 0, 0, 0, 4, 0xDE, 0xAD, 0xBE, 0xEF];
    bytes.extend_from_slice(b"junk");
    raw.write_all(&bytes).await.unwrap();

    assert!(matches!(
        server_conn.recv_frame(WAIT).await,
        Received::Corrupt(_)
    ));
}

#[tokio::test]
async fn test_tcp_connect_to_closed_port_fails() {
    let (transport, addr) = listener(FrameCodec::default()).await;
    drop(transport);

    let result = TcpTransport::connect(&addr, FrameCodec::default()).await;
    assert!(result.is_err());
}
