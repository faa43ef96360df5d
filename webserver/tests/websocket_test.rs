//! WebSocket status feed tests

use futures_util::StreamExt;
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use shared::{ChannelSnapshot, ChannelStatus};

mod common;
use common::helpers::TestServer;

type Socket = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn next_snapshot(socket: &mut Socket) -> Vec<ChannelSnapshot> {
    loop {
        let message = timeout(Duration::from_secs(3), socket.next())
            .await
            .expect("no snapshot within 3s")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_snapshot_sent_on_connect() {
    let server = TestServer::start(json!([{"id": 1, "name": "one"}])).await;

    let (mut socket, _) = connect_async(server.ws_url()).await.unwrap();
    let snapshot = next_snapshot(&mut socket).await;

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].name, "one");
    assert_eq!(snapshot[0].status, ChannelStatus::Inactive);

    socket.close(None).await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_status_changes_are_pushed() {
    let server = TestServer::start(json!([{"id": 1, "name": "one"}])).await;
    let (mut socket, _) = connect_async(server.ws_url()).await.unwrap();
    next_snapshot(&mut socket).await;

    reqwest::Client::new().post(server.url("/api/start/1")).send().await.unwrap();

    let mut status = ChannelStatus::Inactive;
    while status != ChannelStatus::Listening {
        status = next_snapshot(&mut socket).await[0].status;
    }

    socket.close(None).await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn test_every_connection_is_an_observer() {
    let server = TestServer::start(json!([{"id": 1, "name": "one"}])).await;
    let (mut first, _) = connect_async(server.ws_url()).await.unwrap();
    let (mut second, _) = connect_async(server.ws_url()).await.unwrap();
    next_snapshot(&mut first).await;
    next_snapshot(&mut second).await;

    assert_eq!(server.fleet.observer_count().await, 2);

    first.close(None).await.unwrap();
    drop(first);
    let fleet = server.fleet.clone();
    let mut remaining = 2;
    for _ in 0..200 {
        remaining = fleet.observer_count().await;
        if remaining == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(remaining, 1, "closed connection must be deregistered");

    // The remaining socket still receives updates
    server.fleet.broadcast().await;
    assert_eq!(next_snapshot(&mut second).await[0].id.get(), 1);

    second.close(None).await.unwrap();
    server.stop().await;
}
