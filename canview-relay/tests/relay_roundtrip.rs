//! End-to-end checks against a relay bound on an ephemeral loopback port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use canview_config::CanviewConfig;
use canview_core::events::Envelope;
use canview_relay::{
    publish_once, ClientOptions, ConnectionState, LoggingCommandSink, RelayClient, RelayHub,
    RelayServer,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Running {
    addr: SocketAddr,
    hub: Arc<RelayHub>,
    stop: Option<oneshot::Sender<()>>,
}

impl Drop for Running {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn start_relay() -> Running {
    let server = RelayServer::new(&CanviewConfig::default(), Arc::new(LoggingCommandSink)).unwrap();
    let hub = server.hub();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(server.serve(listener, async {
        let _ = stopped.await;
    }));
    Running {
        addr,
        hub,
        stop: Some(stop),
    }
}

async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    socket
}

async fn wait_for_parties(running: &Running, parties: usize) {
    for _ in 0..200 {
        if running.hub.connected() == parties {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("relay never reached {parties} parties");
}

async fn next_envelope(socket: &mut Socket) -> Envelope {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            return Envelope::from_json(text.as_str()).unwrap();
        }
    }
}

fn trigger() -> Envelope {
    Envelope::new(
        "frontend_animation",
        json!({"animations": ["Doors_LAction"], "reverse": false}),
    )
}

#[tokio::test]
async fn every_party_receives_the_envelope_including_the_sender() {
    let running = start_relay().await;
    let mut sender = connect(running.addr).await;
    let mut first = connect(running.addr).await;
    let mut second = connect(running.addr).await;
    wait_for_parties(&running, 3).await;

    sender
        .send(Message::Text(trigger().to_json().unwrap().into()))
        .await
        .unwrap();

    assert_eq!(next_envelope(&mut sender).await, trigger());
    assert_eq!(next_envelope(&mut first).await, trigger());
    assert_eq!(next_envelope(&mut second).await, trigger());
}

#[tokio::test]
async fn malformed_frames_are_dropped_and_the_connection_survives() {
    let running = start_relay().await;
    let mut socket = connect(running.addr).await;
    wait_for_parties(&running, 1).await;

    socket.send(Message::Text("not json".into())).await.unwrap();
    socket
        .send(Message::Text(trigger().to_json().unwrap().into()))
        .await
        .unwrap();

    assert_eq!(next_envelope(&mut socket).await, trigger());
}

#[tokio::test]
async fn relay_client_forwards_inbound_envelopes() {
    let running = start_relay().await;
    let (inbound, mut rx) = mpsc::channel(8);
    let client = RelayClient::spawn(
        ClientOptions::new(format!("ws://{}/ws", running.addr)),
        inbound,
    );
    client.wait_connected().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);
    wait_for_parties(&running, 1).await;

    publish_once(
        &format!("ws://{}/ws", running.addr),
        &trigger(),
        Duration::from_secs(2),
    )
    .await
    .unwrap();

    let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, trigger());
    client.close().await;
}

#[tokio::test]
async fn command_endpoint_answers_known_and_unknown_commands() {
    let running = start_relay().await;
    let base = format!("http://{}", running.addr);

    let ok = reqwest::get(format!("{base}/send/engine_on")).await.unwrap();
    assert_eq!(ok.status(), reqwest::StatusCode::OK);
    assert_eq!(ok.text().await.unwrap(), "Sent: engine_on");

    let bad = reqwest::get(format!("{base}/send/warp_drive")).await.unwrap();
    assert_eq!(bad.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(bad.text().await.unwrap(), "Invalid command: warp_drive");
}

#[tokio::test]
async fn metrics_endpoint_reports_fanout() {
    let running = start_relay().await;
    let mut socket = connect(running.addr).await;
    wait_for_parties(&running, 1).await;
    socket
        .send(Message::Text(trigger().to_json().unwrap().into()))
        .await
        .unwrap();
    next_envelope(&mut socket).await;

    let body = reqwest::get(format!("http://{}/metrics", running.addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("canview_relayed_events_total 1"));
}
