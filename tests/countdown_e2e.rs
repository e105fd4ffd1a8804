//! End-to-end tests against a real server on a loopback port

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use shared_countdown::{
    clock::SystemClock,
    create_router,
    relay::{RecordingRelay, RelayCall, RelayDispatcher},
    state::{AppState, CountdownOptions},
};
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const TICK: Duration = Duration::from_millis(50);

async fn spawn_server(relay: Arc<RecordingRelay>) -> (String, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        CountdownOptions {
            default_duration_ms: 45_000,
            tick_period: TICK,
            relay_duration_ms: 10_000,
        },
        Arc::new(SystemClock),
        RelayDispatcher::new(relay, Duration::from_millis(500)),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

async fn get_state(client: &reqwest::Client, base: &str) -> Value {
    client
        .get(format!("{}/api/state", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn post(client: &reqwest::Client, base: &str, path: &str, body: Value) -> Value {
    client
        .post(format!("{}{}", base, path))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn countdown_runs_to_completion_and_fires_relay_once() {
    let relay = Arc::new(RecordingRelay::new());
    let (base, _state) = spawn_server(Arc::clone(&relay)).await;
    let client = reqwest::Client::new();

    let idle = get_state(&client, &base).await;
    assert_eq!(idle["running"], false);
    assert_eq!(idle["durationMs"], 45_000);

    let started = post(&client, &base, "/api/start", serde_json::json!({ "durationMs": 300 })).await;
    assert_eq!(started["ok"], true);

    let now = get_state(&client, &base).await;
    assert_eq!(now["running"], true);
    let remaining = now["remainingMs"].as_u64().unwrap();
    assert!(remaining > 0 && remaining <= 300);

    tokio::time::sleep(Duration::from_millis(300 + 4 * TICK.as_millis() as u64)).await;

    let done = get_state(&client, &base).await;
    assert_eq!(done["running"], false);
    assert_eq!(done["remainingMs"], 0);
    assert_eq!(relay.activations(), 1);
    assert_eq!(relay.calls(), vec![RelayCall::Deactivate, RelayCall::Activate(10_000)]);
}

#[tokio::test]
async fn zero_duration_fires_relay_shortly_after() {
    let relay = Arc::new(RecordingRelay::new());
    let (base, _state) = spawn_server(Arc::clone(&relay)).await;
    let client = reqwest::Client::new();

    let started = post(&client, &base, "/api/start", serde_json::json!({ "durationMs": 0 })).await;
    assert_eq!(started["state"]["running"], false);
    assert_eq!(started["state"]["remainingMs"], 0);

    tokio::time::sleep(TICK * 4).await;
    assert_eq!(relay.activations(), 1);
}

#[tokio::test]
async fn failing_relay_never_blocks_the_countdown() {
    let relay = Arc::new(RecordingRelay::failing());
    let (base, state) = spawn_server(Arc::clone(&relay)).await;
    let client = reqwest::Client::new();
    let (mut sub, _) = state.connect();

    post(&client, &base, "/api/start", serde_json::json!({ "durationMs": 100 })).await;
    tokio::time::sleep(Duration::from_millis(100) + TICK * 4).await;

    let mut names = Vec::new();
    while let Ok(event) = sub.try_recv() {
        names.push(event.name());
    }
    assert_eq!(names.first(), Some(&"start"));
    assert_eq!(names.last(), Some(&"done"));
    assert_eq!(names.iter().filter(|n| **n == "done").count(), 1);

    // The server still accepts commands after the relay failed
    let reset = post(&client, &base, "/api/reset", serde_json::json!({ "durationMs": 20_000 })).await;
    assert_eq!(reset["ok"], true);
    let restarted = post(&client, &base, "/api/start", serde_json::json!({})).await;
    assert_eq!(restarted["state"]["durationMs"], 20_000);
}

async fn open_socket(base: &str) -> Socket {
    let url = format!("{}/ws", base.replacen("http", "ws", 1));
    let (socket, _) = connect_async(url).await.unwrap();
    socket
}

/// Next JSON text frame, skipping control frames
async fn next_frame(socket: &mut Socket) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("no frame within 2s")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Read frames until `done`, returning the event names seen
async fn events_until_done(socket: &mut Socket) -> Vec<String> {
    let mut names = Vec::new();
    loop {
        let frame = next_frame(socket).await;
        let name = frame["event"].as_str().unwrap().to_string();
        names.push(name.clone());
        if name == "done" {
            return names;
        }
    }
}

#[tokio::test]
async fn websocket_observers_share_one_countdown() {
    let relay = Arc::new(RecordingRelay::new());
    let (base, state) = spawn_server(Arc::clone(&relay)).await;

    let mut a = open_socket(&base).await;
    let mut b = open_socket(&base).await;
    for socket in [&mut a, &mut b] {
        let greeting = next_frame(socket).await;
        assert_eq!(greeting["event"], "state");
        assert_eq!(greeting["state"]["durationMs"], 45_000);
        assert_eq!(greeting["state"]["running"], false);
    }

    // A third observer vanishes without a close handshake
    let c = open_socket(&base).await;
    drop(c);

    a.send(Message::Text(r#"{"command":"start","durationMs":150}"#.to_string()))
        .await
        .unwrap();

    for socket in [&mut a, &mut b] {
        let names = events_until_done(socket).await;
        assert_eq!(names.first().map(String::as_str), Some("start"));
        assert!(names.iter().any(|n| n == "tick"));
        assert_eq!(names.iter().filter(|n| *n == "done").count(), 1);
    }

    let mut observers = state.hub.observers();
    for _ in 0..20 {
        if observers == 2 {
            break;
        }
        tokio::time::sleep(TICK).await;
        observers = state.hub.observers();
    }
    assert_eq!(observers, 2);

    state.relay.flush().await;
    assert_eq!(relay.activations(), 1);
}
