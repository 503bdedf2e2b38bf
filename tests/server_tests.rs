//! Server Tests
//!
//! Router-level checks plus a full call over a real WebSocket, with the
//! recognizer, reply and synthesis services replaced by in-process doubles.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tower::util::ServiceExt;

use waav_callbridge::{AppState, ServerConfig, routes};

use common::{RecognizerProbe, ScriptedReplies, StubSynthesizer, services};

fn test_state(max_calls: Option<usize>, probe: Arc<RecognizerProbe>) -> Arc<AppState> {
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.max_concurrent_calls = max_calls;
    AppState::with_components(
        config,
        services(
            Arc::new(ScriptedReplies::new("Hi there")),
            Arc::new(StubSynthesizer::tone(200)),
            probe,
        ),
    )
}

async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = routes::create_app(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

/// Serve the app on an ephemeral port and return the media-stream URL.
async fn serve(state: Arc<AppState>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::create_app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/media-stream")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_health_check() {
    let app = routes::create_app(test_state(None, Arc::default()));
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_list_calls_when_idle() {
    let (status, body) = get_json(test_state(Some(4), Arc::default()), "/calls").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], 0);
    assert_eq!(body["max"], 4);
    assert_eq!(body["calls"], json!([]));
}

#[tokio::test]
async fn test_unknown_call_is_not_found() {
    let (status, _) = get_json(test_state(None, Arc::default()), "/calls/no-such-call").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_media_stream_requires_upgrade() {
    let app = routes::create_app(test_state(None, Arc::default()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/media-stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_call_over_websocket() {
    let probe = Arc::new(RecognizerProbe::default());
    let state = test_state(None, probe.clone());
    let url = serve(state.clone()).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    ws.send(Message::Text(
        json!({ "event": "connected", "protocol": "Call", "version": "1.0.0" })
            .to_string()
            .into(),
    ))
    .await
    .unwrap();
    ws.send(Message::Text(
        json!({
            "event": "start",
            "sequenceNumber": "1",
            "start": { "streamSid": "MZ-e2e", "callSid": "CA-e2e", "tracks": ["inbound"] },
            "streamSid": "MZ-e2e"
        })
        .to_string()
        .into(),
    ))
    .await
    .unwrap();
    wait_until(|| probe.opened() == 1).await;

    // The call shows up in the inspection API with its stream id
    let (_, calls) = get_json(state.clone(), "/calls").await;
    assert_eq!(calls["active"], 1);
    let call_id = calls["calls"][0]["call_id"].as_str().unwrap().to_string();
    let (status, call) = get_json(state.clone(), &format!("/calls/{call_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(call["stream_id"], "MZ-e2e");
    assert_eq!(call["state"], "listening");

    // Caller audio is forwarded to the recognizer; junk is ignored
    ws.send(Message::Text(
        json!({ "event": "media", "streamSid": "MZ-e2e", "media": { "payload": "//////////8=" } })
            .to_string()
            .into(),
    ))
    .await
    .unwrap();
    ws.send(Message::Text("not json".into())).await.unwrap();
    ws.send(Message::Text(json!({ "event": "dtmf" }).to_string().into()))
        .await
        .unwrap();
    wait_until(|| probe.audio_chunks() == 1).await;

    probe.transcript("hello").await;

    // 200 ms of reply audio arrives as ten frames followed by a mark
    let mut frames = 0;
    let mark = timeout(Duration::from_secs(5), async {
        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            let value: Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(value["streamSid"], "MZ-e2e");
            match value["event"].as_str() {
                Some("media") => {
                    assert!(value["media"]["payload"].as_str().unwrap().len() > 200);
                    frames += 1;
                }
                Some("mark") => return value["mark"]["name"].as_str().map(str::to_string),
                other => panic!("unexpected outbound event {other:?}"),
            }
        }
        None
    })
    .await
    .unwrap();

    assert_eq!(frames, 10);
    assert_eq!(mark.as_deref(), Some("reply-1"));

    ws.send(Message::Text(
        json!({ "event": "stop", "streamSid": "MZ-e2e" })
            .to_string()
            .into(),
    ))
    .await
    .unwrap();

    wait_until(|| state.registry.is_empty()).await;
    assert_eq!(probe.closed(), 1);
}

#[tokio::test]
async fn test_disconnect_releases_call() {
    let probe = Arc::new(RecognizerProbe::default());
    let state = test_state(None, probe.clone());
    let url = serve(state.clone()).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    ws.send(Message::Text(
        json!({ "event": "start", "streamSid": "MZ-drop" })
            .to_string()
            .into(),
    ))
    .await
    .unwrap();
    wait_until(|| probe.opened() == 1).await;

    drop(ws);

    wait_until(|| state.registry.is_empty()).await;
    wait_until(|| probe.closed() == 1).await;
}

#[tokio::test]
async fn test_capacity_rejects_extra_calls() {
    let state = test_state(Some(1), Arc::default());
    let url = serve(state.clone()).await;

    let (_first, _) = tokio_tungstenite::connect_async(url.clone()).await.unwrap();
    wait_until(|| state.registry.len() == 1).await;

    let (mut second, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    let closed = timeout(Duration::from_secs(5), async {
        loop {
            match second.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return true,
                Some(Ok(_)) => {}
            }
        }
    })
    .await
    .unwrap();

    assert!(closed);
    assert_eq!(state.registry.len(), 1);
}
