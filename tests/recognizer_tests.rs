//! Recognizer Tests
//!
//! Runs the streaming recognizer client against a local WebSocket server
//! that behaves like the listen API.

use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use waav_callbridge::core::stt::{
    DeepgramRecognizer, Recognizer, RecognizerConfig, RecognizerEvent,
};

/// What the mock server observed on one connection.
#[derive(Debug, Default)]
struct Observed {
    uri: String,
    authorization: Option<String>,
    binary_chunks: usize,
    keepalives: usize,
    close_stream: bool,
}

/// How the mock server behaves after the handshake.
#[derive(Clone, Copy)]
enum Script {
    /// Answer the first audio chunk with an interim and a final result
    TranscribeFirstChunk,
    /// Only listen
    Listen,
    /// Close the stream with an error frame after the first audio chunk
    CloseAfterFirstChunk,
}

async fn spawn_listen_server(script: Script) -> (String, mpsc::Receiver<Observed>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (report_tx, report_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut observed = Observed::default();
        let (uri_tx, uri_rx) = std::sync::mpsc::channel();

        let callback = move |request: &Request,
                             response: Response|
              -> Result<Response, ErrorResponse> {
            let auth = request
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let _ = uri_tx.send((request.uri().to_string(), auth));
            Ok(response)
        };
        let ws = accept_hdr_async(stream, callback).await.unwrap();

        if let Ok((uri, auth)) = uri_rx.recv() {
            observed.uri = uri;
            observed.authorization = auth;
        }

        let (mut write, mut read) = ws.split();
        while let Some(Ok(message)) = read.next().await {
            match message {
                Message::Binary(_) => {
                    observed.binary_chunks += 1;
                    if observed.binary_chunks == 1 {
                        match script {
                            Script::TranscribeFirstChunk => {
                                let interim = json!({
                                    "type": "Results",
                                    "is_final": false,
                                    "speech_final": false,
                                    "channel": { "alternatives": [{ "transcript": "hel" }] }
                                });
                                let final_result = json!({
                                    "type": "Results",
                                    "is_final": true,
                                    "speech_final": true,
                                    "channel": { "alternatives": [{ "transcript": " hello there " }] }
                                });
                                write
                                    .send(Message::Text(interim.to_string().into()))
                                    .await
                                    .unwrap();
                                write
                                    .send(Message::Text(final_result.to_string().into()))
                                    .await
                                    .unwrap();
                            }
                            Script::CloseAfterFirstChunk => {
                                let _ = write
                                    .send(Message::Close(Some(CloseFrame {
                                        code: CloseCode::Error,
                                        reason: "quota exceeded".into(),
                                    })))
                                    .await;
                                break;
                            }
                            Script::Listen => {}
                        }
                    }
                }
                Message::Text(text) => {
                    let value: serde_json::Value =
                        serde_json::from_str(text.as_str()).unwrap_or_default();
                    match value["type"].as_str() {
                        Some("KeepAlive") => observed.keepalives += 1,
                        Some("CloseStream") => observed.close_stream = true,
                        _ => {}
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        let _ = report_tx.send(observed).await;
    });

    (format!("ws://{addr}/v1/listen"), report_rx)
}

fn config(url: String) -> RecognizerConfig {
    RecognizerConfig {
        api_key: "dg-test-key".to_string(),
        url,
        ..Default::default()
    }
}

async fn next_event(rx: &mut mpsc::Receiver<RecognizerEvent>) -> RecognizerEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("recognizer event")
        .expect("event channel open")
}

#[tokio::test]
async fn test_final_transcript_round_trip() {
    let (url, mut report) = spawn_listen_server(Script::TranscribeFirstChunk).await;
    let mut recognizer = DeepgramRecognizer::new(config(url));
    let (events_tx, mut events) = mpsc::channel(16);

    recognizer.open(events_tx).await.unwrap();
    assert!(recognizer.is_open());

    recognizer.send_audio(Bytes::from_static(&[0xFF; 160]));
    recognizer.send_audio(Bytes::from_static(&[0x7F; 160]));

    // Interim result is filtered out
    assert_eq!(
        next_event(&mut events).await,
        RecognizerEvent::FinalTranscript("hello there".to_string())
    );

    recognizer.close().await;
    assert!(!recognizer.is_open());

    let observed = timeout(Duration::from_secs(5), report.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(observed.authorization.as_deref(), Some("Token dg-test-key"));
    assert!(observed.uri.starts_with("/v1/listen?"));
    assert!(observed.uri.contains("encoding=mulaw"));
    assert!(observed.uri.contains("sample_rate=8000"));
    assert!(observed.uri.contains("channels=1"));
    assert!(observed.uri.contains("interim_results=false"));
    assert_eq!(observed.binary_chunks, 2);
    assert!(observed.close_stream);

    // Closing locally is not reported as a lost connection
    assert!(
        timeout(Duration::from_millis(200), events.recv())
            .await
            .map(|e| e.is_none())
            .unwrap_or(true)
    );
}

#[tokio::test]
async fn test_keepalive_sent_while_idle() {
    let (url, mut report) = spawn_listen_server(Script::Listen).await;
    let mut recognizer = DeepgramRecognizer::new(RecognizerConfig {
        keepalive: Duration::from_millis(100),
        ..config(url)
    });
    let (events_tx, _events) = mpsc::channel(16);

    recognizer.open(events_tx).await.unwrap();
    tokio::time::sleep(Duration::from_millis(350)).await;
    recognizer.close().await;

    let observed = timeout(Duration::from_secs(5), report.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(
        observed.keepalives >= 2,
        "expected at least two keepalives, saw {}",
        observed.keepalives
    );
}

#[tokio::test]
async fn test_upstream_close_reports_closed() {
    let (url, _report) = spawn_listen_server(Script::CloseAfterFirstChunk).await;
    let mut recognizer = DeepgramRecognizer::new(config(url));
    let (events_tx, mut events) = mpsc::channel(16);

    recognizer.open(events_tx).await.unwrap();
    recognizer.send_audio(Bytes::from_static(&[0xFF; 160]));

    match next_event(&mut events).await {
        RecognizerEvent::Closed { reason } => {
            assert_eq!(reason.as_deref(), Some("quota exceeded"));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // Give the connection task a moment to record the state
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!recognizer.is_open());

    // Audio after loss is dropped without error
    recognizer.send_audio(Bytes::from_static(&[0xFF; 160]));
    recognizer.close().await;
}

#[tokio::test]
async fn test_connect_timeout() {
    // Accept TCP but never complete the WebSocket handshake
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let mut recognizer = DeepgramRecognizer::new(RecognizerConfig {
        connect_timeout: Duration::from_millis(200),
        ..config(format!("ws://{addr}/v1/listen"))
    });
    let (events_tx, _events) = mpsc::channel(16);

    let err = recognizer.open(events_tx).await.unwrap_err();
    assert!(matches!(err, waav_callbridge::BridgeError::Timeout(_)));
    assert!(!recognizer.is_open());
}
