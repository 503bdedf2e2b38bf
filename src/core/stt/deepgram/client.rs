//! Deepgram streaming recognizer over WebSocket.
//!
//! One connection per call. The handshake is awaited inside [`open`], then a
//! connection task multiplexes outgoing audio, the keepalive heartbeat,
//! incoming transcripts and the shutdown signal.
//!
//! [`open`]: crate::core::stt::Recognizer::open

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::HeaderValue;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::messages::{CloseStreamMessage, KeepAliveMessage, final_transcript};
use crate::core::stt::base::{Recognizer, RecognizerConfig, RecognizerEvent};
use crate::errors::{BridgeError, BridgeResult};

/// Buffered audio chunks between the call and the connection task.
/// 50 chunks is one second of 20 ms telephony frames.
const AUDIO_CHANNEL_CAPACITY: usize = 50;

/// How long [`Recognizer::close`] waits for the connection task.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Build the listen URL with the telephony audio parameters.
pub fn build_listen_url(config: &RecognizerConfig) -> BridgeResult<Url> {
    let mut url = Url::parse(&config.url)
        .map_err(|e| BridgeError::Configuration(format!("invalid recognizer URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("encoding", "mulaw")
        .append_pair("sample_rate", &config.sample_rate.to_string())
        .append_pair("channels", &config.channels.to_string())
        .append_pair("punctuate", "true")
        .append_pair("smart_format", "true")
        .append_pair("interim_results", "false")
        .append_pair("endpointing", &config.endpointing_ms.to_string());
    Ok(url)
}

/// Deepgram listen-API recognizer.
pub struct DeepgramRecognizer {
    config: RecognizerConfig,
    audio_tx: Option<mpsc::Sender<Bytes>>,
    shutdown: CancellationToken,
    is_open: Arc<AtomicBool>,
    connection_handle: Option<JoinHandle<()>>,
}

impl DeepgramRecognizer {
    pub fn new(config: RecognizerConfig) -> Self {
        Self {
            config,
            audio_tx: None,
            shutdown: CancellationToken::new(),
            is_open: Arc::new(AtomicBool::new(false)),
            connection_handle: None,
        }
    }
}

#[async_trait]
impl Recognizer for DeepgramRecognizer {
    async fn open(&mut self, events: mpsc::Sender<RecognizerEvent>) -> BridgeResult<()> {
        self.config.validate()?;
        let url = build_listen_url(&self.config)?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| BridgeError::Configuration(format!("recognizer request: {e}")))?;
        let auth = HeaderValue::from_str(&format!("Token {}", self.config.api_key))
            .map_err(|e| BridgeError::Configuration(format!("recognizer API key: {e}")))?;
        request.headers_mut().insert(http::header::AUTHORIZATION, auth);

        let (ws_stream, _response) = timeout(self.config.connect_timeout, connect_async(request))
            .await
            .map_err(|_| {
                BridgeError::Timeout(format!(
                    "recognizer connect exceeded {:?}",
                    self.config.connect_timeout
                ))
            })?
            .map_err(|e| BridgeError::UpstreamUnavailable(format!("recognizer connect: {e}")))?;

        info!(host = url.host_str().unwrap_or_default(), "Connected to recognizer");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (audio_tx, mut audio_rx) = mpsc::channel::<Bytes>(AUDIO_CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();
        let is_open = self.is_open.clone();
        let keepalive_period = self.config.keepalive;

        is_open.store(true, Ordering::Release);
        self.audio_tx = Some(audio_tx);
        self.shutdown = shutdown.clone();

        let handle = tokio::spawn(async move {
            let mut keepalive = interval_at(Instant::now() + keepalive_period, keepalive_period);
            let mut close_reason: Option<String> = None;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        if let Ok(json) = serde_json::to_string(&CloseStreamMessage::default()) {
                            let _ = ws_sink.send(Message::Text(json.into())).await;
                        }
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }

                    Some(audio) = audio_rx.recv() => {
                        if let Err(e) = ws_sink.send(Message::Binary(audio)).await {
                            warn!(error = %e, "Failed to forward audio to recognizer");
                            close_reason = Some(e.to_string());
                            break;
                        }
                    }

                    _ = keepalive.tick() => {
                        let sent = match serde_json::to_string(&KeepAliveMessage::default()) {
                            Ok(json) => ws_sink.send(Message::Text(json.into())).await.map_err(|e| e.to_string()),
                            Err(e) => Err(e.to_string()),
                        };
                        match sent {
                            Ok(()) => debug!("Recognizer keepalive sent"),
                            Err(e) => warn!(error = %e, "Recognizer keepalive failed"),
                        }
                    }

                    message = ws_stream.next() => {
                        match message {
                            Some(Ok(Message::Text(text))) => {
                                if let Some(transcript) = final_transcript(text.as_str()) {
                                    if events.send(RecognizerEvent::FinalTranscript(transcript)).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                close_reason = frame.map(|f| f.reason.as_str().to_string());
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                let _ = events
                                    .send(RecognizerEvent::Error(BridgeError::UpstreamUnavailable(e.to_string())))
                                    .await;
                                close_reason = Some(e.to_string());
                                break;
                            }
                            None => break,
                        }
                    }
                }
            }

            is_open.store(false, Ordering::Release);

            if !shutdown.is_cancelled() {
                info!(reason = ?close_reason, "Recognizer connection closed by upstream");
                let _ = events
                    .send(RecognizerEvent::Closed {
                        reason: close_reason,
                    })
                    .await;
            }
        });

        self.connection_handle = Some(handle);
        Ok(())
    }

    fn send_audio(&self, audio: Bytes) {
        if !self.is_open() {
            return;
        }
        if let Some(tx) = &self.audio_tx
            && let Err(e) = tx.try_send(audio)
        {
            debug!(error = %e, "Dropping audio chunk for recognizer");
        }
    }

    fn is_open(&self) -> bool {
        self.is_open.load(Ordering::Acquire)
    }

    async fn close(&mut self) {
        self.shutdown.cancel();
        self.audio_tx = None;

        if let Some(handle) = self.connection_handle.take()
            && timeout(CLOSE_TIMEOUT, handle).await.is_err()
        {
            warn!("Recognizer connection task did not stop in time");
        }

        self.is_open.store(false, Ordering::Release);
    }
}
