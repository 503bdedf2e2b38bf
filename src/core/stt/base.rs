use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::errors::{BridgeError, BridgeResult};

/// Default streaming recognizer endpoint.
pub const DEFAULT_RECOGNIZER_URL: &str = "wss://api.deepgram.com/v1/listen";

/// Events a recognizer pushes to its owning call.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    /// A finalized utterance; interim results never surface
    FinalTranscript(String),
    /// A connection-level problem that did not close the connection
    Error(BridgeError),
    /// The upstream connection ended on its own
    Closed { reason: Option<String> },
}

/// Connection parameters for a streaming recognizer.
#[derive(Clone)]
pub struct RecognizerConfig {
    pub api_key: String,
    pub url: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Silence, in ms, after which the service finalizes an utterance
    pub endpointing_ms: u32,
    /// Heartbeat interval while the connection is open
    pub keepalive: Duration,
    /// Bound on the connection handshake
    pub connect_timeout: Duration,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: DEFAULT_RECOGNIZER_URL.to_string(),
            sample_rate: 8000,
            channels: 1,
            endpointing_ms: 200,
            keepalive: Duration::from_millis(5_000),
            connect_timeout: Duration::from_millis(10_000),
        }
    }
}

impl std::fmt::Debug for RecognizerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizerConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("url", &self.url)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("endpointing_ms", &self.endpointing_ms)
            .field("keepalive", &self.keepalive)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl RecognizerConfig {
    pub fn validate(&self) -> BridgeResult<()> {
        if self.api_key.is_empty() {
            return Err(BridgeError::Configuration(
                "recognizer API key is not set".to_string(),
            ));
        }
        if self.keepalive.is_zero() {
            return Err(BridgeError::Configuration(
                "recognizer keepalive must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A streaming speech recognizer connection owned by one call.
#[async_trait]
pub trait Recognizer: Send {
    /// Connect and start delivering events to `events`.
    ///
    /// Returns once the connection is usable or has failed.
    async fn open(&mut self, events: mpsc::Sender<RecognizerEvent>) -> BridgeResult<()>;

    /// Forward raw companded audio. Silently dropped when not open.
    fn send_audio(&self, audio: Bytes);

    fn is_open(&self) -> bool;

    /// Close the connection and stop the heartbeat. Errors are ignored.
    async fn close(&mut self);
}

pub type BoxedRecognizer = Box<dyn Recognizer>;

/// Builds a fresh recognizer for each call.
pub type RecognizerFactory = Arc<dyn Fn() -> BoxedRecognizer + Send + Sync>;
