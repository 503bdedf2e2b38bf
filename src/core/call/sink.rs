use async_trait::async_trait;
use tokio::sync::mpsc;

use super::events::OutboundSignal;
use super::pump::FrameSink;
use crate::core::audio::AudioFrame;
use crate::errors::{BridgeError, BridgeResult};

/// Frame sink feeding the connection's outbound writer task.
pub struct ChannelSink {
    stream_id: String,
    tx: mpsc::Sender<OutboundSignal>,
}

impl ChannelSink {
    pub fn new(stream_id: impl Into<String>, tx: mpsc::Sender<OutboundSignal>) -> Self {
        Self {
            stream_id: stream_id.into(),
            tx,
        }
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_frame(&mut self, frame: &AudioFrame) -> BridgeResult<()> {
        self.tx
            .send(OutboundSignal::Media {
                stream_id: self.stream_id.clone(),
                frame: frame.clone(),
            })
            .await
            .map_err(|_| BridgeError::TransportClosed("outbound channel closed".to_string()))
    }

    async fn send_mark(&mut self, name: &str) -> BridgeResult<()> {
        self.tx
            .send(OutboundSignal::Mark {
                stream_id: self.stream_id.clone(),
                name: name.to_string(),
            })
            .await
            .map_err(|_| BridgeError::TransportClosed("outbound channel closed".to_string()))
    }
}
