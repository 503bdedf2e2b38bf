//! Real-time paced frame delivery.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use super::control::AbortSignal;
use crate::core::audio::{AudioFrame, FRAME_DURATION_MS};
use crate::errors::BridgeResult;

/// Progress log interval, in frames.
const PROGRESS_LOG_EVERY: usize = 50;

/// Destination for outgoing audio.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_frame(&mut self, frame: &AudioFrame) -> BridgeResult<()>;

    /// End-of-utterance marker.
    async fn send_mark(&mut self, name: &str) -> BridgeResult<()>;
}

/// Result of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpOutcome {
    pub frames_sent: usize,
    pub aborted: bool,
}

/// Sends frames at a fixed cadence, stopping early when aborted.
#[derive(Debug, Clone, Copy)]
pub struct FramePump {
    cadence: Duration,
}

impl Default for FramePump {
    fn default() -> Self {
        Self::new(Duration::from_millis(FRAME_DURATION_MS as u64))
    }
}

impl FramePump {
    pub fn new(cadence: Duration) -> Self {
        Self { cadence }
    }

    /// Deliver `frames` in order.
    ///
    /// The abort signal is checked before every frame and once more after the
    /// last cadence wait. After each frame the pump waits one cadence period,
    /// measured from the previous deadline so slow sends do not accumulate
    /// drift. The mark named `mark` goes out only when every frame was sent
    /// and playback was never aborted. A failed send ends delivery and counts
    /// as an abort; nothing is retried.
    pub async fn deliver<S>(
        &self,
        frames: &[AudioFrame],
        signal: &AbortSignal,
        sink: &mut S,
        mark: &str,
    ) -> PumpOutcome
    where
        S: FrameSink + ?Sized,
    {
        let mut frames_sent = 0;
        let mut deadline = Instant::now();

        for frame in frames {
            if signal.is_aborted() {
                info!(frames_sent, total = frames.len(), "Playback aborted");
                return PumpOutcome {
                    frames_sent,
                    aborted: true,
                };
            }

            if let Err(e) = sink.send_frame(frame).await {
                info!(frames_sent, error = %e, "Playback stopped, sink closed");
                return PumpOutcome {
                    frames_sent,
                    aborted: true,
                };
            }
            frames_sent += 1;

            if frames_sent % PROGRESS_LOG_EVERY == 0 {
                debug!(frames_sent, total = frames.len(), "Playback progress");
            }

            deadline += self.cadence;
            sleep_until(deadline).await;
        }

        if signal.is_aborted() {
            info!(frames_sent, "Playback aborted after the last frame, no mark");
            return PumpOutcome {
                frames_sent,
                aborted: true,
            };
        }

        if let Err(e) = sink.send_mark(mark).await {
            info!(frames_sent, error = %e, "End-of-utterance mark not delivered");
            return PumpOutcome {
                frames_sent,
                aborted: true,
            };
        }

        info!(frames_sent, "Playback complete");
        PumpOutcome {
            frames_sent,
            aborted: false,
        }
    }
}
