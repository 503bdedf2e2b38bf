//! Reply text to telephony frames.
//!
//! Fetches a synthesized container, decodes, resamples to 8 kHz and frames
//! it. This is a fallback boundary: whatever goes wrong, the caller gets a
//! non-empty, playable frame sequence back.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use super::frames::{
    AudioFrame, FRAME_DURATION_MS, FinalFramePolicy, TELEPHONY_SAMPLE_RATE, encode_frames,
    silence_frames, tone_frames,
};
use super::resample::resample;
use super::wav::decode_container;
use crate::core::tts::BoxedSynthesizer;
use crate::errors::{BridgeError, BridgeResult};

/// Silence frames returned when synthesis yields no samples.
pub const EMPTY_AUDIO_SILENCE_FRAMES: usize = 15;

/// How rendered audio is framed and what the failure tone sounds like.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub frame_ms: u32,
    pub final_frame_policy: FinalFramePolicy,
    pub synthesis_timeout: Duration,
    pub fallback_tone_ms: u32,
    pub fallback_tone_hz: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            frame_ms: FRAME_DURATION_MS,
            final_frame_policy: FinalFramePolicy::Pad,
            synthesis_timeout: Duration::from_millis(10_000),
            fallback_tone_ms: 400,
            fallback_tone_hz: 600,
        }
    }
}

/// Decode a synthesized container and frame it for telephony.
///
/// Returns an empty vector when the container holds no samples.
pub fn transcode(
    container: &[u8],
    frame_ms: u32,
    policy: FinalFramePolicy,
) -> BridgeResult<Vec<AudioFrame>> {
    let decoded = decode_container(container)?;
    let samples = resample(decoded.samples, decoded.sample_rate, TELEPHONY_SAMPLE_RATE);
    Ok(encode_frames(&samples, TELEPHONY_SAMPLE_RATE, frame_ms, policy))
}

/// Renders reply text into frames through a speech synthesizer.
pub struct AudioPipeline {
    synthesizer: BoxedSynthesizer,
    settings: RenderSettings,
}

impl AudioPipeline {
    pub fn new(synthesizer: BoxedSynthesizer, settings: RenderSettings) -> Self {
        Self {
            synthesizer,
            settings,
        }
    }

    /// Render `text`; never returns an empty sequence.
    pub async fn render(&self, text: &str) -> Vec<AudioFrame> {
        match self.try_render(text).await {
            Ok(frames) if frames.is_empty() => {
                debug!("Synthesized audio was empty, sending silence");
                silence_frames(EMPTY_AUDIO_SILENCE_FRAMES)
            }
            Ok(frames) => frames,
            Err(e) => {
                warn!(
                    provider = self.synthesizer.name(),
                    error = %e,
                    "Speech rendering failed, sending fallback tone"
                );
                self.fallback_frames()
            }
        }
    }

    /// The audible tone used when rendering fails.
    pub fn fallback_frames(&self) -> Vec<AudioFrame> {
        tone_frames(
            self.settings.fallback_tone_ms,
            self.settings.fallback_tone_hz,
            self.settings.final_frame_policy,
        )
    }

    async fn try_render(&self, text: &str) -> BridgeResult<Vec<AudioFrame>> {
        let container = timeout(
            self.settings.synthesis_timeout,
            self.synthesizer.synthesize(text),
        )
        .await
        .map_err(|_| {
            BridgeError::Timeout(format!(
                "speech synthesis exceeded {:?}",
                self.settings.synthesis_timeout
            ))
        })??;

        let frames = transcode(
            &container,
            self.settings.frame_ms,
            self.settings.final_frame_policy,
        )?;
        debug!(
            container_bytes = container.len(),
            frames = frames.len(),
            "Rendered reply audio"
        );
        Ok(frames)
    }
}
