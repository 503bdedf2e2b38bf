//! Fixed-duration telephony frames.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::mulaw::{MULAW_SILENCE, encode_samples, float_to_i16, linear_to_ulaw};

/// Telephony sample rate in Hz.
pub const TELEPHONY_SAMPLE_RATE: u32 = 8000;

/// Duration of one frame in milliseconds.
pub const FRAME_DURATION_MS: u32 = 20;

/// Encoded bytes in one 20 ms frame at 8 kHz.
pub const FRAME_BYTES: usize = 160;

const TONE_AMPLITUDE: f32 = 0.75;
const TONE_FADE_MS: u32 = 40;

/// One slice of μ-law audio in playback order.
///
/// Cheap to clone; the payload is reference counted.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioFrame(Bytes);

impl AudioFrame {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// A full-length frame of μ-law silence.
    pub fn silence() -> Self {
        Self(Bytes::from_static(&[MULAW_SILENCE; FRAME_BYTES]))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Base64 payload as carried in telephony `media` messages.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

// Payloads stay out of logs
impl fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFrame").field("len", &self.0.len()).finish()
    }
}

/// What to do with a trailing chunk shorter than one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalFramePolicy {
    /// Pad the final frame to full size with μ-law silence
    #[default]
    Pad,
    /// Deliver the final frame short
    Short,
}

impl FromStr for FinalFramePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pad" => Ok(Self::Pad),
            "short" => Ok(Self::Short),
            other => Err(format!("unknown final frame policy '{other}' (expected pad or short)")),
        }
    }
}

impl fmt::Display for FinalFramePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pad => write!(f, "pad"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Bytes per frame for one-byte-per-sample audio.
pub fn frame_size(sample_rate: u32, frame_ms: u32) -> usize {
    ((sample_rate as u64 * frame_ms as u64) / 1000).max(1) as usize
}

/// Split a companded byte stream into frames of `frame_len` bytes.
///
/// Produces `ceil(len / frame_len)` frames; the last one is padded or left
/// short according to `policy`.
pub fn chunk_frames(encoded: &[u8], frame_len: usize, policy: FinalFramePolicy) -> Vec<AudioFrame> {
    let frame_len = frame_len.max(1);
    encoded
        .chunks(frame_len)
        .map(|chunk| {
            if chunk.len() < frame_len && policy == FinalFramePolicy::Pad {
                let mut padded = Vec::with_capacity(frame_len);
                padded.extend_from_slice(chunk);
                padded.resize(frame_len, MULAW_SILENCE);
                AudioFrame::new(padded)
            } else {
                AudioFrame::new(Bytes::copy_from_slice(chunk))
            }
        })
        .collect()
}

/// Compand float samples and slice them into telephony frames.
pub fn encode_frames(
    samples: &[f32],
    sample_rate: u32,
    frame_ms: u32,
    policy: FinalFramePolicy,
) -> Vec<AudioFrame> {
    let encoded = encode_samples(samples);
    chunk_frames(&encoded, frame_size(sample_rate, frame_ms), policy)
}

/// `count` full frames of explicit silence.
pub fn silence_frames(count: usize) -> Vec<AudioFrame> {
    vec![AudioFrame::silence(); count]
}

/// An audible sine tone with linear fade in and out, at 8 kHz.
pub fn tone_frames(duration_ms: u32, freq_hz: u32, policy: FinalFramePolicy) -> Vec<AudioFrame> {
    let rate = TELEPHONY_SAMPLE_RATE as usize;
    let total = rate * duration_ms as usize / 1000;
    let fade = rate * TONE_FADE_MS as usize / 1000;

    let encoded: Vec<u8> = (0..total)
        .map(|n| {
            let t = n as f32 / rate as f32;
            let mut s = (2.0 * std::f32::consts::PI * freq_hz as f32 * t).sin() * TONE_AMPLITUDE;
            if n < fade {
                s *= n as f32 / fade as f32;
            }
            let from_end = total - 1 - n;
            if from_end < fade {
                s *= from_end as f32 / fade as f32;
            }
            linear_to_ulaw(float_to_i16(s))
        })
        .collect();

    chunk_frames(
        &encoded,
        frame_size(TELEPHONY_SAMPLE_RATE, FRAME_DURATION_MS),
        policy,
    )
}
