//! Telephony audio codec: container decoding, resampling, μ-law companding
//! and framing.

pub mod frames;
pub mod mulaw;
pub mod pipeline;
pub mod resample;
pub mod wav;

pub use frames::{
    AudioFrame, FRAME_BYTES, FRAME_DURATION_MS, FinalFramePolicy, TELEPHONY_SAMPLE_RATE,
    chunk_frames, encode_frames, frame_size, silence_frames, tone_frames,
};
pub use mulaw::{MULAW_SILENCE, linear_to_ulaw, peak_level, ulaw_to_linear};
pub use pipeline::{AudioPipeline, EMPTY_AUDIO_SILENCE_FRAMES, RenderSettings, transcode};
pub use resample::resample;
pub use wav::{DecodedAudio, decode_container};
