//! RIFF/WAVE container decoding.
//!
//! Synthesis services hand back a tagged-chunk container at their native
//! rate. We only need the `fmt ` and `data` chunks; everything else is
//! skipped by walking the 8-byte chunk headers.

use crate::errors::{BridgeError, BridgeResult};

const FORMAT_PCM: u16 = 0x0001;
const FORMAT_IEEE_FLOAT: u16 = 0x0003;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Size of the `RIFF....WAVE` preamble.
const RIFF_HEADER_LEN: usize = 12;

/// Size of a chunk header (4-byte tag + 4-byte little-endian size).
const CHUNK_HEADER_LEN: usize = 8;

/// Decoded, downmixed audio.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Native sample rate of the container
    pub sample_rate: u32,
    /// Mono samples normalised to `[-1.0, 1.0]`
    pub samples: Vec<f32>,
}

/// Parsed `fmt ` chunk fields we care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatChunk {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleEncoding {
    Pcm16,
    Float32,
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn parse_format_chunk(body: &[u8]) -> BridgeResult<FormatChunk> {
    if body.len() < 16 {
        return Err(BridgeError::MalformedContainer(format!(
            "fmt chunk too short: {} bytes",
            body.len()
        )));
    }

    let mut audio_format = read_u16(body, 0);
    // WAVE_FORMAT_EXTENSIBLE carries the real format code in the sub-format GUID
    if audio_format == FORMAT_EXTENSIBLE && body.len() >= 26 {
        audio_format = read_u16(body, 24);
    }

    Ok(FormatChunk {
        audio_format,
        channels: read_u16(body, 2),
        sample_rate: read_u32(body, 4),
        bits_per_sample: read_u16(body, 14),
    })
}

/// Decode a WAV container into mono float samples at its native rate.
///
/// Supports 16-bit signed PCM and 32-bit IEEE float. Multi-channel input is
/// downmixed by averaging the channels of each frame. A `data` chunk whose
/// declared size runs past the end of the buffer (streamed output) is read
/// up to the available bytes.
///
/// # Errors
/// * [`BridgeError::MalformedContainer`] when the RIFF header, `fmt ` or
///   `data` chunk is missing.
/// * [`BridgeError::UnsupportedFormat`] for any other encoding/bit depth.
pub fn decode_container(bytes: &[u8]) -> BridgeResult<DecodedAudio> {
    if bytes.len() < RIFF_HEADER_LEN || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(BridgeError::MalformedContainer(
            "not a RIFF/WAVE container".to_string(),
        ));
    }

    let mut offset = RIFF_HEADER_LEN;
    let mut format: Option<FormatChunk> = None;
    let mut data: Option<&[u8]> = None;

    while offset + CHUNK_HEADER_LEN <= bytes.len() {
        let tag = &bytes[offset..offset + 4];
        let size = read_u32(bytes, offset + 4) as usize;
        let body_start = offset + CHUNK_HEADER_LEN;
        let body_end = body_start.saturating_add(size).min(bytes.len());

        match tag {
            b"fmt " => format = Some(parse_format_chunk(&bytes[body_start..body_end])?),
            b"data" => data = Some(&bytes[body_start..body_end]),
            _ => {}
        }

        // Chunks are word aligned: odd sizes carry one pad byte
        offset = body_start.saturating_add(size).saturating_add(size & 1);
    }

    let format = format
        .ok_or_else(|| BridgeError::MalformedContainer("missing fmt chunk".to_string()))?;
    let data =
        data.ok_or_else(|| BridgeError::MalformedContainer("missing data chunk".to_string()))?;

    if format.channels == 0 {
        return Err(BridgeError::MalformedContainer(
            "fmt chunk declares zero channels".to_string(),
        ));
    }

    let encoding = match (format.audio_format, format.bits_per_sample) {
        (FORMAT_PCM, 16) => SampleEncoding::Pcm16,
        (FORMAT_IEEE_FLOAT, 32) => SampleEncoding::Float32,
        (fmt, bits) => {
            return Err(BridgeError::UnsupportedFormat(format!(
                "format={fmt} bits={bits}"
            )));
        }
    };

    Ok(DecodedAudio {
        sample_rate: format.sample_rate,
        samples: downmix(data, format.channels as usize, encoding),
    })
}

fn downmix(data: &[u8], channels: usize, encoding: SampleEncoding) -> Vec<f32> {
    let bytes_per_sample = match encoding {
        SampleEncoding::Pcm16 => 2,
        SampleEncoding::Float32 => 4,
    };
    let frame_len = channels * bytes_per_sample;

    data.chunks_exact(frame_len)
        .map(|frame| {
            let sum: f32 = frame
                .chunks_exact(bytes_per_sample)
                .map(|s| match encoding {
                    SampleEncoding::Pcm16 => i16::from_le_bytes([s[0], s[1]]) as f32 / 32768.0,
                    SampleEncoding::Float32 => f32::from_le_bytes([s[0], s[1], s[2], s[3]]),
                })
                .sum();
            sum / channels as f32
        })
        .collect()
}
