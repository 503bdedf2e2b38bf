//! G.711 μ-law companding.
//!
//! Telephony media streams carry 8 kHz mono audio compressed to one byte per
//! sample with the μ-law logarithmic law. Encoding is a pure per-sample
//! function: the same 16-bit input always yields the same byte.

/// Bias added to the magnitude before the segment search.
const BIAS: i32 = 0x84;

/// Largest magnitude that survives biasing without overflowing 15 bits.
const CLIP: i32 = 32635;

/// Encoded value of a zero-amplitude sample.
pub const MULAW_SILENCE: u8 = 0xFF;

/// Replacement for the all-zero code, which some decoders mishandle.
pub const ZERO_CODE_SENTINEL: u8 = 0x02;

/// Compand one signed 16-bit linear sample into a μ-law byte.
///
/// Never returns `0x00`; that code is remapped to [`ZERO_CODE_SENTINEL`].
#[inline]
pub fn linear_to_ulaw(sample: i16) -> u8 {
    let mut magnitude = sample as i32;
    let sign: i32 = if magnitude < 0 { 0x80 } else { 0x00 };
    if magnitude < 0 {
        magnitude = -magnitude;
    }
    if magnitude > CLIP {
        magnitude = CLIP;
    }
    magnitude += BIAS;

    let mut exponent: i32 = 7;
    let mut mask: i32 = 0x4000;
    while magnitude & mask == 0 && exponent > 0 {
        exponent -= 1;
        mask >>= 1;
    }

    let mantissa = (magnitude >> (exponent + 3)) & 0x0F;
    let code = !(sign | (exponent << 4) | mantissa) as u8;

    if code == 0 { ZERO_CODE_SENTINEL } else { code }
}

/// Expand a μ-law byte back to a signed 16-bit linear sample.
#[inline]
pub fn ulaw_to_linear(code: u8) -> i16 {
    let code = !code as i32;
    let sign = code & 0x80;
    let exponent = (code & 0x70) >> 4;
    let mantissa = code & 0x0F;

    let magnitude = (((mantissa << 3) + BIAS) << exponent) - BIAS;
    if sign != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Convert a normalised float sample in `[-1.0, 1.0]` to 16-bit PCM.
#[inline]
pub fn float_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).round().clamp(-32768.0, 32767.0) as i16
}

/// Compand a buffer of normalised float samples into μ-law bytes.
pub fn encode_samples(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .map(|&s| linear_to_ulaw(float_to_i16(s)))
        .collect()
}

/// Peak absolute linear amplitude of a μ-law buffer.
///
/// Used to gate barge-in on caller loudness.
pub fn peak_level(encoded: &[u8]) -> u16 {
    encoded
        .iter()
        .map(|&b| ulaw_to_linear(b).unsigned_abs())
        .max()
        .unwrap_or(0)
}
