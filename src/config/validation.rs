//! Configuration validation.

use super::ServerConfig;

/// Longest accepted barge-in grace period, in ms.
pub const MAX_BARGE_IN_GRACE_MS: u64 = 10_000;

/// Timers that drive pacing and heartbeats must be positive.
pub fn validate_timing(config: &ServerConfig) -> Result<(), String> {
    if config.frame_cadence_ms == 0 {
        return Err("FRAME_CADENCE_MS must be greater than 0".to_string());
    }
    if config.recognizer_keepalive_ms == 0 {
        return Err("RECOGNIZER_KEEPALIVE_MS must be greater than 0".to_string());
    }
    for (name, value) in [
        ("RECOGNIZER_CONNECT_TIMEOUT_MS", config.recognizer_connect_timeout_ms),
        ("REPLY_TIMEOUT_MS", config.reply_timeout_ms),
        ("SYNTHESIS_TIMEOUT_MS", config.synthesis_timeout_ms),
    ] {
        if value == 0 {
            return Err(format!("{name} must be greater than 0"));
        }
    }
    Ok(())
}

pub fn validate_barge_in(config: &ServerConfig) -> Result<(), String> {
    if config.barge_in_grace_ms > MAX_BARGE_IN_GRACE_MS {
        return Err(format!(
            "BARGE_IN_GRACE_MS must be at most {MAX_BARGE_IN_GRACE_MS} (got {})",
            config.barge_in_grace_ms
        ));
    }
    Ok(())
}

pub fn validate_reply(config: &ServerConfig) -> Result<(), String> {
    if !(0.0..=2.0).contains(&config.reply_temperature) {
        return Err(format!(
            "REPLY_TEMPERATURE must be within 0.0..=2.0 (got {})",
            config.reply_temperature
        ));
    }
    if config.reply_max_input_chars == 0 {
        return Err("REPLY_MAX_INPUT_CHARS must be greater than 0".to_string());
    }
    if config.reply_fallback_text.trim().is_empty() {
        return Err("REPLY_FALLBACK_TEXT must not be empty".to_string());
    }
    Ok(())
}

pub fn validate_call(config: &ServerConfig) -> Result<(), String> {
    if config.fallback_tone_ms == 0 {
        return Err("FALLBACK_TONE_MS must be greater than 0".to_string());
    }
    // Keep the tone below Nyquist at 8 kHz
    if config.fallback_tone_hz == 0 || config.fallback_tone_hz >= 4000 {
        return Err(format!(
            "FALLBACK_TONE_HZ must be within 1..4000 (got {})",
            config.fallback_tone_hz
        ));
    }
    if config.max_concurrent_calls == Some(0) {
        return Err("MAX_CONCURRENT_CALLS must be greater than 0 when set".to_string());
    }
    Ok(())
}

/// Run every check.
pub fn validate_all(config: &ServerConfig) -> Result<(), String> {
    validate_timing(config)?;
    validate_barge_in(config)?;
    validate_reply(config)?;
    validate_call(config)?;
    Ok(())
}
