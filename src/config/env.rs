//! Environment variable loading.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ServerConfig, TlsConfig};
use crate::core::audio::FinalFramePolicy;

/// Read a variable, treating empty values as unset.
pub(super) fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a variable, falling back to `default` when unset.
pub(super) fn env_parse<T>(name: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid value for {name} ('{raw}'): {e}")),
        None => Ok(default),
    }
}

/// Parse an optional variable.
pub(super) fn env_parse_opt<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| format!("Invalid value for {name} ('{raw}'): {e}"))
        })
        .transpose()
}

/// Parse a boolean accepting `true/false`, `1/0`, `yes/no`, `on/off`.
pub(super) fn env_bool(name: &str, default: bool) -> Result<bool, String> {
    match env_string(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(format!("Invalid boolean for {name}: '{raw}'")),
        },
        None => Ok(default),
    }
}

/// Build a configuration from environment variables and defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let defaults = ServerConfig::default();

    let tls = match (env_string("TLS_CERT_PATH"), env_string("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        (None, None) => None,
        _ => return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into()),
    };

    let mut config = ServerConfig::default();
    config.host = env_string("HOST").unwrap_or(defaults.host.clone());
    config.port = env_parse("PORT", defaults.port)?;
    config.tls = tls;

    config.deepgram_api_key = env_string("DEEPGRAM_API_KEY");
    config.recognizer_url = env_string("DEEPGRAM_URL").unwrap_or(defaults.recognizer_url.clone());
    config.recognizer_keepalive_ms =
        env_parse("RECOGNIZER_KEEPALIVE_MS", defaults.recognizer_keepalive_ms)?;
    config.recognizer_connect_timeout_ms = env_parse(
        "RECOGNIZER_CONNECT_TIMEOUT_MS",
        defaults.recognizer_connect_timeout_ms,
    )?;
    config.recognizer_endpointing_ms =
        env_parse("RECOGNIZER_ENDPOINTING_MS", defaults.recognizer_endpointing_ms)?;

    config.openai_api_key = env_string("OPENAI_API_KEY");
    config.openai_base_url =
        env_string("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url.clone());

    config.reply_model = env_string("OPENAI_MODEL").unwrap_or(defaults.reply_model.clone());
    config.reply_timeout_ms = env_parse("REPLY_TIMEOUT_MS", defaults.reply_timeout_ms)?;
    config.reply_max_input_chars =
        env_parse("REPLY_MAX_INPUT_CHARS", defaults.reply_max_input_chars)?;
    config.reply_max_tokens = env_parse("REPLY_MAX_TOKENS", defaults.reply_max_tokens)?;
    config.reply_temperature = env_parse("REPLY_TEMPERATURE", defaults.reply_temperature)?;
    config.reply_system_prompt =
        env_string("REPLY_SYSTEM_PROMPT").unwrap_or(defaults.reply_system_prompt.clone());
    config.reply_fallback_text =
        env_string("REPLY_FALLBACK_TEXT").unwrap_or(defaults.reply_fallback_text.clone());

    config.synthesis_model =
        env_string("OPENAI_TTS_MODEL").unwrap_or(defaults.synthesis_model.clone());
    config.synthesis_voice =
        env_string("OPENAI_TTS_VOICE").unwrap_or(defaults.synthesis_voice.clone());
    config.synthesis_timeout_ms =
        env_parse("SYNTHESIS_TIMEOUT_MS", defaults.synthesis_timeout_ms)?;

    config.barge_in_enabled = env_bool("BARGE_IN_ENABLED", defaults.barge_in_enabled)?;
    config.barge_in_grace_ms = env_parse("BARGE_IN_GRACE_MS", defaults.barge_in_grace_ms)?;
    config.barge_in_min_level = env_parse("BARGE_IN_MIN_LEVEL", defaults.barge_in_min_level)?;

    config.frame_cadence_ms = env_parse("FRAME_CADENCE_MS", defaults.frame_cadence_ms)?;
    config.final_frame_policy = env_parse::<FinalFramePolicy>(
        "FINAL_FRAME_POLICY",
        defaults.final_frame_policy,
    )?;
    config.fallback_tone_ms = env_parse("FALLBACK_TONE_MS", defaults.fallback_tone_ms)?;
    config.fallback_tone_hz = env_parse("FALLBACK_TONE_HZ", defaults.fallback_tone_hz)?;
    config.max_concurrent_calls = env_parse_opt("MAX_CONCURRENT_CALLS")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_parse_helpers() {
        unsafe {
            env::set_var("CALLBRIDGE_TEST_NUM", " 42 ");
            env::set_var("CALLBRIDGE_TEST_BAD", "forty");
            env::set_var("CALLBRIDGE_TEST_EMPTY", "");
            env::set_var("CALLBRIDGE_TEST_BOOL", "off");
        }

        assert_eq!(env_parse("CALLBRIDGE_TEST_NUM", 0u32), Ok(42));
        assert!(
            env_parse("CALLBRIDGE_TEST_BAD", 0u32)
                .unwrap_err()
                .contains("CALLBRIDGE_TEST_BAD")
        );
        assert_eq!(env_parse("CALLBRIDGE_TEST_EMPTY", 7u32), Ok(7));
        assert_eq!(env_parse_opt::<usize>("CALLBRIDGE_TEST_UNSET"), Ok(None));
        assert_eq!(env_bool("CALLBRIDGE_TEST_BOOL", true), Ok(false));
        assert_eq!(env_bool("CALLBRIDGE_TEST_UNSET", true), Ok(true));

        unsafe {
            env::remove_var("CALLBRIDGE_TEST_NUM");
            env::remove_var("CALLBRIDGE_TEST_BAD");
            env::remove_var("CALLBRIDGE_TEST_EMPTY");
            env::remove_var("CALLBRIDGE_TEST_BOOL");
        }
    }
}
