//! Merge YAML overrides onto the environment-derived configuration.

use std::path::PathBuf;

use super::yaml::YamlConfig;
use super::{ServerConfig, TlsConfig, env};

/// Build the final configuration: environment (and defaults) first, then
/// every value present in the YAML file replaces it.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = env::load_from_env()?;
    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(tls) = server.tls {
            if tls.enabled == Some(false) {
                config.tls = None;
            } else {
                match (tls.cert_path, tls.key_path) {
                    (Some(cert), Some(key)) => {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert),
                            key_path: PathBuf::from(key),
                        });
                    }
                    (None, None) => {}
                    _ => return Err("server.tls requires both cert_path and key_path".into()),
                }
            }
        }
    }

    if let Some(providers) = yaml.providers {
        if providers.deepgram_api_key.is_some() {
            config.deepgram_api_key = providers.deepgram_api_key;
        }
        if providers.openai_api_key.is_some() {
            config.openai_api_key = providers.openai_api_key;
        }
        if let Some(url) = providers.openai_base_url {
            config.openai_base_url = url;
        }
    }

    if let Some(recognizer) = yaml.recognizer {
        if let Some(url) = recognizer.url {
            config.recognizer_url = url;
        }
        if let Some(ms) = recognizer.keepalive_ms {
            config.recognizer_keepalive_ms = ms;
        }
        if let Some(ms) = recognizer.connect_timeout_ms {
            config.recognizer_connect_timeout_ms = ms;
        }
        if let Some(ms) = recognizer.endpointing_ms {
            config.recognizer_endpointing_ms = ms;
        }
    }

    if let Some(reply) = yaml.reply {
        if let Some(model) = reply.model {
            config.reply_model = model;
        }
        if let Some(ms) = reply.timeout_ms {
            config.reply_timeout_ms = ms;
        }
        if let Some(chars) = reply.max_input_chars {
            config.reply_max_input_chars = chars;
        }
        if let Some(tokens) = reply.max_tokens {
            config.reply_max_tokens = tokens;
        }
        if let Some(temperature) = reply.temperature {
            config.reply_temperature = temperature;
        }
        if let Some(prompt) = reply.system_prompt {
            config.reply_system_prompt = prompt;
        }
        if let Some(text) = reply.fallback_text {
            config.reply_fallback_text = text;
        }
    }

    if let Some(synthesis) = yaml.synthesis {
        if let Some(model) = synthesis.model {
            config.synthesis_model = model;
        }
        if let Some(voice) = synthesis.voice {
            config.synthesis_voice = voice;
        }
        if let Some(ms) = synthesis.timeout_ms {
            config.synthesis_timeout_ms = ms;
        }
    }

    if let Some(call) = yaml.call {
        if let Some(ms) = call.frame_cadence_ms {
            config.frame_cadence_ms = ms;
        }
        if let Some(policy) = call.final_frame_policy {
            config.final_frame_policy = policy;
        }
        if let Some(ms) = call.fallback_tone_ms {
            config.fallback_tone_ms = ms;
        }
        if let Some(hz) = call.fallback_tone_hz {
            config.fallback_tone_hz = hz;
        }
        if call.max_concurrent_calls.is_some() {
            config.max_concurrent_calls = call.max_concurrent_calls;
        }
        if let Some(barge_in) = call.barge_in {
            if let Some(enabled) = barge_in.enabled {
                config.barge_in_enabled = enabled;
            }
            if let Some(ms) = barge_in.grace_ms {
                config.barge_in_grace_ms = ms;
            }
            if let Some(level) = barge_in.min_level {
                config.barge_in_min_level = level;
            }
        }
    }

    Ok(config)
}
