use serde::Deserialize;
use std::path::PathBuf;

use crate::core::audio::FinalFramePolicy;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present
/// here override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 10000
///   tls:
///     cert_path: "/etc/callbridge/cert.pem"
///     key_path: "/etc/callbridge/key.pem"
///
/// providers:
///   deepgram_api_key: "your-deepgram-key"
///   openai_api_key: "your-openai-key"
///   openai_base_url: "https://api.openai.com/v1"
///
/// recognizer:
///   url: "wss://api.deepgram.com/v1/listen"
///   keepalive_ms: 5000
///   connect_timeout_ms: 10000
///   endpointing_ms: 200
///
/// reply:
///   model: "gpt-4o-mini"
///   timeout_ms: 8000
///   max_input_chars: 800
///   max_tokens: 120
///   temperature: 0.6
///   system_prompt: "You are a kind, patient phone companion."
///   fallback_text: "Sorry, I'm having trouble thinking right now."
///
/// synthesis:
///   model: "gpt-4o-mini-tts"
///   voice: "alloy"
///   timeout_ms: 10000
///
/// call:
///   frame_cadence_ms: 20
///   final_frame_policy: pad
///   fallback_tone_ms: 400
///   fallback_tone_hz: 600
///   max_concurrent_calls: 200
///   barge_in:
///     enabled: true
///     grace_ms: 600
///     min_level: 0
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub recognizer: Option<RecognizerYaml>,
    pub reply: Option<ReplyYaml>,
    pub synthesis: Option<SynthesisYaml>,
    pub call: Option<CallYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Provider credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub deepgram_api_key: Option<String>,
    /// Used for both reply generation and speech synthesis
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RecognizerYaml {
    pub url: Option<String>,
    pub keepalive_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub endpointing_ms: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReplyYaml {
    pub model: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_input_chars: Option<usize>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
    pub fallback_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisYaml {
    pub model: Option<String>,
    pub voice: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Per-call behaviour from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CallYaml {
    pub frame_cadence_ms: Option<u64>,
    pub final_frame_policy: Option<FinalFramePolicy>,
    pub fallback_tone_ms: Option<u32>,
    pub fallback_tone_hz: Option<u32>,
    pub max_concurrent_calls: Option<usize>,
    pub barge_in: Option<BargeInYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BargeInYaml {
    pub enabled: Option<bool>,
    pub grace_ms: Option<u64>,
    pub min_level: Option<u16>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
