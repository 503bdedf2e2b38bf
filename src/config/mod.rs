//! Configuration module for the call bridge server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use waav_callbridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
pub mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::audio::{FinalFramePolicy, RenderSettings};
use crate::core::call::{BargeInPolicy, CallSettings};
use crate::core::llm::{DEFAULT_FALLBACK_REPLY, DEFAULT_SYSTEM_PROMPT, ReplyConfig};
use crate::core::stt::{DEFAULT_RECOGNIZER_URL, RecognizerConfig};
use crate::core::tts::{DEFAULT_SYNTHESIS_MODEL, DEFAULT_SYNTHESIS_VOICE, SynthesisConfig};

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything needed to run the call bridge:
/// - Server settings (host, port, TLS)
/// - Recognizer, reply and synthesis service settings
/// - Per-call behaviour (barge-in, pacing, fallback audio, capacity)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Recognizer
    pub deepgram_api_key: Option<String>,
    pub recognizer_url: String,
    pub recognizer_keepalive_ms: u64,
    pub recognizer_connect_timeout_ms: u64,
    pub recognizer_endpointing_ms: u32,

    /// OpenAI API key for reply generation and speech synthesis
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,

    // Reply generation
    pub reply_model: String,
    pub reply_timeout_ms: u64,
    pub reply_max_input_chars: usize,
    pub reply_max_tokens: u32,
    pub reply_temperature: f32,
    pub reply_system_prompt: String,
    pub reply_fallback_text: String,

    // Speech synthesis
    pub synthesis_model: String,
    pub synthesis_voice: String,
    pub synthesis_timeout_ms: u64,

    // Per-call behaviour
    pub barge_in_enabled: bool,
    pub barge_in_grace_ms: u64,
    /// Minimum peak amplitude that counts as barge-in; 0 accepts any audio
    pub barge_in_min_level: u16,
    pub frame_cadence_ms: u64,
    pub final_frame_policy: FinalFramePolicy,
    pub fallback_tone_ms: u32,
    pub fallback_tone_hz: u32,
    /// Maximum live calls. None means unlimited
    pub max_concurrent_calls: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            tls: None,
            deepgram_api_key: None,
            recognizer_url: DEFAULT_RECOGNIZER_URL.to_string(),
            recognizer_keepalive_ms: 5_000,
            recognizer_connect_timeout_ms: 10_000,
            recognizer_endpointing_ms: 200,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            reply_model: "gpt-4o-mini".to_string(),
            reply_timeout_ms: 8_000,
            reply_max_input_chars: 800,
            reply_max_tokens: 120,
            reply_temperature: 0.6,
            reply_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            reply_fallback_text: DEFAULT_FALLBACK_REPLY.to_string(),
            synthesis_model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            synthesis_voice: DEFAULT_SYNTHESIS_VOICE.to_string(),
            synthesis_timeout_ms: 10_000,
            barge_in_enabled: true,
            barge_in_grace_ms: 600,
            barge_in_min_level: 0,
            frame_cadence_ms: 20,
            final_frame_policy: FinalFramePolicy::Pad,
            fallback_tone_ms: 400,
            fallback_tone_hz: 600,
            max_concurrent_calls: None,
        }
    }
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.deepgram_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values (loaded in main.rs)
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate_all(&config)?;
        Ok(config)
    }

    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate_all(&config)?;
        Ok(config)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    pub fn recognizer_config(&self) -> RecognizerConfig {
        RecognizerConfig {
            api_key: self.deepgram_api_key.clone().unwrap_or_default(),
            url: self.recognizer_url.clone(),
            sample_rate: crate::core::audio::TELEPHONY_SAMPLE_RATE,
            channels: 1,
            endpointing_ms: self.recognizer_endpointing_ms,
            keepalive: Duration::from_millis(self.recognizer_keepalive_ms),
            connect_timeout: Duration::from_millis(self.recognizer_connect_timeout_ms),
        }
    }

    pub fn reply_config(&self) -> ReplyConfig {
        ReplyConfig {
            api_key: self.openai_api_key.clone().unwrap_or_default(),
            base_url: self.openai_base_url.clone(),
            model: self.reply_model.clone(),
            system_prompt: self.reply_system_prompt.clone(),
            fallback_text: self.reply_fallback_text.clone(),
            max_input_chars: self.reply_max_input_chars,
            max_tokens: self.reply_max_tokens,
            temperature: self.reply_temperature,
            timeout: Duration::from_millis(self.reply_timeout_ms),
        }
    }

    pub fn synthesis_config(&self) -> SynthesisConfig {
        SynthesisConfig {
            api_key: self.openai_api_key.clone().unwrap_or_default(),
            base_url: self.openai_base_url.clone(),
            model: self.synthesis_model.clone(),
            voice: self.synthesis_voice.clone(),
            timeout: Duration::from_millis(self.synthesis_timeout_ms),
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            frame_ms: crate::core::audio::FRAME_DURATION_MS,
            final_frame_policy: self.final_frame_policy,
            synthesis_timeout: Duration::from_millis(self.synthesis_timeout_ms),
            fallback_tone_ms: self.fallback_tone_ms,
            fallback_tone_hz: self.fallback_tone_hz,
        }
    }

    pub fn call_settings(&self) -> CallSettings {
        CallSettings {
            barge_in: BargeInPolicy::from_settings(
                self.barge_in_enabled,
                Duration::from_millis(self.barge_in_grace_ms),
                self.barge_in_min_level,
            ),
            frame_cadence: Duration::from_millis(self.frame_cadence_ms),
        }
    }
}
