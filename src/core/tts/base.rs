use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::BridgeResult;

/// Default synthesis model.
pub const DEFAULT_SYNTHESIS_MODEL: &str = "gpt-4o-mini-tts";

/// Default synthesis voice.
pub const DEFAULT_SYNTHESIS_VOICE: &str = "alloy";

/// Settings for a speech synthesis client.
#[derive(Clone)]
pub struct SynthesisConfig {
    /// API key; empty means unconfigured
    pub api_key: String,
    /// Base URL of the API, without trailing slash
    pub base_url: String,
    pub model: String,
    pub voice: String,
    /// Bound on one synthesis request
    pub timeout: Duration,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            voice: DEFAULT_SYNTHESIS_VOICE.to_string(),
            timeout: Duration::from_millis(10_000),
        }
    }
}

impl std::fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Text in, audio container out.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into a RIFF/WAVE container at the service's native
    /// rate.
    async fn synthesize(&self, text: &str) -> BridgeResult<Bytes>;

    /// Provider name for logs.
    fn name(&self) -> &'static str;
}

pub type BoxedSynthesizer = Arc<dyn SpeechSynthesizer>;
