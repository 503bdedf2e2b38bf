//! OpenAI speech synthesis client.
//!
//! - Endpoint: `POST {base_url}/audio/speech`
//! - Output: `wav` (24 kHz PCM16 mono, decoded and downsampled by the
//!   audio pipeline)

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};

use super::base::{SpeechSynthesizer, SynthesisConfig};
use crate::errors::{BridgeError, BridgeResult};

/// Longest slice of an error body carried into the error message.
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// OpenAI `audio/speech` client returning WAV containers.
pub struct OpenAISynthesizer {
    client: reqwest::Client,
    config: SynthesisConfig,
}

impl OpenAISynthesizer {
    pub fn new(config: SynthesisConfig) -> BridgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BridgeError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/speech", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISynthesizer {
    async fn synthesize(&self, text: &str) -> BridgeResult<Bytes> {
        if self.config.api_key.is_empty() {
            return Err(BridgeError::Configuration(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        }

        let body = SpeechRequest {
            model: &self.config.model,
            voice: &self.config.voice,
            input: text,
            response_format: "wav",
        };

        debug!(chars = text.chars().count(), model = %self.config.model, "Requesting speech");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail: String = detail.chars().take(ERROR_BODY_LIMIT).collect();
            warn!(%status, "Speech synthesis request failed");
            return Err(BridgeError::UpstreamUnavailable(format!(
                "speech endpoint returned {status}: {detail}"
            )));
        }

        Ok(response.bytes().await?)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
