//! OpenAI chat-completion reply gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::base::{EMPTY_REPLY, ReplyConfig, ReplyGenerator, UNCONFIGURED_REPLY, truncate_chars};
use crate::errors::{BridgeError, BridgeResult};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Reply gateway backed by `POST {base_url}/chat/completions`.
pub struct OpenAIReplyGateway {
    client: reqwest::Client,
    config: ReplyConfig,
}

impl OpenAIReplyGateway {
    pub fn new(config: ReplyConfig) -> BridgeResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BridgeError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ReplyConfig {
        &self.config
    }

    async fn request_reply(&self, text: &str) -> BridgeResult<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: truncate_chars(text, self.config.max_input_chars),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BridgeError::UpstreamUnavailable(format!(
                "chat endpoint returned {status}: {}",
                truncate_chars(&detail, 300)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::UpstreamUnavailable(format!("malformed reply: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            Ok(EMPTY_REPLY.to_string())
        } else {
            Ok(content)
        }
    }
}

#[async_trait]
impl ReplyGenerator for OpenAIReplyGateway {
    async fn reply(&self, text: &str) -> String {
        if self.config.api_key.is_empty() {
            debug!("No reply credentials configured, using neutral reply");
            return UNCONFIGURED_REPLY.to_string();
        }

        match timeout(self.config.timeout, self.request_reply(text)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(error = %e, "Reply generation failed, using fallback");
                self.config.fallback_text.clone()
            }
            Err(_) => {
                warn!(timeout = ?self.config.timeout, "Reply generation timed out, using fallback");
                self.config.fallback_text.clone()
            }
        }
    }
}
