use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Persona sent as the system turn of every request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a kind, patient phone companion. Keep replies short \
(1-2 sentences), friendly, and spoken-language natural. Prefer reflective listening and gentle \
encouragement.";

/// Spoken when the reply service fails or times out.
pub const DEFAULT_FALLBACK_REPLY: &str = "Sorry, I'm having trouble thinking right now.";

/// Spoken when no reply credentials are configured.
pub const UNCONFIGURED_REPLY: &str = "I hear you. How can I help?";

/// Spoken when the service answers with empty content.
pub const EMPTY_REPLY: &str = "Okay.";

/// Settings for the reply gateway.
#[derive(Clone)]
pub struct ReplyConfig {
    /// API key; empty means unconfigured
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub fallback_text: String,
    /// Caller text is cut to this many characters before submission
    pub max_input_chars: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            fallback_text: DEFAULT_FALLBACK_REPLY.to_string(),
            max_input_chars: 800,
            max_tokens: 120,
            temperature: 0.6,
            timeout: Duration::from_millis(8_000),
        }
    }
}

impl std::fmt::Debug for ReplyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_input_chars", &self.max_input_chars)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Text in, text out. Infallible: failures become a fallback phrase.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn reply(&self, text: &str) -> String;
}

pub type BoxedReplyGenerator = Arc<dyn ReplyGenerator>;

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
