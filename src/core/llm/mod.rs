mod base;
pub mod openai;

pub use base::{
    BoxedReplyGenerator, DEFAULT_FALLBACK_REPLY, DEFAULT_SYSTEM_PROMPT, EMPTY_REPLY, ReplyConfig,
    ReplyGenerator, UNCONFIGURED_REPLY, truncate_chars,
};
pub use openai::OpenAIReplyGateway;
