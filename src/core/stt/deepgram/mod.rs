mod client;
mod messages;

pub use client::{DeepgramRecognizer, build_listen_url};
pub use messages::{CloseStreamMessage, KeepAliveMessage, final_transcript};
