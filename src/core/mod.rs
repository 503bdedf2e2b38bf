pub mod audio;
pub mod call;
pub mod llm;
pub mod stt;
pub mod tts;

// Re-export commonly used types for convenience
pub use audio::{AudioFrame, AudioPipeline, FinalFramePolicy, RenderSettings};
pub use call::{
    BargeInPolicy, CallServices, CallSession, CallSettings, FramePump, SessionRegistry, TurnState,
};
pub use llm::{OpenAIReplyGateway, ReplyConfig, ReplyGenerator};
pub use stt::{DeepgramRecognizer, Recognizer, RecognizerConfig, RecognizerEvent, RecognizerFactory};
pub use tts::{OpenAISynthesizer, SpeechSynthesizer, SynthesisConfig};
