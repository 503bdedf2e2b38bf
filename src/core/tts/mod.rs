mod base;
pub mod openai;

pub use base::{
    BoxedSynthesizer, DEFAULT_SYNTHESIS_MODEL, DEFAULT_SYNTHESIS_VOICE, SpeechSynthesizer,
    SynthesisConfig,
};
pub use openai::OpenAISynthesizer;
