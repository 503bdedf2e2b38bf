mod base;
pub mod deepgram;

pub use base::{
    BoxedRecognizer, DEFAULT_RECOGNIZER_URL, Recognizer, RecognizerConfig, RecognizerEvent,
    RecognizerFactory,
};
pub use deepgram::DeepgramRecognizer;
