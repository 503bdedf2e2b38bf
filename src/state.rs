//! Shared application state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::audio::AudioPipeline;
use crate::core::call::{CallServices, CallSettings, SessionRegistry};
use crate::core::llm::OpenAIReplyGateway;
use crate::core::stt::{BoxedRecognizer, DeepgramRecognizer, RecognizerFactory};
use crate::core::tts::OpenAISynthesizer;
use crate::errors::BridgeResult;

/// State shared by every handler.
pub struct AppState {
    pub config: ServerConfig,
    pub registry: Arc<SessionRegistry>,
    pub services: CallServices,
    pub settings: CallSettings,
}

impl AppState {
    /// Build the production collaborators from configuration.
    pub async fn new(config: ServerConfig) -> BridgeResult<Arc<Self>> {
        if config.deepgram_api_key.is_none() {
            warn!("DEEPGRAM_API_KEY not set, calls will connect but transcribe nothing");
        }
        if config.openai_api_key.is_none() {
            warn!("OPENAI_API_KEY not set, replies fall back to a canned response");
        }

        let replies = Arc::new(OpenAIReplyGateway::new(config.reply_config())?);
        let synthesizer = Arc::new(OpenAISynthesizer::new(config.synthesis_config())?);
        let audio = Arc::new(AudioPipeline::new(synthesizer, config.render_settings()));

        let recognizer_config = config.recognizer_config();
        let recognizers: RecognizerFactory = Arc::new(move || -> BoxedRecognizer {
            Box::new(DeepgramRecognizer::new(recognizer_config.clone()))
        });

        let services = CallServices {
            replies,
            audio,
            recognizers,
        };

        info!(
            max_calls = ?config.max_concurrent_calls,
            barge_in = ?config.call_settings().barge_in,
            "Call services ready"
        );

        Ok(Self::with_components(config, services))
    }

    /// Assemble state from already-built services.
    pub fn with_components(config: ServerConfig, services: CallServices) -> Arc<Self> {
        let registry = Arc::new(SessionRegistry::new(config.max_concurrent_calls));
        let settings = config.call_settings();
        Arc::new(Self {
            config,
            registry,
            services,
            settings,
        })
    }
}
