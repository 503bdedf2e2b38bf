//! Shared test doubles and fixtures
//!
//! In-process stand-ins for the recognizer, reply and synthesis services,
//! plus WAV builders for codec tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use waav_callbridge::BridgeError;
use waav_callbridge::core::audio::{AudioPipeline, RenderSettings};
use waav_callbridge::core::call::{CallServices, CallSettings};
use waav_callbridge::core::llm::ReplyGenerator;
use waav_callbridge::core::stt::{BoxedRecognizer, Recognizer, RecognizerEvent, RecognizerFactory};
use waav_callbridge::core::tts::SpeechSynthesizer;
use waav_callbridge::errors::BridgeResult;

// =============================================================================
// WAV fixtures
// =============================================================================

/// 16-bit PCM container with interleaved samples.
pub fn pcm16_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// 32-bit float container with interleaved samples.
pub fn float32_wav(sample_rate: u32, channels: u16, samples: &[f32]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// 24-bit PCM container, which the codec does not decode.
pub fn pcm24_wav(sample_rate: u32, samples: &[i32]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 24,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Mono sine wave as 16-bit samples.
pub fn sine_i16(sample_rate: u32, duration_ms: u32, freq_hz: f32, amplitude: f32) -> Vec<i16> {
    let count = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
    (0..count)
        .map(|n| {
            let t = n as f32 / sample_rate as f32;
            let value = (2.0 * std::f32::consts::PI * freq_hz * t).sin() * amplitude;
            (value * i16::MAX as f32) as i16
        })
        .collect()
}

// =============================================================================
// Reply generation
// =============================================================================

/// Answers every transcript with the same text after an optional delay.
pub struct ScriptedReplies {
    reply: String,
    delay: Duration,
    seen: Mutex<Vec<String>>,
}

impl ScriptedReplies {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Transcripts received so far, in order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyGenerator for ScriptedReplies {
    async fn reply(&self, text: &str) -> String {
        self.seen.lock().unwrap().push(text.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone()
    }
}

// =============================================================================
// Speech synthesis
// =============================================================================

pub enum SynthBehaviour {
    /// Return this container
    Container(Bytes),
    /// Fail with an upstream error
    Fail,
}

pub struct StubSynthesizer {
    behaviour: SynthBehaviour,
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl StubSynthesizer {
    pub fn new(behaviour: SynthBehaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }

    /// Synthesis returning `duration_ms` of 8 kHz tone.
    pub fn tone(duration_ms: u32) -> Self {
        let samples = sine_i16(8000, duration_ms, 440.0, 0.5);
        Self::new(SynthBehaviour::Container(Bytes::from(pcm16_wav(
            8000, 1, &samples,
        ))))
    }

    pub fn failing() -> Self {
        Self::new(SynthBehaviour::Fail)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts asked to be spoken, in order.
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, text: &str) -> BridgeResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());
        match &self.behaviour {
            SynthBehaviour::Container(bytes) => Ok(bytes.clone()),
            SynthBehaviour::Fail => Err(BridgeError::UpstreamUnavailable(
                "synthesis stub failure".to_string(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

// =============================================================================
// Recognizer
// =============================================================================

/// Shared view into every recognizer a factory hands out.
#[derive(Default)]
pub struct RecognizerProbe {
    pub fail_open: AtomicBool,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub audio_chunks: AtomicUsize,
    events: Mutex<Option<mpsc::Sender<RecognizerEvent>>>,
}

impl RecognizerProbe {
    pub fn failing() -> Self {
        let probe = Self::default();
        probe.fail_open.store(true, Ordering::SeqCst);
        probe
    }

    pub fn audio_chunks(&self) -> usize {
        self.audio_chunks.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Push an event as if the recognizer service had produced it.
    pub async fn emit(&self, event: RecognizerEvent) {
        let tx = self.events.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    pub async fn transcript(&self, text: &str) {
        self.emit(RecognizerEvent::FinalTranscript(text.to_string()))
            .await;
    }
}

pub struct MockRecognizer {
    probe: Arc<RecognizerProbe>,
    open: bool,
}

#[async_trait]
impl Recognizer for MockRecognizer {
    async fn open(&mut self, events: mpsc::Sender<RecognizerEvent>) -> BridgeResult<()> {
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail_open.load(Ordering::SeqCst) {
            return Err(BridgeError::UpstreamUnavailable(
                "recognizer stub refused".to_string(),
            ));
        }
        *self.probe.events.lock().unwrap() = Some(events);
        self.open = true;
        Ok(())
    }

    fn send_audio(&self, _audio: Bytes) {
        if self.open {
            self.probe.audio_chunks.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn close(&mut self) {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
        self.open = false;
        self.probe.events.lock().unwrap().take();
    }
}

pub fn recognizer_factory(probe: Arc<RecognizerProbe>) -> RecognizerFactory {
    Arc::new(move || -> BoxedRecognizer {
        Box::new(MockRecognizer {
            probe: probe.clone(),
            open: false,
        })
    })
}

// =============================================================================
// Wiring
// =============================================================================

pub fn services(
    replies: Arc<ScriptedReplies>,
    synthesizer: Arc<StubSynthesizer>,
    probe: Arc<RecognizerProbe>,
) -> CallServices {
    CallServices {
        replies,
        audio: Arc::new(AudioPipeline::new(synthesizer, RenderSettings::default())),
        recognizers: recognizer_factory(probe),
    }
}

pub fn default_settings() -> CallSettings {
    CallSettings::default()
}
