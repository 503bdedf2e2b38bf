//! Typed events driving a call.

use bytes::Bytes;

use super::pump::PumpOutcome;
use crate::core::audio::AudioFrame;
use crate::core::stt::RecognizerEvent;

/// Signals arriving from the telephony peer.
#[derive(Debug, Clone, PartialEq)]
pub enum TelephonyEvent {
    Connected,
    Start { stream_id: String },
    /// Decoded μ-law audio, normally 160 bytes
    Media { payload: Bytes },
    Mark { name: String },
    Stop,
    /// The transport went away
    Disconnected,
}

/// Signals the call sends toward the telephony peer.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundSignal {
    Media { stream_id: String, frame: AudioFrame },
    Mark { stream_id: String, name: String },
}

/// Completions of work the session spawned.
#[derive(Debug)]
pub enum TurnEvent {
    /// Reply text generated and rendered
    ReplyReady {
        turn: u64,
        reply: String,
        frames: Vec<AudioFrame>,
    },
    /// The frame pump returned
    PlaybackFinished { turn: u64, outcome: PumpOutcome },
}

/// Everything the session state machine reacts to.
#[derive(Debug)]
pub enum CallEvent {
    Telephony(TelephonyEvent),
    Recognizer(RecognizerEvent),
    Turn(TurnEvent),
    /// The process is shutting down
    Shutdown,
}
