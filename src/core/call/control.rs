//! Per-utterance cancellation.
//!
//! Every reply gets a fresh [`SpeakingControl`] (held by the session, the
//! only writer) paired with one [`AbortSignal`] (moved into the frame pump,
//! the only reader). Neither half is `Clone`, so a flag can never outlive
//! or be shared across utterances.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Writer half: aborts playback and anchors the barge-in grace period.
#[derive(Debug)]
pub struct SpeakingControl {
    aborted: Arc<AtomicBool>,
    started_at: Instant,
}

/// Reader half observed by the frame pump between frames.
#[derive(Debug)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
}

impl SpeakingControl {
    /// Start a new utterance now.
    pub fn start() -> (Self, AbortSignal) {
        let aborted = Arc::new(AtomicBool::new(false));
        (
            Self {
                aborted: aborted.clone(),
                started_at: Instant::now(),
            },
            AbortSignal { aborted },
        )
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}
