//! Process-wide table of live calls.
//!
//! Owned by the application state and handed to the connection handler;
//! entries live exactly as long as their telephony connection.

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::errors::{BridgeError, BridgeResult};

/// Where a call is in its turn-taking cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnState {
    /// Connected, no stream yet
    Idle,
    /// Stream open, no reply playing
    Listening,
    /// Reply audio being delivered
    Speaking,
    Closed,
}

impl TurnState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Listening => 1,
            Self::Speaking => 2,
            Self::Closed => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Listening,
            2 => Self::Speaking,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Speaking => "speaking",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Shared view of one call. The session's own worker is the only writer.
#[derive(Debug)]
pub struct SessionHandle {
    call_id: String,
    created_at: Instant,
    stream_id: OnceLock<String>,
    state: AtomicU8,
    shutdown: CancellationToken,
}

impl SessionHandle {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            created_at: Instant::now(),
            stream_id: OnceLock::new(),
            state: AtomicU8::new(TurnState::Idle.as_u8()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.get().map(String::as_str)
    }

    /// Record the telephony stream id. Returns false if one was already set.
    pub fn set_stream_id(&self, stream_id: impl Into<String>) -> bool {
        self.stream_id.set(stream_id.into()).is_ok()
    }

    pub fn state(&self) -> TurnState {
        TurnState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: TurnState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Token cancelled when the process asks the call to end.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            call_id: self.call_id.clone(),
            stream_id: self.stream_id().map(str::to_string),
            state: self.state(),
            age_ms: self.created_at.elapsed().as_millis() as u64,
        }
    }
}

/// Serializable snapshot of a live call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub call_id: String,
    pub stream_id: Option<String>,
    pub state: TurnState,
    pub age_ms: u64,
}

/// Call id to session table.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SessionHandle>>,
    /// Slots taken, reserved before the insert so the cap holds under races
    live: AtomicUsize,
    max_sessions: Option<usize>,
}

impl SessionRegistry {
    pub fn new(max_sessions: Option<usize>) -> Self {
        Self {
            sessions: DashMap::new(),
            live: AtomicUsize::new(0),
            max_sessions,
        }
    }

    /// Allocate a call id and register its handle.
    pub fn create(&self) -> BridgeResult<Arc<SessionHandle>> {
        let max = self.max_sessions.unwrap_or(usize::MAX);
        if self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < max).then_some(live + 1)
            })
            .is_err()
        {
            return Err(BridgeError::CapacityExceeded(max));
        }

        let handle = Arc::new(SessionHandle::new(Uuid::new_v4().to_string()));
        self.sessions
            .insert(handle.call_id().to_string(), handle.clone());
        info!(call_id = %handle.call_id(), live = self.sessions.len(), "Call registered");
        Ok(handle)
    }

    pub fn get(&self, call_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(call_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, call_id: &str) -> Option<Arc<SessionHandle>> {
        let removed = self.sessions.remove(call_id).map(|(_, handle)| handle);
        if removed.is_some() {
            self.live.fetch_sub(1, Ordering::AcqRel);
            info!(call_id, live = self.sessions.len(), "Call released");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshot of every live call, oldest first.
    pub fn snapshot(&self) -> Vec<SessionInfo> {
        let mut calls: Vec<SessionInfo> = self
            .sessions
            .iter()
            .map(|entry| entry.value().info())
            .collect();
        calls.sort_by(|a, b| b.age_ms.cmp(&a.age_ms));
        calls
    }

    /// Ask every live call to end.
    pub fn shutdown_all(&self) {
        for entry in self.sessions.iter() {
            entry.value().shutdown_token().cancel();
        }
    }
}
