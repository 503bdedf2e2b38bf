//! Per-call orchestration.
//!
//! A [`CallSession`] runs on its own task and is the only code that mutates
//! its call's state. Every input (telephony signals, recognizer events and
//! completions of the work it spawns) arrives as a [`CallEvent`] and is
//! applied by [`CallSession::on_event`], which holds the whole transition
//! table.
//!
//! Turns never overlap: while one transcript is being answered (reply,
//! rendering, playback) later transcripts wait in a FIFO queue.

use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use super::barge_in::BargeInPolicy;
use super::control::SpeakingControl;
use super::events::{CallEvent, OutboundSignal, TelephonyEvent, TurnEvent};
use super::pump::{FramePump, PumpOutcome};
use super::registry::{SessionHandle, TurnState};
use super::sink::ChannelSink;
use crate::core::audio::{AudioFrame, AudioPipeline, FRAME_DURATION_MS};
use crate::core::llm::BoxedReplyGenerator;
use crate::core::stt::{BoxedRecognizer, RecognizerEvent, RecognizerFactory};

const RECOGNIZER_EVENT_CAPACITY: usize = 64;
const TURN_EVENT_CAPACITY: usize = 8;

/// Shared collaborators every call uses.
#[derive(Clone)]
pub struct CallServices {
    pub replies: BoxedReplyGenerator,
    pub audio: Arc<AudioPipeline>,
    pub recognizers: RecognizerFactory,
}

/// Per-call policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSettings {
    pub barge_in: BargeInPolicy,
    pub frame_cadence: Duration,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            barge_in: BargeInPolicy::default(),
            frame_cadence: Duration::from_millis(FRAME_DURATION_MS as u64),
        }
    }
}

/// What a call did, reported when it ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSummary {
    pub call_id: String,
    pub transcripts: usize,
    pub turns_completed: usize,
    pub frames_sent: usize,
    pub barge_ins: usize,
}

/// The reply currently playing.
struct ActivePlayback {
    turn: u64,
    control: SpeakingControl,
    task: JoinHandle<()>,
}

/// One call's state machine.
pub struct CallSession {
    handle: Arc<SessionHandle>,
    services: CallServices,
    settings: CallSettings,
    outbound: mpsc::Sender<OutboundSignal>,

    state: TurnState,
    recognizer: BoxedRecognizer,
    recognizer_tx: mpsc::Sender<RecognizerEvent>,
    recognizer_rx: mpsc::Receiver<RecognizerEvent>,
    turn_tx: mpsc::Sender<TurnEvent>,
    turn_rx: mpsc::Receiver<TurnEvent>,

    pending: VecDeque<String>,
    preparing: Option<(u64, JoinHandle<()>)>,
    playback: Option<ActivePlayback>,
    next_turn: u64,
    summary: CallSummary,
}

impl CallSession {
    pub fn new(
        handle: Arc<SessionHandle>,
        services: CallServices,
        settings: CallSettings,
        outbound: mpsc::Sender<OutboundSignal>,
    ) -> Self {
        let (recognizer_tx, recognizer_rx) = mpsc::channel(RECOGNIZER_EVENT_CAPACITY);
        let (turn_tx, turn_rx) = mpsc::channel(TURN_EVENT_CAPACITY);
        let recognizer = (services.recognizers)();
        let summary = CallSummary {
            call_id: handle.call_id().to_string(),
            ..Default::default()
        };

        Self {
            handle,
            services,
            settings,
            outbound,
            state: TurnState::Idle,
            recognizer,
            recognizer_tx,
            recognizer_rx,
            turn_tx,
            turn_rx,
            pending: VecDeque::new(),
            preparing: None,
            playback: None,
            next_turn: 1,
            summary,
        }
    }

    pub fn call_id(&self) -> &str {
        self.handle.call_id()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Drive the call until the peer stops, disconnects or the recognizer
    /// is lost, then release everything the call owns.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<TelephonyEvent>) -> CallSummary {
        let span = info_span!("call", call_id = %self.handle.call_id());
        async move {
            info!("Call started");
            loop {
                let event = tokio::select! {
                    biased;
                    Some(event) = self.turn_rx.recv() => CallEvent::Turn(event),
                    event = inbound.recv() => {
                        CallEvent::Telephony(event.unwrap_or(TelephonyEvent::Disconnected))
                    }
                    Some(event) = self.recognizer_rx.recv() => CallEvent::Recognizer(event),
                    _ = self.handle.shutdown_token().cancelled() => CallEvent::Shutdown,
                };

                if self.on_event(event).await.is_break() {
                    break;
                }
            }
            self.teardown().await;
            info!(
                turns = self.summary.turns_completed,
                frames = self.summary.frames_sent,
                barge_ins = self.summary.barge_ins,
                "Call ended"
            );
            self.summary
        }
        .instrument(span)
        .await
    }

    /// Apply one event. `Break` ends the call.
    pub async fn on_event(&mut self, event: CallEvent) -> ControlFlow<()> {
        match event {
            CallEvent::Telephony(TelephonyEvent::Connected) => {
                debug!("Telephony peer connected");
            }
            CallEvent::Telephony(TelephonyEvent::Start { stream_id }) => {
                self.on_start(stream_id).await;
            }
            CallEvent::Telephony(TelephonyEvent::Media { payload }) => {
                self.on_media(payload);
            }
            CallEvent::Telephony(TelephonyEvent::Mark { name }) => {
                debug!(mark = %name, "Peer acknowledged mark");
            }
            CallEvent::Telephony(TelephonyEvent::Stop) => {
                info!("Stream stopped by peer");
                return ControlFlow::Break(());
            }
            CallEvent::Telephony(TelephonyEvent::Disconnected) => {
                info!("Telephony transport closed");
                return ControlFlow::Break(());
            }
            CallEvent::Recognizer(RecognizerEvent::FinalTranscript(text)) => {
                self.summary.transcripts += 1;
                info!(chars = text.chars().count(), "Final transcript");
                self.pending.push_back(text);
                self.maybe_start_turn();
            }
            CallEvent::Recognizer(RecognizerEvent::Error(e)) => {
                warn!(error = %e, "Recognizer error");
            }
            CallEvent::Recognizer(RecognizerEvent::Closed { reason }) => {
                warn!(?reason, "Recognizer connection lost, ending call");
                return ControlFlow::Break(());
            }
            CallEvent::Turn(TurnEvent::ReplyReady {
                turn,
                reply,
                frames,
            }) => {
                self.on_reply_ready(turn, reply, frames);
            }
            CallEvent::Turn(TurnEvent::PlaybackFinished { turn, outcome }) => {
                self.on_playback_finished(turn, outcome);
            }
            CallEvent::Shutdown => {
                info!("Server shutting down, ending call");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn set_state(&mut self, state: TurnState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "Turn state");
            self.state = state;
            self.handle.set_state(state);
        }
    }

    async fn on_start(&mut self, stream_id: String) {
        if !self.handle.set_stream_id(stream_id.clone()) {
            warn!(%stream_id, "Duplicate start signal ignored");
            return;
        }
        info!(%stream_id, "Stream started");
        self.set_state(TurnState::Listening);

        if let Err(e) = self.recognizer.open(self.recognizer_tx.clone()).await {
            // Stay listening; audio is dropped until the call ends
            warn!(error = %e, "Recognizer unavailable, caller audio will be dropped");
        }
    }

    fn on_media(&mut self, payload: Bytes) {
        if self.state == TurnState::Speaking
            && let Some(playback) = &self.playback
            && !playback.control.is_aborted()
            && self
                .settings
                .barge_in
                .should_interrupt(playback.control.elapsed(), &payload)
        {
            info!(
                turn = playback.turn,
                elapsed_ms = playback.control.elapsed().as_millis() as u64,
                "Barge-in, stopping playback"
            );
            playback.control.abort();
            self.summary.barge_ins += 1;
        }

        self.recognizer.send_audio(payload);
    }

    /// Start answering the oldest queued transcript if no turn is running.
    fn maybe_start_turn(&mut self) {
        if self.preparing.is_some() || self.playback.is_some() {
            return;
        }
        let Some(text) = self.pending.pop_front() else {
            return;
        };

        let turn = self.next_turn;
        self.next_turn += 1;

        let replies = self.services.replies.clone();
        let audio = self.services.audio.clone();
        let tx = self.turn_tx.clone();
        let span = info_span!("turn", turn);

        let task = tokio::spawn(
            async move {
                let reply = replies.reply(&text).await;
                let frames = audio.render(&reply).await;
                debug!(frames = frames.len(), "Reply prepared");
                let _ = tx
                    .send(TurnEvent::ReplyReady {
                        turn,
                        reply,
                        frames,
                    })
                    .await;
            }
            .instrument(span),
        );
        self.preparing = Some((turn, task));
    }

    fn on_reply_ready(&mut self, turn: u64, reply: String, frames: Vec<AudioFrame>) {
        match self.preparing.take() {
            Some((expected, _)) if expected == turn => {}
            other => {
                self.preparing = other;
                debug!(turn, "Ignoring stale reply");
                return;
            }
        }

        let Some(stream_id) = self.handle.stream_id().map(str::to_string) else {
            warn!(turn, "No stream to play reply on, dropping frames");
            self.maybe_start_turn();
            return;
        };

        info!(turn, chars = reply.chars().count(), frames = frames.len(), "Speaking reply");

        let (control, signal) = SpeakingControl::start();
        let pump = FramePump::new(self.settings.frame_cadence);
        let mut sink = ChannelSink::new(stream_id, self.outbound.clone());
        let tx = self.turn_tx.clone();
        let mark = format!("reply-{turn}");
        let span = info_span!("playback", turn);

        let task = tokio::spawn(
            async move {
                let outcome = pump.deliver(&frames, &signal, &mut sink, &mark).await;
                let _ = tx.send(TurnEvent::PlaybackFinished { turn, outcome }).await;
            }
            .instrument(span),
        );

        self.playback = Some(ActivePlayback {
            turn,
            control,
            task,
        });
        self.set_state(TurnState::Speaking);
    }

    fn on_playback_finished(&mut self, turn: u64, outcome: PumpOutcome) {
        if self.playback.as_ref().map(|p| p.turn) != Some(turn) {
            debug!(turn, "Ignoring stale playback completion");
            return;
        }
        self.playback = None;
        self.summary.turns_completed += 1;
        self.summary.frames_sent += outcome.frames_sent;
        self.set_state(TurnState::Listening);
        self.maybe_start_turn();
    }

    async fn teardown(&mut self) {
        self.set_state(TurnState::Closed);
        self.pending.clear();

        if let Some((_, task)) = self.preparing.take() {
            task.abort();
        }
        if let Some(playback) = self.playback.take() {
            playback.control.abort();
            playback.task.abort();
        }

        self.recognizer.close().await;
    }
}
