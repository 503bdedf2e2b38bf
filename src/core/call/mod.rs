//! Call orchestration: turn-taking, paced playback, barge-in and the
//! registry of live calls.

mod barge_in;
mod control;
mod events;
mod pump;
mod registry;
mod session;
mod sink;

pub use barge_in::{BargeInPolicy, DEFAULT_BARGE_IN_GRACE};
pub use control::{AbortSignal, SpeakingControl};
pub use events::{CallEvent, OutboundSignal, TelephonyEvent, TurnEvent};
pub use pump::{FramePump, FrameSink, PumpOutcome};
pub use registry::{SessionHandle, SessionInfo, SessionRegistry, TurnState};
pub use session::{CallServices, CallSession, CallSettings, CallSummary};
pub use sink::ChannelSink;
