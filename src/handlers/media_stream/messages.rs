//! Telephony media-stream message types
//!
//! JSON text frames exchanged with the telephony provider. Every message
//! carries an `event` discriminator.
//!
//! ## Provider → Server
//!
//! - **connected**: transport is up
//! - **start**: stream metadata, carries the stream identifier
//! - **media**: base64 μ-law audio (8 kHz mono, normally 20 ms)
//! - **mark**: acknowledgement of a mark we sent earlier
//! - **stop**: the stream ended
//!
//! ## Server → Provider
//!
//! - **media**: one outgoing audio frame
//! - **mark**: end-of-utterance marker

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::call::{OutboundSignal, TelephonyEvent};
use crate::errors::{BridgeError, BridgeResult};

// =============================================================================
// Incoming Messages (Provider -> Server)
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum IncomingMessage {
    Connected,
    Start {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        #[serde(default)]
        start: Option<StartPayload>,
    },
    Media {
        media: MediaPayload,
    },
    Mark {
        #[serde(default)]
        mark: Option<MarkPayload>,
    },
    Stop,
    /// Any event this server does not act on
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartPayload {
    #[serde(rename = "streamSid", default)]
    pub stream_sid: Option<String>,
    #[serde(rename = "callSid", default)]
    pub call_sid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaPayload {
    #[serde(default)]
    pub payload: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkPayload {
    #[serde(default)]
    pub name: String,
}

impl IncomingMessage {
    /// Convert to the event the call session understands.
    ///
    /// Returns `Ok(None)` for messages that carry nothing to act on.
    pub fn into_event(self) -> BridgeResult<Option<TelephonyEvent>> {
        match self {
            IncomingMessage::Connected => Ok(Some(TelephonyEvent::Connected)),
            IncomingMessage::Start { stream_sid, start } => {
                let stream_id = stream_sid
                    .or_else(|| start.and_then(|s| s.stream_sid))
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        BridgeError::Protocol("start event without streamSid".to_string())
                    })?;
                Ok(Some(TelephonyEvent::Start { stream_id }))
            }
            IncomingMessage::Media { media } => {
                if media.payload.is_empty() {
                    return Ok(None);
                }
                let payload = STANDARD
                    .decode(media.payload.as_bytes())
                    .map_err(|e| BridgeError::Protocol(format!("invalid media payload: {e}")))?;
                Ok(Some(TelephonyEvent::Media {
                    payload: Bytes::from(payload),
                }))
            }
            IncomingMessage::Mark { mark } => Ok(Some(TelephonyEvent::Mark {
                name: mark.map(|m| m.name).unwrap_or_default(),
            })),
            IncomingMessage::Stop => Ok(Some(TelephonyEvent::Stop)),
            IncomingMessage::Unknown => Ok(None),
        }
    }
}

/// Parse one text frame.
pub fn parse_incoming(text: &str) -> BridgeResult<IncomingMessage> {
    serde_json::from_str(text).map_err(|e| BridgeError::Protocol(e.to_string()))
}

// =============================================================================
// Outgoing Messages (Server -> Provider)
// =============================================================================

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutgoingMessage {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutgoingMedia,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: OutgoingMark,
    },
}

#[derive(Debug, Serialize, PartialEq)]
pub struct OutgoingMedia {
    pub payload: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct OutgoingMark {
    pub name: String,
}

impl From<OutboundSignal> for OutgoingMessage {
    fn from(signal: OutboundSignal) -> Self {
        match signal {
            OutboundSignal::Media { stream_id, frame } => OutgoingMessage::Media {
                stream_sid: stream_id,
                media: OutgoingMedia {
                    payload: frame.to_base64(),
                },
            },
            OutboundSignal::Mark { stream_id, name } => OutgoingMessage::Mark {
                stream_sid: stream_id,
                mark: OutgoingMark { name },
            },
        }
    }
}
