//! Deepgram listen-API message adaptation.

use serde::{Deserialize, Serialize};

/// Client heartbeat keeping an idle stream open.
#[derive(Debug, Serialize)]
pub struct KeepAliveMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl Default for KeepAliveMessage {
    fn default() -> Self {
        Self { kind: "KeepAlive" }
    }
}

/// Asks the service to flush and close the stream.
#[derive(Debug, Serialize)]
pub struct CloseStreamMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl Default for CloseStreamMessage {
    fn default() -> Self {
        Self { kind: "CloseStream" }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListenMessage {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    speech_final: bool,
    #[serde(default)]
    channel: Option<Channel>,
    #[serde(default)]
    transcript: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Default, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

/// Extract a finalized transcript from a raw listen-API message.
///
/// A message is final when `is_final` is set, or when it is a `Results`
/// message flagged `speech_final` with a non-empty first alternative.
/// Interim results, metadata and unparseable text yield `None`.
pub fn final_transcript(raw: &str) -> Option<String> {
    let msg: ListenMessage = serde_json::from_str(raw).ok()?;

    let alternative = msg
        .channel
        .as_ref()
        .and_then(|c| c.alternatives.first())
        .map(|a| a.transcript.trim())
        .unwrap_or_default();

    let is_final = msg.is_final
        || (!alternative.is_empty() && msg.kind.as_deref() == Some("Results") && msg.speech_final);
    if !is_final {
        return None;
    }

    let text = if alternative.is_empty() {
        msg.transcript.as_deref().map(str::trim).unwrap_or_default()
    } else {
        alternative
    };

    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_result() {
        let raw = r#"{"type":"Results","is_final":true,"speech_final":true,
            "channel":{"alternatives":[{"transcript":"hello there","confidence":0.98}]}}"#;
        assert_eq!(final_transcript(raw), Some("hello there".to_string()));
    }

    #[test]
    fn test_interim_result_is_ignored() {
        let raw = r#"{"type":"Results","is_final":false,"speech_final":false,
            "channel":{"alternatives":[{"transcript":"hel"}]}}"#;
        assert_eq!(final_transcript(raw), None);
    }

    #[test]
    fn test_speech_final_results_count_as_final() {
        let raw = r#"{"type":"Results","speech_final":true,
            "channel":{"alternatives":[{"transcript":"how are you"}]}}"#;
        assert_eq!(final_transcript(raw), Some("how are you".to_string()));
    }

    #[test]
    fn test_empty_final_transcript_is_ignored() {
        let raw = r#"{"type":"Results","is_final":true,"channel":{"alternatives":[{"transcript":"  "}]}}"#;
        assert_eq!(final_transcript(raw), None);
    }

    #[test]
    fn test_top_level_transcript_shape() {
        assert_eq!(
            final_transcript(r#"{"is_final":true,"transcript":"good morning"}"#),
            Some("good morning".to_string())
        );
    }

    #[test]
    fn test_non_result_messages() {
        assert_eq!(final_transcript(r#"{"type":"Metadata","request_id":"abc"}"#), None);
        assert_eq!(final_transcript(r#"{"type":"SpeechStarted"}"#), None);
        assert_eq!(final_transcript("not json"), None);
    }

    #[test]
    fn test_control_messages_serialize() {
        assert_eq!(
            serde_json::to_string(&KeepAliveMessage::default()).unwrap(),
            r#"{"type":"KeepAlive"}"#
        );
        assert_eq!(
            serde_json::to_string(&CloseStreamMessage::default()).unwrap(),
            r#"{"type":"CloseStream"}"#
        );
    }
}
