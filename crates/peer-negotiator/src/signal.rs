//! Signaling messages exchanged between peers through an application-owned
//! channel.
//!
//! The wire shape is a JSON object tagged by `type`:
//!
//! ```json
//! {"type": "offer", "sdp": "v=0..."}
//! {"type": "answer", "sdp": "v=0..."}
//! {"type": "candidate", "candidate": {"candidate": "candidate:...", "sdpMLineIndex": 0, "sdpMid": "0"}}
//! {"type": "renegotiate", "renegotiate": true}
//! ```
//!
//! Unknown fields are ignored when decoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NegotiatorError, Result};

/// A trickled ICE candidate in its serializable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInit {
    pub candidate: String,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_mline_index: Option<u16>,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
}

impl CandidateInit {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mline_index: None,
            sdp_mid: None,
        }
    }

    pub fn with_mline_index(mut self, index: u16) -> Self {
        self.sdp_mline_index = Some(index);
        self
    }

    pub fn with_mid(mut self, mid: impl Into<String>) -> Self {
        self.sdp_mid = Some(mid.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

impl SdpType {
    pub fn as_str(self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
            SdpType::Pranswer => "pranswer",
            SdpType::Rollback => "rollback",
        }
    }
}

impl std::fmt::Display for SdpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn new(sdp_type: SdpType, sdp: impl Into<String>) -> Self {
        Self {
            sdp_type,
            sdp: sdp.into(),
        }
    }

    pub fn offer(sdp: impl Into<String>) -> Self {
        Self::new(SdpType::Offer, sdp)
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self::new(SdpType::Answer, sdp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalMessage {
    Offer {
        sdp: String,
    },
    Answer {
        sdp: String,
    },
    Candidate {
        candidate: CandidateInit,
    },
    Renegotiate {
        #[serde(default = "default_renegotiate")]
        renegotiate: bool,
    },
}

fn default_renegotiate() -> bool {
    true
}

impl SignalMessage {
    pub fn renegotiate() -> Self {
        SignalMessage::Renegotiate { renegotiate: true }
    }

    pub fn candidate(candidate: CandidateInit) -> Self {
        SignalMessage::Candidate { candidate }
    }

    /// Wraps an offer or answer; other description types are never signaled.
    pub fn from_description(description: &SessionDescription) -> Option<Self> {
        match description.sdp_type {
            SdpType::Offer => Some(SignalMessage::Offer {
                sdp: description.sdp.clone(),
            }),
            SdpType::Answer => Some(SignalMessage::Answer {
                sdp: description.sdp.clone(),
            }),
            SdpType::Pranswer | SdpType::Rollback => None,
        }
    }

    pub fn description(&self) -> Option<SessionDescription> {
        match self {
            SignalMessage::Offer { sdp } => Some(SessionDescription::offer(sdp.clone())),
            SignalMessage::Answer { sdp } => Some(SessionDescription::answer(sdp.clone())),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::Offer { .. } => "offer",
            SignalMessage::Answer { .. } => "answer",
            SignalMessage::Candidate { .. } => "candidate",
            SignalMessage::Renegotiate { .. } => "renegotiate",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Malformed JSON is a `Decode` error; well-formed JSON that is not a
    /// signaling message is `InvalidSignal`.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|err| NegotiatorError::InvalidSignal(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn candidate_signal_uses_browser_field_names() {
        let message = SignalMessage::candidate(
            CandidateInit::new("candidate:1 1 udp 2122260223 10.0.0.2 54321 typ host")
                .with_mline_index(0)
                .with_mid("0"),
        );
        let value = message.to_value().unwrap();
        assert_eq!(
            value,
            json!({
                "type": "candidate",
                "candidate": {
                    "candidate": "candidate:1 1 udp 2122260223 10.0.0.2 54321 typ host",
                    "sdpMLineIndex": 0,
                    "sdpMid": "0"
                }
            })
        );
    }

    #[test]
    fn null_candidate_fields_decode_as_none() {
        let message = SignalMessage::from_json(
            r#"{"type":"candidate","candidate":{"candidate":"c1","sdpMLineIndex":null,"sdpMid":null}}"#,
        )
        .unwrap();
        assert_eq!(message, SignalMessage::candidate(CandidateInit::new("c1")));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let message =
            SignalMessage::from_json(r#"{"type":"offer","sdp":"v=0","session":"abc","extra":1}"#)
                .unwrap();
        assert_eq!(
            message,
            SignalMessage::Offer {
                sdp: "v=0".into()
            }
        );
    }

    #[test]
    fn renegotiate_flag_defaults_to_true() {
        let message = SignalMessage::from_json(r#"{"type":"renegotiate"}"#).unwrap();
        assert_eq!(message, SignalMessage::renegotiate());
        assert_eq!(
            SignalMessage::renegotiate().to_json().unwrap(),
            r#"{"type":"renegotiate","renegotiate":true}"#
        );
    }

    #[test]
    fn unknown_type_is_an_invalid_signal() {
        let err = SignalMessage::from_json(r#"{"type":"bye"}"#).unwrap_err();
        assert!(matches!(err, NegotiatorError::InvalidSignal(_)));

        let err = SignalMessage::from_json("{\"type\":").unwrap_err();
        assert!(matches!(err, NegotiatorError::Decode(_)));
    }

    #[test]
    fn only_offers_and_answers_are_signaled() {
        let pranswer = SessionDescription::new(SdpType::Pranswer, "v=0");
        assert!(SignalMessage::from_description(&pranswer).is_none());
        let answer = SessionDescription::answer("v=0");
        let message = SignalMessage::from_description(&answer).unwrap();
        assert_eq!(message.kind(), "answer");
        assert_eq!(message.description(), Some(answer));
    }
}
