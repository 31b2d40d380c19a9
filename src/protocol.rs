//! Wire messages exchanged with a client
//!
//! Ingestion messages carry one base64-encoded frame each. Anything that is
//! not a well-formed frame or summary request is ignored rather than treated
//! as an error, so a misbehaving client never tears down its session.

use crate::error::EngineError;
use crate::types::{FocusResult, SessionSummary};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Messages a client may send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Frame {
        image: String,
    },
    Summary {
        #[serde(default)]
        reset: bool,
    },
}

/// What the engine should do with one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Decoded frame bytes to process
    Frame(Vec<u8>),
    /// Pull-based summary query
    Summary { reset: bool },
    /// Malformed, unknown or empty; skip silently
    Ignored,
}

/// Classify one inbound text message
pub fn parse_message(text: &str) -> IngestOutcome {
    match decode_message(text) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring inbound message");
            IngestOutcome::Ignored
        }
    }
}

fn decode_message(text: &str) -> Result<IngestOutcome, EngineError> {
    let message: ClientMessage = serde_json::from_str(text)?;

    match message {
        ClientMessage::Frame { image } => {
            if image.is_empty() {
                return Err(EngineError::InvalidMessage("empty image payload".to_string()));
            }
            Ok(IngestOutcome::Frame(STANDARD.decode(image.as_bytes())?))
        }
        ClientMessage::Summary { reset } => Ok(IngestOutcome::Summary { reset }),
    }
}

/// Build a frame message for the given bytes
pub fn encode_frame(bytes: &[u8]) -> String {
    let message = ClientMessage::Frame {
        image: STANDARD.encode(bytes),
    };
    serde_json::to_string(&message).unwrap_or_default()
}

/// Flat per-frame result sent back to the client
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusResultMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub phone: bool,
    pub phone_confidence: f64,
    pub tired: bool,
    pub tired_score: f64,
    pub fidgety: bool,
    pub fidgety_score: f64,
    pub focus_score: f64,
    pub is_focused: bool,
}

/// Tag of outbound messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    FocusResult,
}

impl From<&FocusResult> for FocusResultMessage {
    fn from(result: &FocusResult) -> Self {
        Self {
            kind: MessageKind::FocusResult,
            phone: result.phone.detected,
            phone_confidence: result.phone.confidence,
            tired: result.tired.is_tired,
            tired_score: result.tired.score,
            fidgety: result.fidgety.is_fidgety,
            fidgety_score: result.fidgety.movement_score,
            focus_score: result.focus_score,
            is_focused: result.is_focused,
        }
    }
}

/// Summary query body, for transports that route queries separately
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub reset: bool,
}

/// Serialize a result as one wire line
pub fn result_to_json(result: &FocusResult) -> Result<String, EngineError> {
    Ok(serde_json::to_string(&FocusResultMessage::from(result))?)
}

/// Serialize a summary response
pub fn summary_to_json(summary: &SessionSummary) -> Result<String, EngineError> {
    Ok(serde_json::to_string(summary)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FidgetySignal, PhoneSignal, TiredSignal};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_frame() {
        let text = r#"{"type":"frame","image":"aGVsbG8="}"#;
        assert_eq!(parse_message(text), IngestOutcome::Frame(b"hello".to_vec()));
        assert_eq!(parse_message(&encode_frame(b"\x00\xff")), IngestOutcome::Frame(vec![0, 255]));
    }

    #[test]
    fn test_parse_summary() {
        assert_eq!(
            parse_message(r#"{"type":"summary"}"#),
            IngestOutcome::Summary { reset: false }
        );
        assert_eq!(
            parse_message(r#"{"type":"summary","reset":true}"#),
            IngestOutcome::Summary { reset: true }
        );
    }

    #[test]
    fn test_malformed_messages_are_ignored() {
        for text in [
            "not json",
            "",
            r#"{"type":"ping"}"#,
            r#"{"image":"aGVsbG8="}"#,
            r#"{"type":"frame"}"#,
            r#"{"type":"frame","image":""}"#,
            r#"{"type":"frame","image":"***"}"#,
            r#"[1,2,3]"#,
        ] {
            assert_eq!(parse_message(text), IngestOutcome::Ignored, "input: {text}");
        }
    }

    #[test]
    fn test_result_message_shape() {
        let result = FocusResult {
            phone: PhoneSignal {
                detected: true,
                confidence: 0.8,
            },
            tired: TiredSignal {
                is_tired: false,
                score: 0.0,
            },
            fidgety: FidgetySignal {
                is_fidgety: true,
                movement_score: 0.7,
            },
            focus_score: 0.36,
            is_focused: false,
        };

        let value: serde_json::Value = serde_json::from_str(&result_to_json(&result).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "focus_result",
                "phone": true,
                "phone_confidence": 0.8,
                "tired": false,
                "tired_score": 0.0,
                "fidgety": true,
                "fidgety_score": 0.7,
                "focus_score": 0.36,
                "is_focused": false,
            })
        );
    }

    #[test]
    fn test_summary_request_default() {
        let request: SummaryRequest = serde_json::from_str("{}").unwrap();
        assert!(!request.reset);
        let json = summary_to_json(&SessionSummary::default()).unwrap();
        assert!(json.contains("\"focus_timeline\":[]"));
    }
}
