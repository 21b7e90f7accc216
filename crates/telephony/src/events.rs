//! Webhook event model
//!
//! Vendor callbacks arrive as a JSON array of envelopes. Recognition results
//! have shipped in three payload shapes across vendor API versions; speech
//! extraction checks them in a fixed priority order so a payload carrying
//! more than one shape resolves deterministically.

use careline_core::RecognizedSpeech;
use serde_json::Value;

pub const EVENT_CALL_CONNECTED: &str = "Microsoft.Communication.CallConnected";
pub const EVENT_PLAY_COMPLETED: &str = "Microsoft.Communication.PlayCompleted";
pub const EVENT_PLAY_FAILED: &str = "Microsoft.Communication.PlayFailed";
pub const EVENT_RECOGNIZE_COMPLETED: &str = "Microsoft.Communication.RecognizeCompleted";
pub const EVENT_RECOGNIZE_FAILED: &str = "Microsoft.Communication.RecognizeFailed";
pub const EVENT_CALL_DISCONNECTED: &str = "Microsoft.Communication.CallDisconnected";

/// One webhook callback, minimally parsed
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub event_type: String,
    pub call_id: String,
    pub data: Value,
}

impl EventEnvelope {
    /// Parse one envelope from the webhook array. Returns `None` when the
    /// entry carries no event type or no call connection id; such entries
    /// are skipped, not errors.
    pub fn from_value(value: &Value) -> Option<Self> {
        let event_type = value
            .get("type")
            .or_else(|| value.get("eventType"))
            .and_then(Value::as_str)?
            .to_string();

        let data = value.get("data").cloned().unwrap_or(Value::Null);
        let call_id = data
            .get("callConnectionId")
            .and_then(Value::as_str)?
            .to_string();

        Some(Self {
            event_type,
            call_id,
            data,
        })
    }

    /// Parse a full webhook body (array or single object) into envelopes,
    /// preserving order.
    pub fn from_body(body: &Value) -> Vec<Self> {
        match body {
            Value::Array(entries) => entries.iter().filter_map(Self::from_value).collect(),
            single => Self::from_value(single).into_iter().collect(),
        }
    }

    /// The typed event this envelope carries
    pub fn event(&self) -> CallEvent {
        match self.event_type.as_str() {
            EVENT_CALL_CONNECTED => CallEvent::CallConnected,
            EVENT_PLAY_COMPLETED => CallEvent::PlayCompleted,
            EVENT_PLAY_FAILED => CallEvent::PlayFailed,
            EVENT_RECOGNIZE_COMPLETED => CallEvent::RecognizeCompleted {
                speech: extract_speech(&self.data),
                dtmf: tones_to_digits(&self.data),
            },
            EVENT_RECOGNIZE_FAILED => CallEvent::RecognizeFailed,
            EVENT_CALL_DISCONNECTED => CallEvent::CallDisconnected,
            other => CallEvent::Unknown(other.to_string()),
        }
    }
}

/// Normalized webhook event
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    CallConnected,
    PlayCompleted,
    PlayFailed,
    RecognizeCompleted {
        speech: Option<RecognizedSpeech>,
        dtmf: Option<String>,
    },
    RecognizeFailed,
    CallDisconnected,
    Unknown(String),
}

/// Extract recognized speech from a RecognizeCompleted payload.
///
/// Shapes are checked in priority order: `speechResult.speech`, then
/// `recognitionResult.speechResult.speech`, then top-level `speech`. The
/// first shape present wins even when its text is empty.
pub fn extract_speech(data: &Value) -> Option<RecognizedSpeech> {
    let candidates = [
        data.get("speechResult"),
        data.get("recognitionResult").and_then(|r| r.get("speechResult")),
    ];

    for candidate in candidates.into_iter().flatten() {
        if let Some(text) = candidate.get("speech").and_then(Value::as_str) {
            let confidence = candidate
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.0) as f32;
            return Some(RecognizedSpeech::new(text, confidence));
        }
    }

    data.get("speech")
        .and_then(Value::as_str)
        .map(|text| RecognizedSpeech::new(text, 0.0))
}

/// Extract pressed digits from a payload's `dtmfResult.tones` array.
///
/// Tones arrive either as digit strings or as spelled-out words; both map to
/// the same digit. Unrecognized tones are dropped.
pub fn tones_to_digits(data: &Value) -> Option<String> {
    let tones = data.get("dtmfResult")?.get("tones")?.as_array()?;

    let digits: String = tones
        .iter()
        .filter_map(Value::as_str)
        .filter_map(tone_to_digit)
        .collect();

    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

fn tone_to_digit(tone: &str) -> Option<char> {
    match tone.to_lowercase().as_str() {
        "0" | "zero" => Some('0'),
        "1" | "one" => Some('1'),
        "2" | "two" => Some('2'),
        "3" | "three" => Some('3'),
        "4" | "four" => Some('4'),
        "5" | "five" => Some('5'),
        "6" | "six" => Some('6'),
        "7" | "seven" => Some('7'),
        "8" | "eight" => Some('8'),
        "9" | "nine" => Some('9'),
        "pound" => Some('#'),
        "asterisk" | "star" => Some('*'),
        _ => None,
    }
}
