//! Conversation types shared across the call core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One transcript entry. Append-only; the transcript is both the display
/// record and the LLM context window (last N entries).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Conversation stage of a single call, driven exclusively by the event
/// dispatcher in response to vendor webhook events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallStage {
    /// Created but greeting not yet played
    #[default]
    Idle,
    /// Greeting TTS is playing (or queued)
    GreetingPlayed,
    /// Vendor speech recognition is active
    ListeningForResponse,
    /// A conversational response is playing
    PlayingResponse,
    /// Scripted simulation stands in for recognition
    SimulatedListening,
    /// DTMF menu was played, waiting for digits
    MenuPresented,
    /// Call ended; record is about to be removed
    Terminated,
}

impl CallStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            CallStage::Idle => "idle",
            CallStage::GreetingPlayed => "greeting_played",
            CallStage::ListeningForResponse => "listening_for_response",
            CallStage::PlayingResponse => "playing_response",
            CallStage::SimulatedListening => "simulated_listening",
            CallStage::MenuPresented => "menu_presented",
            CallStage::Terminated => "terminated",
        }
    }
}

/// How patient input is being captured for this call.
///
/// Chosen once when recognition is first attempted and sticky for the call's
/// lifetime; later turns reuse the decided mode instead of re-probing the
/// vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionMode {
    #[default]
    Unset,
    /// Real vendor speech recognition
    VendorSpeech,
    /// Scripted stand-in for recognition
    Simulation,
    /// Touch-tone menu, the most degraded fallback
    Dtmf,
}

impl RecognitionMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            RecognitionMode::Unset => "unset",
            RecognitionMode::VendorSpeech => "vendor_speech",
            RecognitionMode::Simulation => "simulation",
            RecognitionMode::Dtmf => "dtmf",
        }
    }
}
