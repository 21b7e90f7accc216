//! Normalized speech recognition results

use serde::{Deserialize, Serialize};

/// One recognized user utterance, normalized from whichever path produced it.
///
/// Real vendor recognition and simulated turns both collapse into this shape
/// before reaching the response generator; downstream code never needs to
/// know which path produced the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedSpeech {
    /// Recognized text, trimmed
    pub text: String,
    /// Confidence score (0.0 - 1.0); simulated turns report 1.0
    pub confidence: f32,
}

impl RecognizedSpeech {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    /// A simulated utterance, indistinguishable downstream but tagged with
    /// full confidence.
    pub fn simulated(text: impl Into<String>) -> Self {
        Self::new(text, 1.0)
    }

    /// Check if anything was actually recognized
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_detection() {
        assert!(RecognizedSpeech::new("   ", 0.9).is_empty());
        assert!(!RecognizedSpeech::new("yes", 0.9).is_empty());
    }

    #[test]
    fn test_simulated_confidence() {
        let speech = RecognizedSpeech::simulated("I need help");
        assert_eq!(speech.confidence, 1.0);
    }
}
