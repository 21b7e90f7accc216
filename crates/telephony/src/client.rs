//! Vendor call-control seam
//!
//! The call core talks to telephony exclusively through [`CallClient`].
//! [`SimulatedCallClient`] is the vendorless implementation used in local
//! development and tests; it accepts every call-control operation and, by
//! default, reports speech recognition as unsupported so the conversation
//! core exercises its simulation fallback.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Telephony vendor errors
#[derive(Error, Debug)]
pub enum TelephonyError {
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("Unknown call: {0}")]
    CallNotFound(String),

    #[error("Speech recognition is not available: {0}")]
    RecognitionUnavailable(String),

    #[error("Vendor request failed: {0}")]
    Vendor(String),
}

/// Validate an E.164-style dialable number: leading `+`, digits only,
/// plausible length.
pub fn validate_phone_number(number: &str) -> Result<(), TelephonyError> {
    let valid = number.len() >= 8
        && number.len() <= 16
        && number.starts_with('+')
        && number[1..].chars().all(|c| c.is_ascii_digit());

    if valid {
        Ok(())
    } else {
        Err(TelephonyError::InvalidPhoneNumber(number.to_string()))
    }
}

/// Call-control operations against the telephony vendor
#[async_trait]
pub trait CallClient: Send + Sync {
    /// Place an outbound call and return the vendor's call connection id
    async fn create_call(
        &self,
        target_number: &str,
        source_caller_id: &str,
        callback_url: &str,
    ) -> Result<String, TelephonyError>;

    /// Play text-to-speech to all participants on the call
    async fn play_text(
        &self,
        call_id: &str,
        text: &str,
        voice: &str,
    ) -> Result<(), TelephonyError>;

    /// Start speech recognition for the target participant.
    ///
    /// Returns [`TelephonyError::RecognitionUnavailable`] when the vendor
    /// cannot recognize speech; callers fall back to simulation or DTMF.
    async fn start_recognition(
        &self,
        call_id: &str,
        target_participant: &str,
    ) -> Result<(), TelephonyError>;

    /// Hang up the call
    async fn hang_up(&self, call_id: &str) -> Result<(), TelephonyError>;

    /// Current vendor-side call state, e.g. "connected"
    async fn get_call_state(&self, call_id: &str) -> Result<String, TelephonyError>;
}

/// In-memory stand-in for a real telephony vendor
pub struct SimulatedCallClient {
    calls: RwLock<HashMap<String, String>>,
    recognition_supported: bool,
}

impl SimulatedCallClient {
    pub fn new() -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
            recognition_supported: false,
        }
    }

    /// Pretend the vendor supports speech recognition
    pub fn with_recognition(mut self) -> Self {
        self.recognition_supported = true;
        self
    }

    fn require_call(&self, call_id: &str) -> Result<(), TelephonyError> {
        if self.calls.read().contains_key(call_id) {
            Ok(())
        } else {
            Err(TelephonyError::CallNotFound(call_id.to_string()))
        }
    }
}

impl Default for SimulatedCallClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallClient for SimulatedCallClient {
    async fn create_call(
        &self,
        target_number: &str,
        source_caller_id: &str,
        callback_url: &str,
    ) -> Result<String, TelephonyError> {
        validate_phone_number(target_number)?;

        let call_id = format!("sim-{}", Uuid::new_v4());
        self.calls
            .write()
            .insert(call_id.clone(), "connected".to_string());

        info!(
            call_id = %call_id,
            target = %target_number,
            source = %source_caller_id,
            callback_url = %callback_url,
            "simulated outbound call created"
        );
        Ok(call_id)
    }

    async fn play_text(
        &self,
        call_id: &str,
        text: &str,
        voice: &str,
    ) -> Result<(), TelephonyError> {
        self.require_call(call_id)?;
        debug!(call_id = %call_id, voice = %voice, chars = text.len(), "simulated TTS playback");
        Ok(())
    }

    async fn start_recognition(
        &self,
        call_id: &str,
        target_participant: &str,
    ) -> Result<(), TelephonyError> {
        self.require_call(call_id)?;
        if self.recognition_supported {
            debug!(call_id = %call_id, participant = %target_participant, "simulated recognition started");
            Ok(())
        } else {
            Err(TelephonyError::RecognitionUnavailable(
                "simulated vendor has no speech recognition".to_string(),
            ))
        }
    }

    async fn hang_up(&self, call_id: &str) -> Result<(), TelephonyError> {
        self.require_call(call_id)?;
        self.calls
            .write()
            .insert(call_id.to_string(), "disconnected".to_string());
        info!(call_id = %call_id, "simulated call hung up");
        Ok(())
    }

    async fn get_call_state(&self, call_id: &str) -> Result<String, TelephonyError> {
        self.calls
            .read()
            .get(call_id)
            .cloned()
            .ok_or_else(|| TelephonyError::CallNotFound(call_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_number_validation() {
        assert!(validate_phone_number("+15551234567").is_ok());
        assert!(validate_phone_number("+442071838750").is_ok());
        assert!(validate_phone_number("15551234567").is_err());
        assert!(validate_phone_number("+1555").is_err());
        assert!(validate_phone_number("+1555123456789012345").is_err());
        assert!(validate_phone_number("+1555ABC4567").is_err());
    }

    #[tokio::test]
    async fn test_simulated_call_lifecycle() {
        let client = SimulatedCallClient::new();
        let call_id = client
            .create_call("+15551234567", "+15550000000", "http://localhost/webhook")
            .await
            .unwrap();

        assert_eq!(client.get_call_state(&call_id).await.unwrap(), "connected");
        client.play_text(&call_id, "hello", "en-US-JennyNeural").await.unwrap();

        // Recognition is unsupported by default, driving the fallback ladder.
        assert!(matches!(
            client.start_recognition(&call_id, "+15551234567").await,
            Err(TelephonyError::RecognitionUnavailable(_))
        ));

        client.hang_up(&call_id).await.unwrap();
        assert_eq!(
            client.get_call_state(&call_id).await.unwrap(),
            "disconnected"
        );
    }

    #[tokio::test]
    async fn test_invalid_target_rejected() {
        let client = SimulatedCallClient::new();
        assert!(matches!(
            client
                .create_call("not-a-number", "+15550000000", "http://localhost")
                .await,
            Err(TelephonyError::InvalidPhoneNumber(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_call_rejected() {
        let client = SimulatedCallClient::new();
        assert!(matches!(
            client.play_text("missing", "hi", "voice").await,
            Err(TelephonyError::CallNotFound(_))
        ));
    }
}
