//! Recognition orchestrator
//!
//! Decides how patient input gets captured for a call and runs the fallback
//! ladder: vendor speech recognition, then scripted simulation, then a DTMF
//! menu. The decision is made once per call and stays sticky; later turns
//! reuse the decided mode instead of re-probing the vendor.

use careline_core::{CallStage, RecognitionMode, RecognizedSpeech};
use careline_telephony::{CallClient, TelephonyError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::store::CallConversation;

/// Canned utterances produced while in simulation mode, indexed by turn
/// count and clamped at the last entry.
pub const SIMULATED_UTTERANCES: [&str; 8] = [
    "I need help with scheduling an appointment",
    "I have a question about my medication",
    "Can you help me with my test results?",
    "I'm not feeling well and need advice",
    "I need to reschedule my appointment",
    "Can you transfer me to a nurse?",
    "I have a billing question",
    "Yes, I need help with that",
];

/// Spoken whenever a simulation listen window opens, so the caller never
/// hears dead air while the synthesis timer runs
pub const SIMULATION_LISTENING_PROMPT: &str =
    "I'm listening for your response. Please speak now, and I'll do my best to help you.";

/// Touch-tone menu played when both recognition paths are unavailable
pub const DTMF_MENU_PROMPT: &str = "Press 1 for appointments, 2 for general questions, \
     3 to speak with someone, or 0 to hear this menu again.";

/// Played when recognition completes with nothing usable
pub const RETRY_MESSAGE: &str =
    "I'm sorry, I didn't catch that. Could you please repeat what you said?";

/// Played when the call can no longer be serviced automatically
pub const ERROR_TRANSFER_MESSAGE: &str = "I'm experiencing some technical difficulties. \
     Let me transfer you to a human representative.";

/// What a listen-window timeout produced
#[derive(Debug, Clone, PartialEq)]
pub enum ListenTimeout {
    /// Simulation window elapsed; treat this as the user's utterance
    SimulatedUtterance(RecognizedSpeech),
    /// Vendor never delivered a result; re-prompt the caller
    VendorRetry,
}

/// Runs the recognition fallback ladder for active calls
pub struct RecognitionOrchestrator {
    client: Arc<dyn CallClient>,
    simulation_timeout: Duration,
    vendor_timeout: Duration,
}

impl RecognitionOrchestrator {
    pub fn new(
        client: Arc<dyn CallClient>,
        simulation_timeout: Duration,
        vendor_timeout: Duration,
    ) -> Self {
        Self {
            client,
            simulation_timeout,
            vendor_timeout,
        }
    }

    pub fn simulation_timeout(&self) -> Duration {
        self.simulation_timeout
    }

    pub fn vendor_timeout(&self) -> Duration {
        self.vendor_timeout
    }

    /// The canned utterance for a simulation turn
    pub fn simulated_utterance(turn_count: usize) -> RecognizedSpeech {
        let index = turn_count.min(SIMULATED_UTTERANCES.len() - 1);
        RecognizedSpeech::simulated(SIMULATED_UTTERANCES[index])
    }

    /// The prompt spoken while a simulation window is open, with a lead-in
    /// that varies over the conversation
    pub fn listening_prompt(turn_count: usize) -> String {
        let lead = match turn_count {
            0 => "How can I help you today?",
            1 => "I understand. Could you tell me more?",
            _ => "What else can I help you with?",
        };
        format!("{} {}", lead, SIMULATION_LISTENING_PROMPT)
    }

    /// Open a listen window for the call.
    ///
    /// On the first listen the vendor is probed once and the outcome decides
    /// the call's sticky recognition mode; with no resolvable participant
    /// there is nobody to aim the recognizer at, so the call goes straight to
    /// simulation. Simulation and DTMF modes speak their prompt (listening
    /// prompt, touch-tone menu) here; vendor mode arms recognition.
    pub async fn begin_listening(
        &self,
        conversation: &mut CallConversation,
        participant: Option<&str>,
        voice: &str,
    ) -> Result<(), TelephonyError> {
        let first_listen = conversation.recognition_mode == RecognitionMode::Unset;
        if first_listen {
            conversation.recognition_mode = match participant {
                Some(participant) => self.probe_vendor(conversation, participant).await,
                None => {
                    info!(
                        call_id = %conversation.call_id,
                        "no resolvable participant, using simulation"
                    );
                    RecognitionMode::Simulation
                }
            };
        }

        match conversation.recognition_mode {
            RecognitionMode::VendorSpeech => {
                // The probe already armed recognition on the first listen;
                // later turns re-arm it here. Vendor mode implies a
                // participant was resolvable when the mode was decided.
                if !first_listen {
                    self.client
                        .start_recognition(&conversation.call_id, participant.unwrap_or_default())
                        .await?;
                }
                conversation.set_stage(CallStage::ListeningForResponse);
            }
            RecognitionMode::Simulation => {
                // The caller hears a listening prompt while the synthesis
                // timer runs; silence here would read as a dropped call.
                let prompt = Self::listening_prompt(conversation.turn_count);
                self.client
                    .play_text(&conversation.call_id, &prompt, voice)
                    .await?;
                conversation.set_stage(CallStage::SimulatedListening);
            }
            RecognitionMode::Dtmf => {
                self.client
                    .play_text(&conversation.call_id, DTMF_MENU_PROMPT, voice)
                    .await?;
                conversation.set_stage(CallStage::MenuPresented);
            }
            RecognitionMode::Unset => unreachable!("mode decided above"),
        }

        conversation.listen_started_at = Some(Instant::now());
        Ok(())
    }

    /// Probe the vendor once and decide the call's recognition mode
    async fn probe_vendor(
        &self,
        conversation: &CallConversation,
        participant: &str,
    ) -> RecognitionMode {
        match self
            .client
            .start_recognition(&conversation.call_id, participant)
            .await
        {
            Ok(()) => {
                info!(call_id = %conversation.call_id, "vendor speech recognition active");
                RecognitionMode::VendorSpeech
            }
            Err(TelephonyError::RecognitionUnavailable(reason)) => {
                info!(
                    call_id = %conversation.call_id,
                    reason = %reason,
                    "vendor recognition unavailable, using simulation"
                );
                RecognitionMode::Simulation
            }
            Err(error) => {
                warn!(
                    call_id = %conversation.call_id,
                    error = %error,
                    "recognition probe failed, degrading to DTMF menu"
                );
                RecognitionMode::Dtmf
            }
        }
    }

    /// Check whether the current listen window has timed out.
    ///
    /// Simulation windows time out into a canned utterance; vendor windows
    /// time out into a retry prompt. DTMF menus wait indefinitely.
    pub fn poll_timeout(&self, conversation: &CallConversation) -> Option<ListenTimeout> {
        let started = conversation.listen_started_at?;

        match conversation.stage {
            CallStage::SimulatedListening if started.elapsed() >= self.simulation_timeout => {
                Some(ListenTimeout::SimulatedUtterance(Self::simulated_utterance(
                    conversation.turn_count,
                )))
            }
            CallStage::ListeningForResponse if started.elapsed() >= self.vendor_timeout => {
                Some(ListenTimeout::VendorRetry)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_telephony::SimulatedCallClient;

    use crate::store::ConversationStore;

    fn orchestrator(client: SimulatedCallClient) -> RecognitionOrchestrator {
        RecognitionOrchestrator::new(
            Arc::new(client),
            Duration::from_millis(10),
            Duration::from_millis(50),
        )
    }

    async fn connected_call(client: &SimulatedCallClient) -> String {
        client
            .create_call("+15551234567", "+15550000000", "http://localhost/webhook")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_mode_falls_back_to_simulation_and_sticks() {
        let client = SimulatedCallClient::new();
        let call_id = connected_call(&client).await;
        let orchestrator = orchestrator(client);

        let store = ConversationStore::new();
        let handle = store.get_or_create(&call_id);
        let mut conversation = handle.lock().await;

        orchestrator
            .begin_listening(&mut conversation, Some("+15551234567"), "voice")
            .await
            .unwrap();
        assert_eq!(conversation.recognition_mode, RecognitionMode::Simulation);
        assert_eq!(conversation.stage, CallStage::SimulatedListening);

        // Second listen must not re-probe or change modes.
        orchestrator
            .begin_listening(&mut conversation, Some("+15551234567"), "voice")
            .await
            .unwrap();
        assert_eq!(conversation.recognition_mode, RecognitionMode::Simulation);
    }

    #[tokio::test]
    async fn test_vendor_mode_when_recognition_supported() {
        let client = SimulatedCallClient::new().with_recognition();
        let call_id = connected_call(&client).await;
        let orchestrator = orchestrator(client);

        let store = ConversationStore::new();
        let handle = store.get_or_create(&call_id);
        let mut conversation = handle.lock().await;

        orchestrator
            .begin_listening(&mut conversation, Some("+15551234567"), "voice")
            .await
            .unwrap();
        assert_eq!(conversation.recognition_mode, RecognitionMode::VendorSpeech);
        assert_eq!(conversation.stage, CallStage::ListeningForResponse);
    }

    #[tokio::test]
    async fn test_simulation_timeout_yields_canned_utterance() {
        let client = SimulatedCallClient::new();
        let call_id = connected_call(&client).await;
        let orchestrator = orchestrator(client);

        let store = ConversationStore::new();
        let handle = store.get_or_create(&call_id);
        let mut conversation = handle.lock().await;
        orchestrator
            .begin_listening(&mut conversation, Some("+15551234567"), "voice")
            .await
            .unwrap();

        assert!(orchestrator.poll_timeout(&conversation).is_none());
        tokio::time::sleep(Duration::from_millis(20)).await;
        match orchestrator.poll_timeout(&conversation) {
            Some(ListenTimeout::SimulatedUtterance(speech)) => {
                assert_eq!(speech.text, SIMULATED_UTTERANCES[0]);
                assert_eq!(speech.confidence, 1.0);
            }
            other => panic!("expected simulated utterance, got {:?}", other),
        }
    }

    #[test]
    fn test_listening_prompt_lead_varies_with_turn() {
        let first = RecognitionOrchestrator::listening_prompt(0);
        let second = RecognitionOrchestrator::listening_prompt(1);
        let later = RecognitionOrchestrator::listening_prompt(5);

        assert!(first.starts_with("How can I help you today?"));
        assert!(second.starts_with("I understand."));
        assert!(later.starts_with("What else"));
        for prompt in [first, second, later] {
            assert!(prompt.ends_with(SIMULATION_LISTENING_PROMPT));
        }
    }

    #[test]
    fn test_utterance_rotation_clamps_at_last() {
        assert_eq!(
            RecognitionOrchestrator::simulated_utterance(0).text,
            SIMULATED_UTTERANCES[0]
        );
        assert_eq!(
            RecognitionOrchestrator::simulated_utterance(7).text,
            SIMULATED_UTTERANCES[7]
        );
        assert_eq!(
            RecognitionOrchestrator::simulated_utterance(99).text,
            SIMULATED_UTTERANCES[7]
        );
    }
}
