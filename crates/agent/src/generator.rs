//! Response generation
//!
//! Layered: emergency detection first (always verbatim, never enhanced),
//! then the medication workflow for calls with patient context, then the
//! general keyword rules, then turn-count generics. LLM enhancement wraps
//! the non-emergency layers and is strictly best-effort under a timeout;
//! every failure path returns the scripted draft unchanged.

use careline_core::{MedicationAdherenceState, PatientRecord};
use careline_llm::{CompletionClient, EnhancementPrompt};
use careline_workflow::{
    detect_emergency, EmergencyTemplate, SideAction, WorkflowEngine, WorkflowOutcome,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::store::CallConversation;

/// A fully decided response for one user utterance
#[derive(Debug, Clone)]
pub struct GeneratedResponse {
    /// Text to speak
    pub text: String,
    /// Adherence transition to apply and persist, if any
    pub transition: Option<MedicationAdherenceState>,
    /// Side action to note on the patient's file, if any
    pub side_action: Option<SideAction>,
    /// Escalation protocol when an emergency was detected
    pub emergency: Option<EmergencyTemplate>,
}

impl GeneratedResponse {
    fn plain(text: String) -> Self {
        Self {
            text,
            transition: None,
            side_action: None,
            emergency: None,
        }
    }
}

/// Generates the agent's reply to a recognized utterance
pub struct ResponseGenerator {
    engine: WorkflowEngine,
    llm: Option<Arc<dyn CompletionClient>>,
    llm_timeout: Duration,
    context_turns: usize,
}

impl ResponseGenerator {
    pub fn new(
        engine: WorkflowEngine,
        llm: Option<Arc<dyn CompletionClient>>,
        llm_timeout: Duration,
        context_turns: usize,
    ) -> Self {
        Self {
            engine,
            llm,
            llm_timeout,
            context_turns,
        }
    }

    /// The greeting that opens the call: the patient's current workflow
    /// prompt when context exists, otherwise `None` and the caller uses the
    /// configured welcome message.
    pub fn greeting(&self, patient: Option<&PatientRecord>) -> Option<String> {
        patient.and_then(|p| self.engine.greeting(p))
    }

    /// Decide the response to one user utterance. Always produces text.
    pub async fn respond(
        &self,
        conversation: &CallConversation,
        user_text: &str,
    ) -> GeneratedResponse {
        if let Some(patient) = &conversation.patient {
            if let Some(outcome) =
                self.engine
                    .process_user_response(patient, user_text, conversation.turn_count)
            {
                return self.apply_outcome(conversation, user_text, outcome).await;
            }
        } else if let Some(emergency_type) = detect_emergency(user_text, &[]) {
            // No patient context, but emergencies still short-circuit.
            let template = self.engine.emergency_template(&emergency_type, None);
            return GeneratedResponse {
                text: template.immediate_response.clone(),
                transition: None,
                side_action: None,
                emergency: Some(template),
            };
        }

        let draft = fallback_response(user_text, conversation.turn_count);
        let text = self.enhance(conversation, user_text, draft).await;
        GeneratedResponse::plain(text)
    }

    async fn apply_outcome(
        &self,
        conversation: &CallConversation,
        user_text: &str,
        outcome: WorkflowOutcome,
    ) -> GeneratedResponse {
        match outcome {
            WorkflowOutcome::EmergencyEscalation { message, template } => GeneratedResponse {
                // Spoken exactly as templated.
                text: message,
                transition: None,
                side_action: None,
                emergency: Some(template),
            },
            WorkflowOutcome::StateTransition { new_state, message } => GeneratedResponse {
                text: self.enhance(conversation, user_text, message).await,
                transition: Some(new_state),
                side_action: None,
                emergency: None,
            },
            WorkflowOutcome::SideAction { action, message } => GeneratedResponse {
                text: self.enhance(conversation, user_text, message).await,
                transition: None,
                side_action: Some(action),
                emergency: None,
            },
            WorkflowOutcome::Continue { message } => {
                GeneratedResponse::plain(self.enhance(conversation, user_text, message).await)
            }
        }
    }

    /// Best-effort rephrasing. Timeouts and errors fall back to the draft.
    async fn enhance(
        &self,
        conversation: &CallConversation,
        user_text: &str,
        draft: String,
    ) -> String {
        let Some(client) = &self.llm else {
            return draft;
        };

        let prompt = EnhancementPrompt {
            draft_response: draft.clone(),
            user_text: user_text.to_string(),
            context: conversation.recent_turns(self.context_turns),
            patient: conversation.patient.clone(),
        };

        match tokio::time::timeout(self.llm_timeout, client.enhance(&prompt)).await {
            Ok(Ok(text)) => {
                debug!(call_id = %conversation.call_id, "response enhanced");
                text
            }
            Ok(Err(error)) => {
                warn!(call_id = %conversation.call_id, error = %error, "enhancement failed, using draft");
                draft
            }
            Err(_) => {
                warn!(call_id = %conversation.call_id, "enhancement timed out, using draft");
                draft
            }
        }
    }
}

/// General keyword rules for calls without an active workflow exchange
pub fn fallback_response(user_text: &str, turn_count: usize) -> String {
    let text = user_text.to_lowercase();

    if text.contains("appointment") || text.contains("schedule") {
        return "I can help you with appointments. Let me transfer you to our \
                scheduling department, or you can call us back during business hours."
            .to_string();
    }
    if text.contains("pain") || text.contains("hurt") || text.contains("sick") {
        return "I understand you're not feeling well. For medical concerns, I'd \
                recommend speaking with one of our healthcare professionals. Let me \
                transfer you to a nurse."
            .to_string();
    }
    if text.contains("medication") || text.contains("prescription") || text.contains("refill") {
        return "For medication questions and prescription refills, I can connect \
                you with our pharmacy team."
            .to_string();
    }
    if text.contains("hello") || text.contains("hi ") || text.starts_with("hi") {
        return "Hello! Thank you for taking this call. How can I assist you with \
                your healthcare needs today?"
            .to_string();
    }
    if text.contains("yes") || text.contains("yeah") {
        return "Great! How else can I assist you today?".to_string();
    }
    if text.contains("no") || text.contains("nope") {
        return "Alright. Is there anything else I can help you with?".to_string();
    }

    match turn_count {
        0 | 1 => "Thank you for sharing that. Can you tell me more about how I can \
                  help you today?"
            .to_string(),
        2 | 3 => "I want to make sure I help you properly. Could you tell me if this \
                  is about an appointment, a medication, or something else?"
            .to_string(),
        _ => "Let me connect you with one of our staff members who can better \
              assist you. Please hold."
            .to_string(),
    }
}
