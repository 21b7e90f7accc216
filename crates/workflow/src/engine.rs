//! Workflow engine
//!
//! Pure decision logic: given a patient record and a recognized utterance,
//! produce the next response and any state transition or side action. The
//! caller applies transitions to the patient record and persists them; the
//! engine itself holds no per-call state.

use careline_core::{MedicationAdherenceState, PatientRecord};
use careline_config::FacilityConfig;
use tracing::{debug, info, warn};

use crate::classify::classify_response;
use crate::emergency::{detect_emergency, EmergencyTemplate};
use crate::prompts;
use crate::spec::{NextStep, SideAction, WorkflowSpec};

/// Outcome of processing one patient utterance
#[derive(Debug, Clone)]
pub enum WorkflowOutcome {
    /// Emergency detected; escalate immediately. The message is spoken
    /// verbatim and never rephrased.
    EmergencyEscalation {
        message: String,
        template: EmergencyTemplate,
    },
    /// The response advances the adherence workflow
    StateTransition {
        new_state: MedicationAdherenceState,
        message: String,
    },
    /// The response queues a follow-up without advancing the state
    SideAction { action: SideAction, message: String },
    /// Unclassifiable response; re-prompt and stay put
    Continue { message: String },
}

impl WorkflowOutcome {
    /// The text to speak for this outcome
    pub fn message(&self) -> &str {
        match self {
            WorkflowOutcome::EmergencyEscalation { message, .. } => message,
            WorkflowOutcome::StateTransition { message, .. } => message,
            WorkflowOutcome::SideAction { message, .. } => message,
            WorkflowOutcome::Continue { message } => message,
        }
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, WorkflowOutcome::EmergencyEscalation { .. })
    }
}

/// Stateless workflow decision engine
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    facility: FacilityConfig,
}

impl WorkflowEngine {
    pub fn new(facility: FacilityConfig) -> Self {
        Self { facility }
    }

    /// The prompt that opens the patient's current workflow exchange
    pub fn greeting(&self, patient: &PatientRecord) -> Option<String> {
        WorkflowSpec::for_state(patient.adherence_state, patient).map(|spec| spec.greeting)
    }

    /// Build an escalation template outside of workflow processing, e.g. when
    /// the dispatcher detects an emergency on a call with no patient record.
    pub fn emergency_template(
        &self,
        emergency_type: &str,
        patient: Option<&PatientRecord>,
    ) -> EmergencyTemplate {
        EmergencyTemplate::build(emergency_type, patient, &self.facility)
    }

    /// Process one recognized utterance against the patient's current state.
    ///
    /// Built-in emergency keywords are checked before anything else, even
    /// when the workflow is complete and no exchange is active. Returns
    /// `None` only when there is no active exchange and no emergency, so the
    /// caller can fall back to general response rules.
    pub fn process_user_response(
        &self,
        patient: &PatientRecord,
        user_text: &str,
        retry_attempt: usize,
    ) -> Option<WorkflowOutcome> {
        let spec = WorkflowSpec::for_state(patient.adherence_state, patient);
        let triggers: &[&str] = spec
            .as_ref()
            .map(|s| s.escalation_triggers.as_slice())
            .unwrap_or(&[]);

        if let Some(emergency_type) = detect_emergency(user_text, triggers) {
            warn!(
                patient_id = %patient.patient_id,
                emergency_type = %emergency_type,
                "emergency detected, escalating"
            );
            let template = self.emergency_template(&emergency_type, Some(patient));
            return Some(WorkflowOutcome::EmergencyEscalation {
                message: template.immediate_response.clone(),
                template,
            });
        }

        let spec = spec?;

        match classify_response(user_text, &spec.expected_responses) {
            Some(label) => match spec.step_for(&label) {
                Some(NextStep::Transition(new_state)) => {
                    info!(
                        patient_id = %patient.patient_id,
                        from = patient.adherence_state.display_name(),
                        to = new_state.display_name(),
                        "adherence state transition"
                    );
                    Some(WorkflowOutcome::StateTransition {
                        message: self.transition_message(new_state, patient),
                        new_state,
                    })
                }
                Some(NextStep::Action(action)) => {
                    info!(
                        patient_id = %patient.patient_id,
                        action = action.display_name(),
                        "workflow side action"
                    );
                    Some(WorkflowOutcome::SideAction {
                        message: self.action_message(action, patient),
                        action,
                    })
                }
                None => {
                    debug!(label = %label, "classified label has no mapped step");
                    Some(WorkflowOutcome::Continue {
                        message: spec.retry_prompt(retry_attempt).to_string(),
                    })
                }
            },
            None => Some(WorkflowOutcome::Continue {
                message: spec.retry_prompt(retry_attempt).to_string(),
            }),
        }
    }

    /// Message spoken when entering `new_state`: the greeting of the next
    /// exchange, or a goodbye when the workflow completes.
    fn transition_message(
        &self,
        new_state: MedicationAdherenceState,
        patient: &PatientRecord,
    ) -> String {
        match WorkflowSpec::for_state(new_state, patient) {
            Some(next_spec) => next_spec.greeting,
            None => format!(
                "Thank you for your time today, {}. If anything comes up, you can \
                 always call {} at {}. Take care!",
                patient.name, self.facility.facility_name, self.facility.facility_phone
            ),
        }
    }

    fn action_message(&self, action: SideAction, patient: &PatientRecord) -> String {
        match action {
            SideAction::SchedulePickupReminder => {
                prompts::actions::schedule_pickup_reminder(patient, &self.facility)
            }
            SideAction::ScheduleDosageReview => prompts::actions::schedule_dosage_review(patient),
            SideAction::AddressQuestions => prompts::actions::address_questions(patient),
            SideAction::ClarifyDosage => prompts::actions::clarify_dosage(patient),
            SideAction::ScheduleFollowup => prompts::actions::schedule_followup(patient),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_core::Medication;

    fn engine() -> WorkflowEngine {
        WorkflowEngine::new(FacilityConfig::default())
    }

    fn patient_in(state: MedicationAdherenceState) -> PatientRecord {
        let mut patient = PatientRecord::new("p-1", "Maria Garcia", "Dr. Chen")
            .with_medication(Medication::new("Lisinopril", "10mg", "once daily"));
        patient.adherence_state = state;
        patient
    }

    #[test]
    fn test_yes_advances_from_initial_contact() {
        let patient = patient_in(MedicationAdherenceState::InitialContact);
        let outcome = engine()
            .process_user_response(&patient, "yes, I picked it up yesterday", 0)
            .unwrap();
        match outcome {
            WorkflowOutcome::StateTransition { new_state, .. } => {
                assert_eq!(new_state, MedicationAdherenceState::MedicationPickedUp);
            }
            other => panic!("expected transition, got {:?}", other),
        }
    }

    #[test]
    fn test_no_queues_pickup_reminder() {
        let patient = patient_in(MedicationAdherenceState::InitialContact);
        let outcome = engine()
            .process_user_response(&patient, "no, not yet", 0)
            .unwrap();
        match outcome {
            WorkflowOutcome::SideAction { action, message } => {
                assert_eq!(action, SideAction::SchedulePickupReminder);
                assert!(message.contains("reminder"));
            }
            other => panic!("expected side action, got {:?}", other),
        }
    }

    #[test]
    fn test_confused_patient_in_closing_gets_questions_addressed() {
        let patient = patient_in(MedicationAdherenceState::AdherenceCompleted);
        let outcome = engine()
            .process_user_response(&patient, "honestly I'm a bit confused", 0)
            .unwrap();
        match outcome {
            WorkflowOutcome::SideAction { action, .. } => {
                assert_eq!(action, SideAction::AddressQuestions);
            }
            other => panic!("expected side action, got {:?}", other),
        }
    }

    #[test]
    fn test_emergency_short_circuits_classification() {
        // "yes" would normally advance the state, but the emergency keyword
        // must win.
        let patient = patient_in(MedicationAdherenceState::InitialContact);
        let outcome = engine()
            .process_user_response(&patient, "yes, but I'm having chest pain", 0)
            .unwrap();
        assert!(outcome.is_emergency());
        match outcome {
            WorkflowOutcome::EmergencyEscalation { template, .. } => {
                assert_eq!(template.record.emergency_type, "chest pain");
            }
            other => panic!("expected escalation, got {:?}", other),
        }
    }

    #[test]
    fn test_confusion_triggers_dosage_clarification() {
        let patient = patient_in(MedicationAdherenceState::DosageDiscussed);
        let outcome = engine()
            .process_user_response(&patient, "I don't understand the instructions", 0)
            .unwrap();
        match outcome {
            WorkflowOutcome::SideAction { action, message } => {
                assert_eq!(action, SideAction::ClarifyDosage);
                assert!(message.contains("Lisinopril"));
                assert!(message.contains("10mg"));
                assert!(message.contains("once daily"));
            }
            other => panic!("expected clarification, got {:?}", other),
        }
    }

    #[test]
    fn test_unclassified_response_gets_retry_prompt() {
        let patient = patient_in(MedicationAdherenceState::InitialContact);
        let outcome = engine()
            .process_user_response(&patient, "the weather is lovely", 0)
            .unwrap();
        assert!(matches!(outcome, WorkflowOutcome::Continue { .. }));
    }

    #[test]
    fn test_complete_workflow_defers_to_fallback_rules() {
        let patient = patient_in(MedicationAdherenceState::WorkflowComplete);
        assert!(engine()
            .process_user_response(&patient, "thanks again", 0)
            .is_none());
        // Emergencies still escalate after completion.
        assert!(engine()
            .process_user_response(&patient, "I think I'm having an allergic reaction", 0)
            .is_some());
    }

    #[test]
    fn test_completion_message_says_goodbye() {
        let patient = patient_in(MedicationAdherenceState::FollowUpScheduled);
        let outcome = engine()
            .process_user_response(&patient, "okay, thank you", 0)
            .unwrap();
        match outcome {
            WorkflowOutcome::StateTransition { new_state, message } => {
                assert_eq!(new_state, MedicationAdherenceState::WorkflowComplete);
                assert!(message.contains("Take care"));
            }
            other => panic!("expected transition, got {:?}", other),
        }
    }
}
