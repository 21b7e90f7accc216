//! Per-state workflow definitions
//!
//! Each adherence state that expects a patient response carries a
//! [`WorkflowSpec`]: the prompt that opened the exchange, the response labels
//! we know how to act on, the action each label maps to, state-specific
//! escalation triggers, and retry prompts for unclassifiable replies.

use careline_core::{MedicationAdherenceState, PatientRecord};
use serde::{Deserialize, Serialize};

use crate::prompts;

/// A deferred follow-up that does not advance the adherence state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideAction {
    SchedulePickupReminder,
    ScheduleDosageReview,
    AddressQuestions,
    ClarifyDosage,
    ScheduleFollowup,
}

impl SideAction {
    pub fn display_name(&self) -> &'static str {
        match self {
            SideAction::SchedulePickupReminder => "schedule_pickup_reminder",
            SideAction::ScheduleDosageReview => "schedule_dosage_review",
            SideAction::AddressQuestions => "address_questions",
            SideAction::ClarifyDosage => "clarify_dosage",
            SideAction::ScheduleFollowup => "schedule_followup",
        }
    }
}

/// What a classified response label leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Advance the adherence state
    Transition(MedicationAdherenceState),
    /// Stay in the current state and queue a side action
    Action(SideAction),
}

/// The scripted exchange for one adherence state.
///
/// `expected_responses` are checked in order by the classifier, so the most
/// specific labels come first.
#[derive(Debug, Clone)]
pub struct WorkflowSpec {
    pub greeting: String,
    pub expected_responses: Vec<&'static str>,
    pub next_actions: Vec<(&'static str, NextStep)>,
    pub escalation_triggers: Vec<&'static str>,
    pub retry_prompts: Vec<&'static str>,
}

impl WorkflowSpec {
    /// The workflow exchange for `state`, with prompts personalized to the
    /// patient. `WorkflowComplete` has no further exchange.
    pub fn for_state(state: MedicationAdherenceState, patient: &PatientRecord) -> Option<Self> {
        use MedicationAdherenceState::*;
        use NextStep::*;

        match state {
            InitialContact => Some(Self {
                greeting: prompts::initial_contact(patient),
                expected_responses: vec!["not yet", "picked up", "yes", "no"],
                next_actions: vec![
                    ("yes", Transition(MedicationPickedUp)),
                    ("picked_up", Transition(MedicationPickedUp)),
                    ("no", Action(SideAction::SchedulePickupReminder)),
                    ("not_yet", Action(SideAction::SchedulePickupReminder)),
                ],
                escalation_triggers: vec!["urgent", "reaction"],
                retry_prompts: vec![
                    "I want to make sure I heard you correctly. Have you been able to \
                     pick up your prescription yet?",
                    "Just to confirm, do you have your medication with you?",
                ],
            }),
            MedicationPickedUp => Some(Self {
                greeting: prompts::medication_pickup(patient),
                expected_responses: vec!["later", "ready", "yes", "no"],
                next_actions: vec![
                    ("yes", Transition(DosageDiscussed)),
                    ("ready", Transition(DosageDiscussed)),
                    ("no", Action(SideAction::ScheduleDosageReview)),
                    ("later", Action(SideAction::ScheduleDosageReview)),
                ],
                escalation_triggers: vec!["concerned", "side effects"],
                retry_prompts: vec![
                    "Would now be a good time to go over how to take your medication?",
                    "Shall we review your dosage instructions together?",
                ],
            }),
            DosageDiscussed => Some(Self {
                greeting: prompts::dosage_review(patient),
                expected_responses: vec!["confused", "questions", "understood", "clear"],
                next_actions: vec![
                    ("understood", Transition(AdherenceCompleted)),
                    ("clear", Transition(AdherenceCompleted)),
                    ("questions", Action(SideAction::AddressQuestions)),
                    ("confused", Action(SideAction::ClarifyDosage)),
                ],
                escalation_triggers: vec!["allergic", "reaction"],
                retry_prompts: vec![
                    "Do those instructions make sense, or would you like me to go over \
                     them again?",
                    "Is anything about your dosage unclear?",
                ],
            }),
            AdherenceCompleted => Some(Self {
                greeting: prompts::adherence_closing(patient),
                expected_responses: vec!["thank you", "questions", "okay"],
                next_actions: vec![
                    ("thank_you", Transition(SchedulingStarted)),
                    ("okay", Transition(SchedulingStarted)),
                    ("questions", Action(SideAction::AddressQuestions)),
                ],
                escalation_triggers: vec!["urgent"],
                retry_prompts: vec![
                    "Before we wrap up, is there anything else about your medication I \
                     can help with?",
                ],
            }),
            SchedulingStarted => Some(Self {
                greeting: prompts::appointment_scheduling(patient),
                expected_responses: vec!["yes", "no"],
                next_actions: vec![
                    ("yes", Transition(FollowUpScheduled)),
                    ("no", Action(SideAction::ScheduleFollowup)),
                ],
                escalation_triggers: vec!["urgent"],
                retry_prompts: vec![
                    "Would you like me to set up a follow-up appointment with your doctor?",
                ],
            }),
            FollowUpScheduled => Some(Self {
                greeting: prompts::followup_confirmation(patient),
                expected_responses: vec!["thank you", "okay", "yes"],
                next_actions: vec![
                    ("thank_you", Transition(WorkflowComplete)),
                    ("okay", Transition(WorkflowComplete)),
                    ("yes", Transition(WorkflowComplete)),
                ],
                escalation_triggers: vec!["urgent"],
                retry_prompts: vec!["Is there anything else I can help you with today?"],
            }),
            WorkflowComplete => None,
        }
    }

    /// The next step for a classified label, if the label is actionable
    pub fn step_for(&self, label: &str) -> Option<NextStep> {
        self.next_actions
            .iter()
            .find(|(candidate, _)| *candidate == label)
            .map(|(_, step)| *step)
    }

    /// Retry prompt for the given attempt number, clamping at the last one
    pub fn retry_prompt(&self, attempt: usize) -> &str {
        let index = attempt.min(self.retry_prompts.len().saturating_sub(1));
        self.retry_prompts[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_core::Medication;

    fn patient() -> PatientRecord {
        PatientRecord::new("p-1", "Maria Garcia", "Dr. Chen")
            .with_medication(Medication::new("Lisinopril", "10mg", "once daily"))
    }

    #[test]
    fn test_every_non_terminal_state_has_a_spec() {
        use MedicationAdherenceState::*;
        let patient = patient();
        for state in [
            InitialContact,
            MedicationPickedUp,
            DosageDiscussed,
            AdherenceCompleted,
            SchedulingStarted,
            FollowUpScheduled,
        ] {
            let spec = WorkflowSpec::for_state(state, &patient);
            assert!(spec.is_some(), "missing spec for {:?}", state);
            let spec = spec.unwrap();
            assert!(!spec.greeting.is_empty());
            assert!(!spec.retry_prompts.is_empty());
        }
        assert!(WorkflowSpec::for_state(WorkflowComplete, &patient).is_none());
    }

    #[test]
    fn test_initial_contact_transitions() {
        let spec = WorkflowSpec::for_state(MedicationAdherenceState::InitialContact, &patient())
            .unwrap();
        assert_eq!(
            spec.step_for("yes"),
            Some(NextStep::Transition(
                MedicationAdherenceState::MedicationPickedUp
            ))
        );
        assert_eq!(
            spec.step_for("no"),
            Some(NextStep::Action(SideAction::SchedulePickupReminder))
        );
        assert_eq!(spec.step_for("maybe"), None);
    }

    #[test]
    fn test_retry_prompt_clamps() {
        let spec = WorkflowSpec::for_state(MedicationAdherenceState::InitialContact, &patient())
            .unwrap();
        assert_eq!(spec.retry_prompt(0), spec.retry_prompts[0]);
        assert_eq!(spec.retry_prompt(7), spec.retry_prompts[1]);
    }
}
