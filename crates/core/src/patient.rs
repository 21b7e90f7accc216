//! Patient and medication-adherence types
//!
//! The call core treats the patient record as read-mostly input to the
//! workflow engine; only adherence-state transitions and appended notes are
//! written back, best-effort.

use serde::{Deserialize, Serialize};

/// One prescribed medication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
}

impl Medication {
    pub fn new(
        name: impl Into<String>,
        dosage: impl Into<String>,
        frequency: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dosage: dosage.into(),
            frequency: frequency.into(),
        }
    }
}

/// Position within the scripted medication-follow-up workflow.
///
/// Transitions are one-directional in the common path; side-branch actions
/// (pickup reminders, dosage clarification) do not move this enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum MedicationAdherenceState {
    #[default]
    InitialContact,
    MedicationPickedUp,
    DosageDiscussed,
    AdherenceCompleted,
    SchedulingStarted,
    FollowUpScheduled,
    WorkflowComplete,
}

impl MedicationAdherenceState {
    pub fn display_name(&self) -> &'static str {
        match self {
            MedicationAdherenceState::InitialContact => "initial_contact",
            MedicationAdherenceState::MedicationPickedUp => "medication_picked_up",
            MedicationAdherenceState::DosageDiscussed => "dosage_discussed",
            MedicationAdherenceState::AdherenceCompleted => "adherence_completed",
            MedicationAdherenceState::SchedulingStarted => "scheduling_started",
            MedicationAdherenceState::FollowUpScheduled => "follow_up_scheduled",
            MedicationAdherenceState::WorkflowComplete => "workflow_complete",
        }
    }

    /// The natural next state on the common path, if any
    pub fn next(&self) -> Option<MedicationAdherenceState> {
        match self {
            MedicationAdherenceState::InitialContact => {
                Some(MedicationAdherenceState::MedicationPickedUp)
            }
            MedicationAdherenceState::MedicationPickedUp => {
                Some(MedicationAdherenceState::DosageDiscussed)
            }
            MedicationAdherenceState::DosageDiscussed => {
                Some(MedicationAdherenceState::AdherenceCompleted)
            }
            MedicationAdherenceState::AdherenceCompleted => {
                Some(MedicationAdherenceState::SchedulingStarted)
            }
            MedicationAdherenceState::SchedulingStarted => {
                Some(MedicationAdherenceState::FollowUpScheduled)
            }
            MedicationAdherenceState::FollowUpScheduled => {
                Some(MedicationAdherenceState::WorkflowComplete)
            }
            MedicationAdherenceState::WorkflowComplete => None,
        }
    }
}

/// Emergency priority levels for safety protocols.
///
/// Once escalated to High/Critical for a call, the conversation stays marked
/// as emergency-detected; later turns never auto-downgrade it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum EmergencyPriority {
    #[default]
    None,
    Low,
    Moderate,
    High,
    Critical,
}

impl EmergencyPriority {
    pub fn requires_escalation(&self) -> bool {
        *self >= EmergencyPriority::High
    }
}

/// An emergency escalation contact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub label: String,
    pub number: String,
}

impl EmergencyContact {
    pub fn new(label: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            number: number.into(),
        }
    }
}

/// Patient adherence context loaded from the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: String,
    pub name: String,
    pub primary_doctor: String,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub adherence_state: MedicationAdherenceState,
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContact>,
}

impl PatientRecord {
    pub fn new(
        patient_id: impl Into<String>,
        name: impl Into<String>,
        primary_doctor: impl Into<String>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            name: name.into(),
            primary_doctor: primary_doctor.into(),
            medications: Vec::new(),
            adherence_state: MedicationAdherenceState::default(),
            emergency_contacts: Vec::new(),
        }
    }

    /// Add a medication (builder style)
    pub fn with_medication(mut self, medication: Medication) -> Self {
        self.medications.push(medication);
        self
    }

    /// Names of all prescribed medications
    pub fn medication_names(&self) -> Vec<&str> {
        self.medications.iter().map(|m| m.name.as_str()).collect()
    }
}
