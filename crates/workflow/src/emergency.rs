//! Emergency detection and the escalation protocol
//!
//! Detection is keyword-based over a built-in list plus any state-specific
//! triggers. Template construction is pure: no clock beyond `Utc::now`, no
//! network, no store, so an escalation response is always producible even
//! when every downstream service is failing.

use careline_core::{EmergencyContact, EmergencyPriority, PatientRecord};
use careline_config::FacilityConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phrases that always trigger escalation, in any workflow state
pub const EMERGENCY_KEYWORDS: &[&str] = &[
    "chest pain",
    "can't breathe",
    "cannot breathe",
    "allergic reaction",
    "overdose",
    "severe pain",
    "bleeding",
    "unconscious",
    "911",
    "emergency",
];

/// Scan an utterance for emergency keywords and state-specific triggers.
///
/// Returns the matched phrase, which becomes the recorded emergency type.
pub fn detect_emergency(user_text: &str, extra_triggers: &[&str]) -> Option<String> {
    let text = user_text.to_lowercase();

    EMERGENCY_KEYWORDS
        .iter()
        .chain(extra_triggers.iter())
        .find(|keyword| text.contains(&keyword.to_lowercase()))
        .map(|keyword| keyword.to_string())
}

/// Mandatory follow-ups once an emergency is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyAction {
    TransferToHealthcareProfessional,
    LogEmergencyContact,
    NotifyPrimaryDoctor,
    DocumentIncident,
}

/// Audit record of an escalation, written to the patient's notes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyRecord {
    pub timestamp: DateTime<Utc>,
    pub patient_id: Option<String>,
    pub emergency_type: String,
    pub agent_response: String,
    pub outcome: String,
}

/// Everything the dispatcher needs to run the escalation protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyTemplate {
    pub immediate_response: String,
    pub priority: EmergencyPriority,
    pub required_actions: Vec<EmergencyAction>,
    pub escalation_contacts: Vec<EmergencyContact>,
    pub record: EmergencyRecord,
}

impl EmergencyTemplate {
    /// Build the escalation template for a detected emergency.
    ///
    /// The immediate response is spoken verbatim to the caller; it is never
    /// rephrased by the LLM enhancement layer.
    pub fn build(
        emergency_type: &str,
        patient: Option<&PatientRecord>,
        facility: &FacilityConfig,
    ) -> Self {
        let name = patient.map(|p| p.name.as_str()).unwrap_or("there");

        let immediate_response = format!(
            "{}, I understand you may be experiencing a medical emergency. I'm \
             connecting you with a healthcare professional right away. If this is \
             life-threatening, please hang up and call {} immediately.",
            name, facility.emergency_phone
        );

        let mut escalation_contacts = vec![
            EmergencyContact::new("emergency_services", &facility.emergency_phone),
            EmergencyContact::new("urgent_care", &facility.urgent_care_phone),
            EmergencyContact::new(facility.facility_name.as_str(), &facility.facility_phone),
        ];
        if let Some(patient) = patient {
            escalation_contacts.extend(patient.emergency_contacts.iter().cloned());
        }

        Self {
            immediate_response,
            priority: EmergencyPriority::High,
            required_actions: vec![
                EmergencyAction::TransferToHealthcareProfessional,
                EmergencyAction::LogEmergencyContact,
                EmergencyAction::NotifyPrimaryDoctor,
                EmergencyAction::DocumentIncident,
            ],
            escalation_contacts,
            record: EmergencyRecord {
                timestamp: Utc::now(),
                patient_id: patient.map(|p| p.patient_id.clone()),
                emergency_type: emergency_type.to_string(),
                agent_response: "immediate_escalation".to_string(),
                outcome: "pending_human_intervention".to_string(),
            },
        }
    }
}
