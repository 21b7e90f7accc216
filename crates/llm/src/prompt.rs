//! Prompt assembly for response enhancement

use careline_core::{PatientRecord, Speaker, Turn};

/// Builds the system and user messages for one enhancement request
#[derive(Debug, Clone)]
pub struct EnhancementPrompt {
    /// Scripted response the model should rephrase
    pub draft_response: String,
    /// What the patient just said
    pub user_text: String,
    /// Most recent transcript turns, oldest first
    pub context: Vec<Turn>,
    /// Optional patient context for tone and personalization
    pub patient: Option<PatientRecord>,
}

impl EnhancementPrompt {
    pub fn system_message(&self) -> String {
        let mut message = String::from(
            "You are a warm, professional healthcare assistant on a phone call \
             with a patient. Rephrase the scripted response you are given so it \
             sounds natural and conversational, keeping every piece of medical \
             information exactly as stated. Keep it brief: this will be read \
             aloud. Never add medical advice that is not in the script.",
        );
        if let Some(patient) = &self.patient {
            message.push_str(&format!(
                " The patient's name is {} and their doctor is {}.",
                patient.name, patient.primary_doctor
            ));
        }
        message
    }

    pub fn user_message(&self) -> String {
        let mut message = String::new();
        if !self.context.is_empty() {
            message.push_str("Recent conversation:\n");
            for turn in &self.context {
                let speaker = match turn.speaker {
                    Speaker::User => "Patient",
                    Speaker::Assistant => "Assistant",
                };
                message.push_str(&format!("{}: {}\n", speaker, turn.text));
            }
            message.push('\n');
        }
        message.push_str(&format!("Patient just said: {}\n\n", self.user_text));
        message.push_str(&format!("Scripted response: {}", self.draft_response));
        message
    }
}
