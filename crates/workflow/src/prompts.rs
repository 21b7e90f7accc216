//! Prompt templates interpolated with patient context
//!
//! Every template degrades gracefully: a patient with no medications on file
//! still gets a coherent sentence.

use careline_core::PatientRecord;

fn medication_list(patient: &PatientRecord) -> String {
    if patient.medications.is_empty() {
        "your new prescription".to_string()
    } else {
        patient.medication_names().join(" and ")
    }
}

/// Opening greeting for the initial-contact exchange
pub fn initial_contact(patient: &PatientRecord) -> String {
    format!(
        "Hello {}, this is a follow-up call from {}'s office about {}. Have you \
         been able to pick up your prescription from the pharmacy?",
        patient.name,
        patient.primary_doctor,
        medication_list(patient)
    )
}

/// Prompt once the medication is confirmed picked up
pub fn medication_pickup(patient: &PatientRecord) -> String {
    format!(
        "That's great, {}. Would now be a good time to quickly review how to \
         take your medication?",
        patient.name
    )
}

/// Dosage walkthrough, listing each medication's dosage and frequency
pub fn dosage_review(patient: &PatientRecord) -> String {
    if patient.medications.is_empty() {
        return format!(
            "{}, please take your medication exactly as written on the label. Do \
             those instructions make sense?",
            patient.name
        );
    }

    let instructions: Vec<String> = patient
        .medications
        .iter()
        .map(|m| format!("{} {} {}", m.name, m.dosage, m.frequency))
        .collect();

    format!(
        "{}, your instructions are: {}. Do those instructions make sense?",
        patient.name,
        instructions.join("; ")
    )
}

/// Closing once dosage instructions are confirmed understood
pub fn adherence_closing(patient: &PatientRecord) -> String {
    format!(
        "Wonderful, {}. You're all set with your medication. Is there anything \
         else I can help you with before we talk about your follow-up visit?",
        patient.name
    )
}

/// Offer to schedule the follow-up appointment
pub fn appointment_scheduling(patient: &PatientRecord) -> String {
    format!(
        "{}, {} would like to see you for a follow-up visit in about two weeks. \
         Would you like me to schedule that appointment now?",
        patient.name, patient.primary_doctor
    )
}

/// Confirmation after the follow-up is booked
pub fn followup_confirmation(patient: &PatientRecord) -> String {
    format!(
        "Your follow-up appointment with {} is all set, {}. You'll receive a \
         reminder the day before. Is there anything else I can help with?",
        patient.primary_doctor, patient.name
    )
}

/// Side-action acknowledgements. These keep the adherence state where it is.
pub mod actions {
    use careline_core::PatientRecord;
    use careline_config::FacilityConfig;

    pub fn schedule_pickup_reminder(patient: &PatientRecord, facility: &FacilityConfig) -> String {
        format!(
            "No problem, {}. I'll set a reminder for you to pick up your \
             prescription. If you have any trouble at the pharmacy, you can call \
             {} at {}.",
            patient.name, facility.facility_name, facility.facility_phone
        )
    }

    pub fn schedule_dosage_review(patient: &PatientRecord) -> String {
        format!(
            "That's fine, {}. We'll go over your dosage instructions another \
             time. In the meantime, the directions are on the label.",
            patient.name
        )
    }

    pub fn address_questions(patient: &PatientRecord) -> String {
        format!(
            "Of course, {}. What questions do you have about your medication?",
            patient.name
        )
    }

    pub fn clarify_dosage(patient: &PatientRecord) -> String {
        let detail = super::dosage_review(patient);
        format!("Let me go over that again more slowly. {}", detail)
    }

    pub fn schedule_followup(patient: &PatientRecord) -> String {
        format!(
            "That's okay, {}. {}'s office will reach out later to find a time \
             that works for you.",
            patient.name, patient.primary_doctor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careline_core::Medication;

    #[test]
    fn test_dosage_review_lists_medications() {
        let patient = PatientRecord::new("p-1", "Maria Garcia", "Dr. Chen")
            .with_medication(Medication::new("Lisinopril", "10mg", "once daily"));
        let prompt = dosage_review(&patient);
        assert!(prompt.contains("Lisinopril"));
        assert!(prompt.contains("10mg"));
        assert!(prompt.contains("once daily"));
    }

    #[test]
    fn test_prompts_degrade_without_medications() {
        let patient = PatientRecord::new("p-2", "James Lee", "Dr. Okafor");
        assert!(initial_contact(&patient).contains("your new prescription"));
        assert!(dosage_review(&patient).contains("as written on the label"));
    }
}
