//! Patient store trait and the in-memory implementation

use async_trait::async_trait;
use careline_core::{MedicationAdherenceState, PatientRecord};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::PersistenceError;

/// A timestamped care note on a patient's file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientNote {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub text: String,
}

impl PatientNote {
    pub fn new(category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            category: category.into(),
            text: text.into(),
        }
    }
}

/// Read patient context and write back workflow progress
#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn get_patient(&self, patient_id: &str) -> Result<PatientRecord, PersistenceError>;

    async fn update_adherence_state(
        &self,
        patient_id: &str,
        state: MedicationAdherenceState,
    ) -> Result<(), PersistenceError>;

    async fn append_note(
        &self,
        patient_id: &str,
        note: PatientNote,
    ) -> Result<(), PersistenceError>;
}

#[derive(Default)]
struct PatientEntry {
    record: Option<PatientRecord>,
    notes: Vec<PatientNote>,
}

/// In-memory patient store for development and tests
#[derive(Default)]
pub struct MemoryPatientStore {
    patients: RwLock<HashMap<String, PatientEntry>>,
}

impl MemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a patient record
    pub fn insert(&self, record: PatientRecord) {
        let mut patients = self.patients.write();
        let entry = patients.entry(record.patient_id.clone()).or_default();
        entry.record = Some(record);
    }

    /// Notes on file for a patient, oldest first
    pub fn notes(&self, patient_id: &str) -> Vec<PatientNote> {
        self.patients
            .read()
            .get(patient_id)
            .map(|entry| entry.notes.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PatientStore for MemoryPatientStore {
    async fn get_patient(&self, patient_id: &str) -> Result<PatientRecord, PersistenceError> {
        self.patients
            .read()
            .get(patient_id)
            .and_then(|entry| entry.record.clone())
            .ok_or_else(|| PersistenceError::NotFound(patient_id.to_string()))
    }

    async fn update_adherence_state(
        &self,
        patient_id: &str,
        state: MedicationAdherenceState,
    ) -> Result<(), PersistenceError> {
        let mut patients = self.patients.write();
        let record = patients
            .get_mut(patient_id)
            .and_then(|entry| entry.record.as_mut())
            .ok_or_else(|| PersistenceError::NotFound(patient_id.to_string()))?;

        info!(
            patient_id = %patient_id,
            state = state.display_name(),
            "adherence state persisted"
        );
        record.adherence_state = state;
        Ok(())
    }

    async fn append_note(
        &self,
        patient_id: &str,
        note: PatientNote,
    ) -> Result<(), PersistenceError> {
        let mut patients = self.patients.write();
        let entry = patients
            .get_mut(patient_id)
            .ok_or_else(|| PersistenceError::NotFound(patient_id.to_string()))?;

        debug!(patient_id = %patient_id, category = %note.category, "care note appended");
        entry.notes.push(note);
        Ok(())
    }
}
