//! Core types for the Careline voice agent
//!
//! This crate provides foundational types used across all other crates:
//! - Conversation turns, stages, and recognition modes
//! - Normalized speech recognition results
//! - Patient and medication-adherence types

pub mod conversation;
pub mod patient;
pub mod speech;

pub use conversation::{CallStage, RecognitionMode, Speaker, Turn};
pub use patient::{
    EmergencyContact, EmergencyPriority, Medication, MedicationAdherenceState, PatientRecord,
};
pub use speech::RecognizedSpeech;
