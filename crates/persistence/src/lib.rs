//! Patient record store
//!
//! The call core reads patient context at call start and writes back two
//! things, both best-effort: adherence-state transitions and timestamped care
//! notes (emergency incidents, scheduled follow-ups). A store failure never
//! fails a call.

pub mod patients;

pub use patients::{MemoryPatientStore, PatientNote, PatientStore};

use thiserror::Error;

/// Store errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Patient not found: {0}")]
    NotFound(String),

    #[error("Store operation failed: {0}")]
    Store(String),
}
