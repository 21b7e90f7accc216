//! Medication-Adherence Workflow Engine
//!
//! Maps a patient's adherence state plus a recognized utterance to the next
//! state, required side-actions, and a canned prompt. Emergency detection
//! short-circuits everything else and is producible without any I/O, so an
//! escalation response can be delivered even when every other service is
//! degraded.

pub mod classify;
pub mod emergency;
pub mod engine;
pub mod prompts;
pub mod spec;

pub use classify::classify_response;
pub use emergency::{
    detect_emergency, EmergencyAction, EmergencyRecord, EmergencyTemplate, EMERGENCY_KEYWORDS,
};
pub use engine::{WorkflowEngine, WorkflowOutcome};
pub use spec::{NextStep, SideAction, WorkflowSpec};
