//! Call target registry
//!
//! Maps a call connection id to who the call is for, registered when the
//! outbound call is placed and released when the call ends. Target identity
//! resolution is three-tier: this registry first, then whatever identity the
//! conversation itself has learned, then the configured default.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Who an outbound call targets
#[derive(Debug, Clone)]
pub struct CallTarget {
    /// Dialed phone number
    pub identity: String,
    /// Patient whose workflow this call runs, if any
    pub patient_id: Option<String>,
    /// One-shot custom greeting overriding the workflow greeting
    pub custom_greeting: Option<String>,
}

impl CallTarget {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            patient_id: None,
            custom_greeting: None,
        }
    }

    pub fn with_patient(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.custom_greeting = Some(greeting.into());
        self
    }
}

/// Registry of call id to call target
pub struct CallRegistry {
    targets: RwLock<HashMap<String, CallTarget>>,
    default_identity: Option<String>,
}

impl CallRegistry {
    pub fn new(default_identity: Option<String>) -> Self {
        Self {
            targets: RwLock::new(HashMap::new()),
            default_identity,
        }
    }

    pub fn register(&self, call_id: impl Into<String>, target: CallTarget) {
        let call_id = call_id.into();
        debug!(call_id = %call_id, identity = %target.identity, "call target registered");
        self.targets.write().insert(call_id, target);
    }

    pub fn get(&self, call_id: &str) -> Option<CallTarget> {
        self.targets.read().get(call_id).cloned()
    }

    /// Release the mapping. Idempotent.
    pub fn release(&self, call_id: &str) {
        self.targets.write().remove(call_id);
    }

    /// Resolve the participant identity for a call: registered mapping, then
    /// the identity the conversation carries, then the configured default.
    pub fn resolve_identity(
        &self,
        call_id: &str,
        conversation_identity: Option<&str>,
    ) -> Option<String> {
        if let Some(target) = self.get(call_id) {
            return Some(target.identity);
        }
        if let Some(identity) = conversation_identity {
            return Some(identity.to_string());
        }
        self.default_identity.clone()
    }
}
