//! Per-call conversation state
//!
//! The store is a map of call id to a handle wrapping the call's state in an
//! async mutex. Holding the handle's mutex across await points is what
//! serializes event handling per call; the outer map lock is only ever taken
//! for map operations and released before any await.

use careline_core::{CallStage, PatientRecord, RecognitionMode, Speaker, Turn};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared handle to one call's conversation state
pub type CallHandle = Arc<Mutex<CallConversation>>;

/// Mutable state of one active call
#[derive(Debug)]
pub struct CallConversation {
    pub call_id: String,
    pub stage: CallStage,
    pub recognition_mode: RecognitionMode,
    /// Number of user turns so far; drives simulated-utterance rotation and
    /// fallback phrasing
    pub turn_count: usize,
    pub transcript: Vec<Turn>,
    /// Identity of the person on the call, when known
    pub target_identity: Option<String>,
    /// Patient context loaded at call start, if any
    pub patient: Option<PatientRecord>,
    /// Latched on first emergency; never auto-cleared
    pub emergency_detected: bool,
    /// Hang up once the current playback finishes
    pub pending_hangup: bool,
    /// When the current listen window opened
    pub listen_started_at: Option<Instant>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl CallConversation {
    fn new(call_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            call_id: call_id.into(),
            stage: CallStage::default(),
            recognition_mode: RecognitionMode::default(),
            turn_count: 0,
            transcript: Vec::new(),
            target_identity: None,
            patient: None,
            emergency_detected: false,
            pending_hangup: false,
            listen_started_at: None,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn set_stage(&mut self, stage: CallStage) {
        debug!(
            call_id = %self.call_id,
            from = self.stage.display_name(),
            to = stage.display_name(),
            "call stage transition"
        );
        self.stage = stage;
        self.last_updated = Utc::now();
    }

    /// Append a transcript entry; user turns advance the turn counter
    pub fn add_turn(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.transcript.push(Turn::new(speaker, text));
        if speaker == Speaker::User {
            self.turn_count += 1;
        }
        self.last_updated = Utc::now();
    }

    /// The last `n` transcript entries, oldest first
    pub fn recent_turns(&self, n: usize) -> Vec<Turn> {
        let start = self.transcript.len().saturating_sub(n);
        self.transcript[start..].to_vec()
    }

    pub fn is_terminated(&self) -> bool {
        self.stage == CallStage::Terminated
    }
}

/// All active call conversations
#[derive(Default)]
pub struct ConversationStore {
    calls: RwLock<HashMap<String, CallHandle>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the call's handle, creating fresh state on first sight.
    /// Idempotent: repeated calls return the same handle.
    pub fn get_or_create(&self, call_id: &str) -> CallHandle {
        if let Some(handle) = self.calls.read().get(call_id) {
            return Arc::clone(handle);
        }

        let mut calls = self.calls.write();
        Arc::clone(
            calls
                .entry(call_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(CallConversation::new(call_id)))),
        )
    }

    pub fn get(&self, call_id: &str) -> Option<CallHandle> {
        self.calls.read().get(call_id).map(Arc::clone)
    }

    /// Drop the call's state. Idempotent; in-flight holders of the handle
    /// keep it alive until they finish.
    pub fn remove(&self, call_id: &str) -> Option<CallHandle> {
        self.calls.write().remove(call_id)
    }

    pub fn len(&self) -> usize {
        self.calls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.read().is_empty()
    }

    pub fn active_call_ids(&self) -> Vec<String> {
        self.calls.read().keys().cloned().collect()
    }
}
