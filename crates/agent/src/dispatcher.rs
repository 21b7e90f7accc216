//! Webhook event dispatcher and call lifecycle API
//!
//! [`CallAgent`] is the entry point the HTTP layer talks to: it places
//! outbound calls, consumes vendor webhook batches, and exposes call
//! snapshots. Events for one call are serialized by that call's mutex;
//! events in one webhook batch are applied in arrival order.

use careline_config::Settings;
use careline_core::{CallStage, RecognitionMode, Speaker};
use careline_llm::CompletionClient;
use careline_persistence::{PatientNote, PatientStore};
use careline_telephony::{CallClient, CallEvent, EventEnvelope, TelephonyError};
use careline_workflow::{EmergencyTemplate, SideAction, WorkflowEngine};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::generator::ResponseGenerator;
use crate::orchestrator::{
    ListenTimeout, RecognitionOrchestrator, DTMF_MENU_PROMPT, ERROR_TRANSFER_MESSAGE,
    RETRY_MESSAGE,
};
use crate::registry::{CallRegistry, CallTarget};
use crate::store::{CallConversation, ConversationStore};

/// Request to place an outbound call
#[derive(Debug, Clone)]
pub struct StartCallRequest {
    pub target_number: String,
    pub patient_id: Option<String>,
    pub custom_greeting: Option<String>,
}

/// Read-only view of one call's state
#[derive(Debug, Clone, Serialize)]
pub struct CallSnapshot {
    pub call_id: String,
    pub stage: String,
    pub recognition_mode: String,
    pub turn_count: usize,
    pub transcript_len: usize,
    pub emergency_detected: bool,
    pub target_identity: Option<String>,
    pub patient_id: Option<String>,
    /// Vendor-side call state; "disconnected_or_invalid" when the vendor no
    /// longer knows the call
    pub vendor_state: String,
}

/// The call agent: outbound dialing, webhook dispatch, call inspection
#[derive(Clone)]
pub struct CallAgent {
    store: Arc<ConversationStore>,
    registry: Arc<CallRegistry>,
    orchestrator: Arc<RecognitionOrchestrator>,
    generator: Arc<ResponseGenerator>,
    client: Arc<dyn CallClient>,
    patients: Arc<dyn PatientStore>,
    welcome_message: String,
    source_caller_id: String,
    callback_url: String,
    voice: String,
}

impl CallAgent {
    pub fn new(
        settings: &Settings,
        client: Arc<dyn CallClient>,
        llm: Option<Arc<dyn CompletionClient>>,
        patients: Arc<dyn PatientStore>,
    ) -> Self {
        let engine = WorkflowEngine::new(settings.facility.clone());
        let generator = ResponseGenerator::new(
            engine,
            llm,
            Duration::from_millis(settings.llm.timeout_ms),
            settings.conversation.context_turns,
        );
        let orchestrator = RecognitionOrchestrator::new(
            Arc::clone(&client),
            Duration::from_secs(settings.conversation.simulation_timeout_secs),
            Duration::from_secs(settings.conversation.vendor_timeout_secs),
        );

        Self {
            store: Arc::new(ConversationStore::new()),
            registry: Arc::new(CallRegistry::new(settings.telephony.default_target.clone())),
            orchestrator: Arc::new(orchestrator),
            generator: Arc::new(generator),
            client,
            patients,
            welcome_message: settings.telephony.welcome_message.clone(),
            source_caller_id: settings.telephony.source_caller_id.clone(),
            callback_url: settings.telephony.callback_url(),
            voice: settings.telephony.tts_voice.clone(),
        }
    }

    /// Place an outbound call and register its target. Returns the vendor's
    /// call connection id.
    pub async fn start_call(&self, request: StartCallRequest) -> Result<String, TelephonyError> {
        let call_id = self
            .client
            .create_call(
                &request.target_number,
                &self.source_caller_id,
                &self.callback_url,
            )
            .await?;

        let mut target = CallTarget::new(&request.target_number);
        if let Some(patient_id) = request.patient_id {
            target = target.with_patient(patient_id);
        }
        if let Some(greeting) = request.custom_greeting {
            target = target.with_greeting(greeting);
        }
        self.registry.register(&call_id, target);

        info!(call_id = %call_id, target = %request.target_number, "outbound call placed");
        Ok(call_id)
    }

    /// Snapshot of one call, if it is active
    pub async fn call_snapshot(&self, call_id: &str) -> Option<CallSnapshot> {
        let handle = self.store.get(call_id)?;
        let vendor_state = self
            .client
            .get_call_state(call_id)
            .await
            .unwrap_or_else(|_| "disconnected_or_invalid".to_string());

        let conversation = handle.lock().await;
        Some(CallSnapshot {
            call_id: conversation.call_id.clone(),
            stage: conversation.stage.display_name().to_string(),
            recognition_mode: conversation.recognition_mode.display_name().to_string(),
            turn_count: conversation.turn_count,
            transcript_len: conversation.transcript.len(),
            emergency_detected: conversation.emergency_detected,
            target_identity: conversation.target_identity.clone(),
            patient_id: conversation
                .patient
                .as_ref()
                .map(|p| p.patient_id.clone()),
            vendor_state,
        })
    }

    pub fn active_calls(&self) -> Vec<String> {
        self.store.active_call_ids()
    }

    /// Apply one webhook batch in arrival order
    pub async fn dispatch_batch(&self, envelopes: Vec<EventEnvelope>) {
        for envelope in envelopes {
            self.dispatch(envelope).await;
        }
    }

    /// Apply a single webhook event. Never fails the webhook: errors are
    /// logged and the call degrades or terminates.
    pub async fn dispatch(&self, envelope: EventEnvelope) {
        let call_id = envelope.call_id.clone();
        let event = envelope.event();
        debug!(call_id = %call_id, event = %envelope.event_type, "dispatching call event");

        match event {
            CallEvent::CallConnected => self.on_connected(&call_id).await,
            CallEvent::PlayCompleted => self.on_play_completed(&call_id).await,
            CallEvent::PlayFailed => self.on_play_failed(&call_id).await,
            CallEvent::RecognizeCompleted { speech, dtmf } => {
                self.on_recognize_completed(&call_id, speech, dtmf).await
            }
            CallEvent::RecognizeFailed => self.on_recognize_failed(&call_id).await,
            CallEvent::CallDisconnected => self.on_disconnected(&call_id).await,
            CallEvent::Unknown(event_type) => {
                debug!(call_id = %call_id, event_type = %event_type, "ignoring unhandled event");
            }
        }
    }

    async fn on_connected(&self, call_id: &str) {
        let handle = self.store.get_or_create(call_id);
        let mut conversation = handle.lock().await;
        if conversation.stage != CallStage::Idle {
            // Duplicate connect; the first one already greeted.
            debug!(call_id = %call_id, "duplicate CallConnected ignored");
            return;
        }

        let target = self.registry.get(call_id);
        conversation.target_identity = self
            .registry
            .resolve_identity(call_id, conversation.target_identity.as_deref());

        if let Some(patient_id) = target.as_ref().and_then(|t| t.patient_id.as_deref()) {
            match self.patients.get_patient(patient_id).await {
                Ok(patient) => conversation.patient = Some(patient),
                Err(error) => {
                    warn!(call_id = %call_id, patient_id = %patient_id, error = %error,
                        "patient lookup failed, continuing without context");
                }
            }
        }

        let greeting = target
            .and_then(|t| t.custom_greeting)
            .or_else(|| self.generator.greeting(conversation.patient.as_ref()))
            .unwrap_or_else(|| self.welcome_message.clone());

        conversation.add_turn(Speaker::Assistant, &greeting);
        conversation.set_stage(CallStage::GreetingPlayed);

        if let Err(error) = self.client.play_text(call_id, &greeting, &self.voice).await {
            error!(call_id = %call_id, error = %error, "greeting playback failed");
            self.terminate(&mut conversation).await;
        }
    }

    async fn on_play_completed(&self, call_id: &str) {
        let Some(handle) = self.store.get(call_id) else {
            debug!(call_id = %call_id, "PlayCompleted for unknown call discarded");
            return;
        };
        let mut conversation = handle.lock().await;
        if conversation.is_terminated() {
            return;
        }

        if conversation.pending_hangup {
            self.terminate(&mut conversation).await;
            return;
        }

        // In DTMF mode every completed playback just reopens the menu wait;
        // replaying the menu prompt here would loop forever.
        if conversation.recognition_mode == RecognitionMode::Dtmf {
            conversation.set_stage(CallStage::MenuPresented);
            return;
        }

        // A playback finishing while the simulation window is open is the
        // listening prompt itself. Synthesize the turn now if the window has
        // already elapsed; otherwise the armed timer will.
        if conversation.stage == CallStage::SimulatedListening {
            if let Some(ListenTimeout::SimulatedUtterance(speech)) =
                self.orchestrator.poll_timeout(&conversation)
            {
                self.handle_user_utterance(&mut conversation, &speech.text)
                    .await;
            }
            return;
        }

        let participant = conversation.target_identity.clone();
        if let Err(error) = self
            .orchestrator
            .begin_listening(&mut conversation, participant.as_deref(), &self.voice)
            .await
        {
            error!(call_id = %call_id, error = %error, "failed to open listen window");
            self.speak_and_hang_up(&mut conversation, ERROR_TRANSFER_MESSAGE)
                .await;
            return;
        }

        if conversation.stage == CallStage::SimulatedListening
            || conversation.stage == CallStage::ListeningForResponse
        {
            self.arm_listen_timer(&conversation);
        }
    }

    /// Spawn the timeout watcher for the listen window just opened.
    ///
    /// The watcher re-locks the call and verifies the window is still the
    /// same one before acting, so late timers for superseded windows are
    /// no-ops.
    fn arm_listen_timer(&self, conversation: &CallConversation) {
        let agent = self.clone();
        let call_id = conversation.call_id.clone();
        let expected_turn = conversation.turn_count;
        let expected_stage = conversation.stage;
        let delay = match conversation.stage {
            CallStage::SimulatedListening => self.orchestrator.simulation_timeout(),
            _ => self.orchestrator.vendor_timeout(),
        };

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(handle) = agent.store.get(&call_id) else {
                return;
            };
            let mut conversation = handle.lock().await;
            if conversation.stage != expected_stage || conversation.turn_count != expected_turn {
                return;
            }

            match agent.orchestrator.poll_timeout(&conversation) {
                Some(ListenTimeout::SimulatedUtterance(speech)) => {
                    agent
                        .handle_user_utterance(&mut conversation, &speech.text)
                        .await;
                }
                Some(ListenTimeout::VendorRetry) => {
                    warn!(call_id = %call_id, "vendor recognition timed out, re-prompting");
                    agent.replay_retry(&mut conversation).await;
                }
                None => {}
            }
        });
    }

    async fn on_recognize_completed(
        &self,
        call_id: &str,
        speech: Option<careline_core::RecognizedSpeech>,
        dtmf: Option<String>,
    ) {
        let Some(handle) = self.store.get(call_id) else {
            debug!(call_id = %call_id, "RecognizeCompleted for unknown call discarded");
            return;
        };
        let mut conversation = handle.lock().await;
        if conversation.is_terminated() {
            debug!(call_id = %call_id, "late recognition result discarded");
            return;
        }

        if let Some(digits) = dtmf {
            self.handle_dtmf(&mut conversation, &digits).await;
            return;
        }

        match speech {
            Some(speech) if !speech.is_empty() => {
                self.handle_user_utterance(&mut conversation, speech.text.trim())
                    .await;
            }
            _ => {
                debug!(call_id = %call_id, "recognition completed without usable speech");
                self.replay_retry(&mut conversation).await;
            }
        }
    }

    async fn on_recognize_failed(&self, call_id: &str) {
        let Some(handle) = self.store.get(call_id) else {
            return;
        };
        let mut conversation = handle.lock().await;
        if conversation.is_terminated() {
            return;
        }
        warn!(call_id = %call_id, "recognition failed, re-prompting");
        self.replay_retry(&mut conversation).await;
    }

    // Logged without a stage transition; the vendor follows a failed play
    // with its own lifecycle events.
    async fn on_play_failed(&self, call_id: &str) {
        error!(call_id = %call_id, "playback failed");
    }

    async fn on_disconnected(&self, call_id: &str) {
        if let Some(handle) = self.store.get(call_id) {
            let mut conversation = handle.lock().await;
            conversation.set_stage(CallStage::Terminated);
            info!(
                call_id = %call_id,
                turns = conversation.turn_count,
                emergency = conversation.emergency_detected,
                "call disconnected"
            );
        }
        // Cleanup is unconditional and idempotent.
        self.store.remove(call_id);
        self.registry.release(call_id);
    }

    /// Process one user utterance end to end: transcript, response decision,
    /// workflow bookkeeping, playback.
    async fn handle_user_utterance(&self, conversation: &mut CallConversation, text: &str) {
        info!(call_id = %conversation.call_id, text = %text, "user utterance");
        conversation.add_turn(Speaker::User, text);

        let response = self.generator.respond(conversation, text).await;

        if let Some(template) = &response.emergency {
            conversation.emergency_detected = true;
            conversation.pending_hangup = true;
            self.record_emergency(conversation, template).await;
        }

        if let Some(new_state) = response.transition {
            if let Some(patient) = conversation.patient.as_mut() {
                patient.adherence_state = new_state;
                let patient_id = patient.patient_id.clone();
                if let Err(error) = self
                    .patients
                    .update_adherence_state(&patient_id, new_state)
                    .await
                {
                    warn!(call_id = %conversation.call_id, error = %error,
                        "failed to persist adherence state");
                }
            }
        }

        if let Some(action) = response.side_action {
            self.record_side_action(conversation, action).await;
        }

        self.speak(conversation, &response.text).await;
    }

    /// First digit of a DTMF entry selects from the touch-tone menu
    async fn handle_dtmf(&self, conversation: &mut CallConversation, digits: &str) {
        info!(call_id = %conversation.call_id, digits = %digits, "DTMF input");
        conversation.recognition_mode = RecognitionMode::Dtmf;
        conversation.add_turn(Speaker::User, format!("[pressed {}]", digits));

        let response = match digits.chars().next() {
            Some('1') => {
                "I can help you with appointments. Our scheduling team will call you \
                 back shortly to find a time that works."
                    .to_string()
            }
            Some('2') => {
                "For general questions, our staff is available during business hours. \
                 I'll note that you'd like a callback."
                    .to_string()
            }
            Some('3') => {
                conversation.pending_hangup = true;
                "Connecting you with a staff member now. Please stay on the line.".to_string()
            }
            Some('0') | None => DTMF_MENU_PROMPT.to_string(),
            Some(_) => format!("I didn't recognize that selection. {}", DTMF_MENU_PROMPT),
        };

        self.speak(conversation, &response).await;
    }

    /// Write the emergency incident to the patient's file, best-effort
    async fn record_emergency(
        &self,
        conversation: &CallConversation,
        template: &EmergencyTemplate,
    ) {
        error!(
            call_id = %conversation.call_id,
            emergency_type = %template.record.emergency_type,
            priority = ?template.priority,
            "EMERGENCY ESCALATION"
        );

        let Some(patient_id) = &template.record.patient_id else {
            return;
        };
        let note = PatientNote::new(
            "emergency",
            format!(
                "Escalated during call {}: {} (outcome: {})",
                conversation.call_id, template.record.emergency_type, template.record.outcome
            ),
        );
        if let Err(error) = self.patients.append_note(patient_id, note).await {
            warn!(call_id = %conversation.call_id, error = %error,
                "failed to record emergency incident");
        }
    }

    async fn record_side_action(&self, conversation: &CallConversation, action: SideAction) {
        let Some(patient) = &conversation.patient else {
            return;
        };
        let note = PatientNote::new(
            action.display_name(),
            format!("Requested during call {}", conversation.call_id),
        );
        if let Err(error) = self.patients.append_note(&patient.patient_id, note).await {
            warn!(call_id = %conversation.call_id, error = %error,
                "failed to record side action");
        }
    }

    /// Replay the retry prompt without leaving the current stage. The call
    /// stays in its listening stage while the prompt plays; the window
    /// restarts when the playback completes. Refreshing the window start
    /// keeps a still-armed timer from re-prompting mid-playback.
    async fn replay_retry(&self, conversation: &mut CallConversation) {
        conversation.add_turn(Speaker::Assistant, RETRY_MESSAGE);
        conversation.listen_started_at = Some(Instant::now());

        if let Err(error) = self
            .client
            .play_text(&conversation.call_id, RETRY_MESSAGE, &self.voice)
            .await
        {
            error!(call_id = %conversation.call_id, error = %error, "playback failed");
            self.terminate(conversation).await;
        }
    }

    /// Speak a response; playback failure terminates the call
    async fn speak(&self, conversation: &mut CallConversation, text: &str) {
        conversation.add_turn(Speaker::Assistant, text);
        conversation.set_stage(CallStage::PlayingResponse);

        if let Err(error) = self
            .client
            .play_text(&conversation.call_id, text, &self.voice)
            .await
        {
            error!(call_id = %conversation.call_id, error = %error, "playback failed");
            self.terminate(conversation).await;
        }
    }

    /// Speak a final message and hang up once it finishes
    async fn speak_and_hang_up(&self, conversation: &mut CallConversation, text: &str) {
        conversation.pending_hangup = true;
        self.speak(conversation, text).await;
    }

    /// Hang up (best-effort) and clear the call's state immediately; a later
    /// CallDisconnected webhook becomes a no-op.
    async fn terminate(&self, conversation: &mut CallConversation) {
        if let Err(error) = self.client.hang_up(&conversation.call_id).await {
            debug!(call_id = %conversation.call_id, error = %error, "hang-up failed");
        }
        conversation.set_stage(CallStage::Terminated);
        self.store.remove(&conversation.call_id);
        self.registry.release(&conversation.call_id);
    }
}
