//! End-to-end call flow tests driving the dispatcher with scripted webhook
//! event sequences against a recording telephony client.

use async_trait::async_trait;
use careline_agent::{CallAgent, StartCallRequest, DTMF_MENU_PROMPT, SIMULATION_LISTENING_PROMPT};
use careline_config::Settings;
use careline_core::{MedicationAdherenceState, Medication, PatientRecord};
use careline_persistence::{MemoryPatientStore, PatientStore};
use careline_telephony::{CallClient, EventEnvelope, TelephonyError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy)]
enum RecognitionBehavior {
    Supported,
    Unavailable,
    Broken,
}

struct RecordingClient {
    behavior: RecognitionBehavior,
    plays: Mutex<Vec<String>>,
    recognitions: Mutex<usize>,
    hangups: Mutex<Vec<String>>,
}

impl RecordingClient {
    fn new(behavior: RecognitionBehavior) -> Self {
        Self {
            behavior,
            plays: Mutex::new(Vec::new()),
            recognitions: Mutex::new(0),
            hangups: Mutex::new(Vec::new()),
        }
    }

    fn plays(&self) -> Vec<String> {
        self.plays.lock().clone()
    }

    fn hangups(&self) -> Vec<String> {
        self.hangups.lock().clone()
    }
}

#[async_trait]
impl CallClient for RecordingClient {
    async fn create_call(
        &self,
        target_number: &str,
        _source_caller_id: &str,
        _callback_url: &str,
    ) -> Result<String, TelephonyError> {
        careline_telephony::validate_phone_number(target_number)?;
        Ok("call-test".to_string())
    }

    async fn play_text(
        &self,
        _call_id: &str,
        text: &str,
        _voice: &str,
    ) -> Result<(), TelephonyError> {
        self.plays.lock().push(text.to_string());
        Ok(())
    }

    async fn start_recognition(
        &self,
        _call_id: &str,
        _target_participant: &str,
    ) -> Result<(), TelephonyError> {
        *self.recognitions.lock() += 1;
        match self.behavior {
            RecognitionBehavior::Supported => Ok(()),
            RecognitionBehavior::Unavailable => Err(TelephonyError::RecognitionUnavailable(
                "no speech support".to_string(),
            )),
            RecognitionBehavior::Broken => {
                Err(TelephonyError::Vendor("recognition exploded".to_string()))
            }
        }
    }

    async fn hang_up(&self, call_id: &str) -> Result<(), TelephonyError> {
        self.hangups.lock().push(call_id.to_string());
        Ok(())
    }

    async fn get_call_state(&self, _call_id: &str) -> Result<String, TelephonyError> {
        Ok("connected".to_string())
    }
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.telephony.source_caller_id = "+15550000000".to_string();
    settings.conversation.simulation_timeout_secs = 1;
    settings
}

fn seeded_patients() -> Arc<MemoryPatientStore> {
    let store = MemoryPatientStore::new();
    store.insert(
        PatientRecord::new("p-1", "Maria Garcia", "Dr. Chen")
            .with_medication(Medication::new("Lisinopril", "10mg", "once daily")),
    );
    Arc::new(store)
}

fn agent(
    behavior: RecognitionBehavior,
    patients: Arc<MemoryPatientStore>,
) -> (CallAgent, Arc<RecordingClient>) {
    let client = Arc::new(RecordingClient::new(behavior));
    let agent = CallAgent::new(&settings(), client.clone(), None, patients);
    (agent, client)
}

fn envelope(event_type: &str, call_id: &str, mut data: Value) -> EventEnvelope {
    data["callConnectionId"] = json!(call_id);
    EventEnvelope {
        event_type: event_type.to_string(),
        call_id: call_id.to_string(),
        data,
    }
}

async fn start_patient_call(agent: &CallAgent) -> String {
    let call_id = agent
        .start_call(StartCallRequest {
            target_number: "+15551234567".to_string(),
            patient_id: Some("p-1".to_string()),
            custom_greeting: None,
        })
        .await
        .unwrap();
    agent
        .dispatch(envelope(
            "Microsoft.Communication.CallConnected",
            &call_id,
            json!({}),
        ))
        .await;
    call_id
}

#[tokio::test]
async fn connected_call_gets_workflow_greeting() {
    let (agent, client) = agent(RecognitionBehavior::Supported, seeded_patients());
    let call_id = start_patient_call(&agent).await;

    let plays = client.plays();
    assert_eq!(plays.len(), 1);
    assert!(plays[0].contains("Maria Garcia"));
    assert!(plays[0].contains("Dr. Chen"));

    let snapshot = agent.call_snapshot(&call_id).await.unwrap();
    assert_eq!(snapshot.stage, "greeting_played");
    assert_eq!(snapshot.patient_id.as_deref(), Some("p-1"));
}

#[tokio::test]
async fn custom_greeting_overrides_workflow() {
    let (agent, client) = agent(RecognitionBehavior::Supported, seeded_patients());
    let call_id = agent
        .start_call(StartCallRequest {
            target_number: "+15551234567".to_string(),
            patient_id: Some("p-1".to_string()),
            custom_greeting: Some("Good morning! Quick check-in call.".to_string()),
        })
        .await
        .unwrap();
    agent
        .dispatch(envelope(
            "Microsoft.Communication.CallConnected",
            &call_id,
            json!({}),
        ))
        .await;

    assert_eq!(client.plays()[0], "Good morning! Quick check-in call.");
}

#[tokio::test]
async fn recognized_yes_advances_adherence_state() {
    let patients = seeded_patients();
    let (agent, client) = agent(RecognitionBehavior::Supported, patients.clone());
    let call_id = start_patient_call(&agent).await;

    agent
        .dispatch(envelope(
            "Microsoft.Communication.PlayCompleted",
            &call_id,
            json!({}),
        ))
        .await;
    let snapshot = agent.call_snapshot(&call_id).await.unwrap();
    assert_eq!(snapshot.stage, "listening_for_response");

    agent
        .dispatch(envelope(
            "Microsoft.Communication.RecognizeCompleted",
            &call_id,
            json!({"speechResult": {"speech": "yes, I picked it up", "confidence": 0.9}}),
        ))
        .await;

    let patient = patients.get_patient("p-1").await.unwrap();
    assert_eq!(
        patient.adherence_state,
        MedicationAdherenceState::MedicationPickedUp
    );

    // The dosage-review prompt for the next exchange was spoken.
    let plays = client.plays();
    assert_eq!(plays.len(), 2);
    assert!(plays[1].contains("good time"));
}

#[tokio::test]
async fn simulation_fallback_produces_canned_utterance() {
    let (agent, client) = agent(RecognitionBehavior::Unavailable, seeded_patients());
    let call_id = start_patient_call(&agent).await;

    agent
        .dispatch(envelope(
            "Microsoft.Communication.PlayCompleted",
            &call_id,
            json!({}),
        ))
        .await;
    let snapshot = agent.call_snapshot(&call_id).await.unwrap();
    assert_eq!(snapshot.stage, "simulated_listening");
    assert_eq!(snapshot.recognition_mode, "simulation");

    // The caller hears a listening prompt while the window is open.
    let plays = client.plays();
    assert_eq!(plays.len(), 2);
    assert!(plays[1].ends_with(SIMULATION_LISTENING_PROMPT));

    // Wait out the 1s simulation window plus scheduling slack.
    tokio::time::sleep(Duration::from_millis(1400)).await;

    let snapshot = agent.call_snapshot(&call_id).await.unwrap();
    assert_eq!(snapshot.turn_count, 1);
    assert_eq!(snapshot.stage, "playing_response");
    // Greeting, the canned utterance, and the response to it.
    assert_eq!(snapshot.transcript_len, 3);

    // Greeting, listening prompt, response to the synthesized turn.
    let plays = client.plays();
    assert_eq!(plays.len(), 3);
}

#[tokio::test]
async fn emergency_escalates_and_hangs_up() {
    let patients = seeded_patients();
    let (agent, client) = agent(RecognitionBehavior::Supported, patients.clone());
    let call_id = start_patient_call(&agent).await;

    agent
        .dispatch(envelope(
            "Microsoft.Communication.PlayCompleted",
            &call_id,
            json!({}),
        ))
        .await;
    agent
        .dispatch(envelope(
            "Microsoft.Communication.RecognizeCompleted",
            &call_id,
            json!({"speechResult": {"speech": "I'm having chest pain right now"}}),
        ))
        .await;

    let snapshot = agent.call_snapshot(&call_id).await.unwrap();
    assert!(snapshot.emergency_detected);

    let plays = client.plays();
    assert!(plays[1].contains("medical emergency"));
    assert!(plays[1].contains("911"));

    // The incident was written to the patient's file.
    let notes = patients.notes("p-1");
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].category, "emergency");
    assert!(notes[0].text.contains("chest pain"));

    // Escalation playback finished: the call hangs up and is cleared.
    agent
        .dispatch(envelope(
            "Microsoft.Communication.PlayCompleted",
            &call_id,
            json!({}),
        ))
        .await;
    assert_eq!(client.hangups(), vec![call_id.clone()]);
    assert!(agent.call_snapshot(&call_id).await.is_none());
}

#[tokio::test]
async fn dtmf_menu_when_recognition_probe_fails_hard() {
    let (agent, client) = agent(RecognitionBehavior::Broken, seeded_patients());
    let call_id = start_patient_call(&agent).await;

    agent
        .dispatch(envelope(
            "Microsoft.Communication.PlayCompleted",
            &call_id,
            json!({}),
        ))
        .await;

    let snapshot = agent.call_snapshot(&call_id).await.unwrap();
    assert_eq!(snapshot.stage, "menu_presented");
    assert_eq!(snapshot.recognition_mode, "dtmf");
    assert_eq!(client.plays()[1], DTMF_MENU_PROMPT);

    // Menu playback completes without replaying the menu.
    agent
        .dispatch(envelope(
            "Microsoft.Communication.PlayCompleted",
            &call_id,
            json!({}),
        ))
        .await;
    assert_eq!(client.plays().len(), 2);

    agent
        .dispatch(envelope(
            "Microsoft.Communication.RecognizeCompleted",
            &call_id,
            json!({"dtmfResult": {"tones": ["one"]}}),
        ))
        .await;
    let plays = client.plays();
    assert!(plays[2].contains("appointments"));
}

#[tokio::test]
async fn empty_recognition_replays_retry_prompt() {
    let (agent, client) = agent(RecognitionBehavior::Supported, seeded_patients());
    let call_id = start_patient_call(&agent).await;

    agent
        .dispatch(envelope(
            "Microsoft.Communication.PlayCompleted",
            &call_id,
            json!({}),
        ))
        .await;
    agent
        .dispatch(envelope(
            "Microsoft.Communication.RecognizeCompleted",
            &call_id,
            json!({"speechResult": {"speech": "   "}}),
        ))
        .await;

    let plays = client.plays();
    assert!(plays[1].contains("didn't catch that"));

    // The retry is invisible to the stage machine: the call is still
    // listening while the prompt plays.
    let snapshot = agent.call_snapshot(&call_id).await.unwrap();
    assert_eq!(snapshot.stage, "listening_for_response");
}

#[tokio::test]
async fn recognize_failed_replays_retry_prompt() {
    let (agent, client) = agent(RecognitionBehavior::Supported, seeded_patients());
    let call_id = start_patient_call(&agent).await;

    agent
        .dispatch(envelope(
            "Microsoft.Communication.PlayCompleted",
            &call_id,
            json!({}),
        ))
        .await;
    agent
        .dispatch(envelope(
            "Microsoft.Communication.RecognizeFailed",
            &call_id,
            json!({}),
        ))
        .await;
    assert!(client.plays()[1].contains("didn't catch that"));

    let snapshot = agent.call_snapshot(&call_id).await.unwrap();
    assert_eq!(snapshot.stage, "listening_for_response");
}

#[tokio::test]
async fn disconnect_cleanup_is_idempotent_and_discards_late_events() {
    let (agent, client) = agent(RecognitionBehavior::Supported, seeded_patients());
    let call_id = start_patient_call(&agent).await;

    for _ in 0..2 {
        agent
            .dispatch(envelope(
                "Microsoft.Communication.CallDisconnected",
                &call_id,
                json!({}),
            ))
            .await;
    }
    assert!(agent.call_snapshot(&call_id).await.is_none());
    assert!(agent.active_calls().is_empty());

    // A result arriving after teardown changes nothing.
    agent
        .dispatch(envelope(
            "Microsoft.Communication.RecognizeCompleted",
            &call_id,
            json!({"speechResult": {"speech": "hello?"}}),
        ))
        .await;
    assert_eq!(client.plays().len(), 1);
    assert!(agent.call_snapshot(&call_id).await.is_none());
}

#[tokio::test]
async fn batch_events_apply_in_order() {
    let (agent, client) = agent(RecognitionBehavior::Supported, seeded_patients());
    let call_id = agent
        .start_call(StartCallRequest {
            target_number: "+15551234567".to_string(),
            patient_id: None,
            custom_greeting: None,
        })
        .await
        .unwrap();

    agent
        .dispatch_batch(vec![
            envelope("Microsoft.Communication.CallConnected", &call_id, json!({})),
            envelope("Microsoft.Communication.PlayCompleted", &call_id, json!({})),
        ])
        .await;

    // Greeting first (default welcome, no patient), then listening.
    let snapshot = agent.call_snapshot(&call_id).await.unwrap();
    assert_eq!(snapshot.stage, "listening_for_response");
    assert!(client.plays()[0].contains("healthcare assistant"));
}

#[tokio::test]
async fn invalid_target_number_is_rejected() {
    let (agent, _client) = agent(RecognitionBehavior::Supported, seeded_patients());
    let result = agent
        .start_call(StartCallRequest {
            target_number: "555-1234".to_string(),
            patient_id: None,
            custom_greeting: None,
        })
        .await;
    assert!(matches!(result, Err(TelephonyError::InvalidPhoneNumber(_))));
}
