//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Telephony vendor configuration
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// LLM enhancement configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Conversation flow timing
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Healthcare facility identity
    #[serde(default)]
    pub facility: FacilityConfig,
}

impl Settings {
    /// Load settings from an optional TOML file plus `CARELINE__*`
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        let config = builder
            .add_source(Environment::with_prefix("CARELINE").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conversation.simulation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "conversation.simulation_timeout_secs".to_string(),
                message: "must be at least 1 second".to_string(),
            });
        }

        if self.conversation.vendor_timeout_secs <= self.conversation.simulation_timeout_secs {
            return Err(ConfigError::InvalidValue {
                field: "conversation.vendor_timeout_secs".to_string(),
                message: "must exceed the simulation timeout".to_string(),
            });
        }

        if self.llm.endpoint.is_some() && self.llm.model.is_empty() {
            return Err(ConfigError::Missing("llm.model".to_string()));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Telephony vendor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    /// Caller ID presented on outbound calls
    #[serde(default)]
    pub source_caller_id: String,

    /// Default target when a call carries no explicit identity
    #[serde(default)]
    pub default_target: Option<String>,

    /// Host used to derive the webhook callback URL
    #[serde(default)]
    pub callback_url_base: Option<String>,

    /// Greeting played when no patient context is available
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,

    /// TTS voice name
    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            source_caller_id: String::new(),
            default_target: None,
            callback_url_base: None,
            welcome_message: default_welcome_message(),
            tts_voice: default_tts_voice(),
        }
    }
}

impl TelephonyConfig {
    /// Derive the webhook callback URL for a new call
    pub fn callback_url(&self) -> String {
        match &self.callback_url_base {
            Some(base) => format!("https://{}/api/calls/webhook", base.trim_end_matches('/')),
            None => "http://localhost:7071/api/calls/webhook".to_string(),
        }
    }
}

/// LLM enhancement configuration. Enhancement is strictly best-effort: an
/// unset endpoint disables it entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: String::new(),
            model: default_llm_model(),
            timeout_ms: default_llm_timeout_ms(),
            max_tokens: default_llm_max_tokens(),
            temperature: default_llm_temperature(),
        }
    }
}

/// Conversation flow timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Simulation-mode listen timeout before a canned utterance is produced
    #[serde(default = "default_simulation_timeout")]
    pub simulation_timeout_secs: u64,

    /// Vendor-mode listen timeout before a retry prompt is played
    #[serde(default = "default_vendor_timeout")]
    pub vendor_timeout_secs: u64,

    /// How many transcript entries feed the LLM context
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            simulation_timeout_secs: default_simulation_timeout(),
            vendor_timeout_secs: default_vendor_timeout(),
            context_turns: default_context_turns(),
        }
    }
}

/// Healthcare facility identity, interpolated into prompts and emergency
/// escalation contacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityConfig {
    #[serde(default = "default_facility_name")]
    pub facility_name: String,

    #[serde(default = "default_facility_phone")]
    pub facility_phone: String,

    #[serde(default = "default_emergency_phone")]
    pub emergency_phone: String,

    #[serde(default = "default_urgent_care_phone")]
    pub urgent_care_phone: String,

    #[serde(default = "default_doctor_name")]
    pub default_doctor_name: String,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            facility_name: default_facility_name(),
            facility_phone: default_facility_phone(),
            emergency_phone: default_emergency_phone(),
            urgent_care_phone: default_urgent_care_phone(),
            default_doctor_name: default_doctor_name(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7071
}

fn default_welcome_message() -> String {
    "Hello! This is your healthcare assistant calling to check in about your \
     recent prescription. I'm here to help make sure everything is going well \
     with your medication."
        .to_string()
}

fn default_tts_voice() -> String {
    "en-US-JennyNeural".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_ms() -> u64 {
    4000
}

fn default_llm_max_tokens() -> u32 {
    150
}

fn default_llm_temperature() -> f32 {
    0.7
}

fn default_simulation_timeout() -> u64 {
    2
}

fn default_vendor_timeout() -> u64 {
    30
}

fn default_context_turns() -> usize {
    3
}

fn default_facility_name() -> String {
    "General Hospital".to_string()
}

fn default_facility_phone() -> String {
    "+1-555-0100".to_string()
}

fn default_emergency_phone() -> String {
    "911".to_string()
}

fn default_urgent_care_phone() -> String {
    "+1-555-0199".to_string()
}

fn default_doctor_name() -> String {
    "Dr. Smith".to_string()
}
