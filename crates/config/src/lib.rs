//! Configuration for the Careline voice agent
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `CARELINE__*` environment variables.

pub mod settings;

pub use settings::{
    ConversationConfig, FacilityConfig, LlmConfig, ServerConfig, Settings, TelephonyConfig,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Missing required setting: {0}")]
    Missing(String),
}
