//! Best-effort LLM response enhancement
//!
//! The voice agent never depends on the LLM for correctness: every response
//! already exists as a template before enhancement is attempted. The client
//! here rephrases a scripted response into something more conversational, and
//! any failure (timeout, HTTP error, empty completion) silently yields the
//! original text.

pub mod client;
pub mod prompt;

pub use client::{CompletionClient, LlmError, OpenAiClient};
pub use prompt::EnhancementPrompt;
