//! Telephony vendor abstraction
//!
//! [`CallClient`] is the only seam between the call core and a telephony
//! vendor: create a call, play text-to-speech, start speech recognition, hang
//! up. [`events`] models the vendor's webhook payloads and normalizes their
//! shape differences into one typed event.

pub mod client;
pub mod events;

pub use client::{validate_phone_number, CallClient, SimulatedCallClient, TelephonyError};
pub use events::{extract_speech, tones_to_digits, CallEvent, EventEnvelope};
