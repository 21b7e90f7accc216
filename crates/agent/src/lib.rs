//! Call conversation core
//!
//! Everything between a telephony webhook and a spoken response lives here:
//! the per-call conversation store, the call target registry, the recognition
//! orchestrator with its fallback ladder, the response generator, and the
//! event dispatcher that ties them together.
//!
//! Concurrency model: each call has its own async mutex, so events for one
//! call are serialized while distinct calls proceed in parallel. The outer
//! map lock is never held across an await point.

pub mod dispatcher;
pub mod generator;
pub mod orchestrator;
pub mod registry;
pub mod store;

pub use dispatcher::{CallAgent, CallSnapshot, StartCallRequest};
pub use generator::{GeneratedResponse, ResponseGenerator};
pub use orchestrator::{
    ListenTimeout, RecognitionOrchestrator, DTMF_MENU_PROMPT, ERROR_TRANSFER_MESSAGE,
    RETRY_MESSAGE, SIMULATED_UTTERANCES, SIMULATION_LISTENING_PROMPT,
};
pub use registry::{CallRegistry, CallTarget};
pub use store::{CallConversation, CallHandle, ConversationStore};
