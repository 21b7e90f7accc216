//! Shared application state

use careline_agent::CallAgent;

/// State shared by all request handlers
#[derive(Clone)]
pub struct AppState {
    pub agent: CallAgent,
}

impl AppState {
    pub fn new(agent: CallAgent) -> Self {
        Self { agent }
    }
}
