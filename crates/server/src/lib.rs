//! Careline voice-agent HTTP server
//!
//! Wires the call agent to its dependencies and serves the call API plus the
//! vendor webhook endpoint.

pub mod http;
pub mod state;

use careline_agent::CallAgent;
use careline_config::Settings;
use careline_llm::{CompletionClient, OpenAiClient};
use careline_persistence::MemoryPatientStore;
use careline_telephony::SimulatedCallClient;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::state::AppState;

/// Server startup errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Assemble the call agent from settings.
///
/// The patient store is in-memory; records are seeded through the store
/// before calls are placed. LLM enhancement is only wired up when an
/// endpoint is configured.
pub fn build_agent(settings: &Settings, patients: Arc<MemoryPatientStore>) -> CallAgent {
    let client = Arc::new(SimulatedCallClient::new());

    let llm: Option<Arc<dyn CompletionClient>> = if settings.llm.endpoint.is_some() {
        info!(model = %settings.llm.model, "LLM response enhancement enabled");
        Some(Arc::new(OpenAiClient::new(settings.llm.clone())))
    } else {
        info!("LLM response enhancement disabled");
        None
    };

    CallAgent::new(settings, client, llm, patients)
}

/// Run the server until shutdown is requested
pub async fn run(settings: Settings) -> Result<(), ServerError> {
    let patients = Arc::new(MemoryPatientStore::new());
    let agent = build_agent(&settings, patients);
    let app = http::router(AppState::new(agent));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!(addr = %addr, "careline voice agent listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
