//! HTTP routes
//!
//! The webhook endpoint always answers 200 with a processed count; vendor
//! webhooks treat non-2xx as delivery failure and retry, which would replay
//! events we already applied.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use careline_agent::StartCallRequest;
use careline_telephony::{EventEnvelope, TelephonyError};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/calls", post(start_call))
        .route("/api/calls/webhook", post(webhook))
        .route("/api/calls/:call_id", get(call_status))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct StartCallBody {
    target_number: String,
    #[serde(default)]
    patient_id: Option<String>,
    #[serde(default)]
    custom_greeting: Option<String>,
}

async fn start_call(
    State(state): State<AppState>,
    Json(body): Json<StartCallBody>,
) -> Response {
    let request = StartCallRequest {
        target_number: body.target_number,
        patient_id: body.patient_id,
        custom_greeting: body.custom_greeting,
    };

    match state.agent.start_call(request).await {
        Ok(call_id) => {
            info!(call_id = %call_id, "call created via API");
            (
                StatusCode::CREATED,
                Json(json!({"success": true, "call_id": call_id})),
            )
                .into_response()
        }
        Err(TelephonyError::InvalidPhoneNumber(number)) => error_response(
            StatusCode::BAD_REQUEST,
            format!("invalid phone number: {}", number),
        ),
        Err(error) => error_response(StatusCode::BAD_GATEWAY, error.to_string()),
    }
}

async fn webhook(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let envelopes = EventEnvelope::from_body(&body);
    let processed = envelopes.len();
    state.agent.dispatch_batch(envelopes).await;

    Json(json!({"success": true, "processed": processed})).into_response()
}

async fn call_status(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Response {
    match state.agent.call_snapshot(&call_id).await {
        Some(snapshot) => Json(json!({"success": true, "call": snapshot})).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("no active call {}", call_id),
        ),
    }
}

async fn health() -> Response {
    Json(json!({"status": "healthy"})).into_response()
}

async fn ready(State(state): State<AppState>) -> Response {
    Json(json!({"status": "ready", "active_calls": state.agent.active_calls().len()}))
        .into_response()
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({"success": false, "error": message}))).into_response()
}
