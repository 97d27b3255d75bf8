//! HTTP gateway: POST /chat → one agent handle → JSON response.
//!
//! Request validation (400 for an empty message), optional concurrency
//! limit, graceful shutdown on Ctrl+C / SIGTERM. Tool and handle timeouts
//! live inside the agent; the gateway never double-times a request.

use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::agent::Agent;

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// User message.
    pub message: String,
    /// Conversation session; a fresh one is created when absent or unknown.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Caller identity label.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Response body for POST /chat.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Assistant reply (Korean).
    pub response: String,
    /// Session identifier (echo or freshly generated).
    pub session_id: String,
    /// False when the reply reports an error.
    pub success: bool,
    /// Tool dispatched for this message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_used: Option<String>,
    /// RFC 3339 server timestamp.
    pub timestamp: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub agent_available: bool,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_flight_handles: Option<usize>,
}

/// Shared state: agent plus an optional concurrency limit.
#[derive(Clone)]
pub struct GatewayState {
    pub agent: Arc<Agent>,
    /// When Some, limits concurrent handles; excess requests wait for a slot.
    pub concurrency_semaphore: Option<Arc<Semaphore>>,
    pub max_concurrent_handles: Option<usize>,
}

/// Validate request body; empty or whitespace-only messages are a 400.
/// Missing session ids get a fresh UUID.
pub fn validate_chat_request(
    body: &ChatRequest,
) -> Result<(String, String, String), (StatusCode, String)> {
    let message = body.message.trim().to_string();
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "message must be non-empty".to_string(),
        ));
    }
    let session_id = body
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string);
    let user_id = body
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or("web")
        .to_string();
    Ok((session_id, user_id, message))
}

async fn handle_chat(
    State(state): State<GatewayState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let (session_id, user_id, message) = validate_chat_request(&body)?;
    let _permit = match state.concurrency_semaphore {
        Some(ref semaphore) => Some(semaphore.acquire().await.map_err(|_| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "concurrency limit closed".to_string(),
            )
        })?),
        None => None,
    };
    let outcome = state.agent.handle(&session_id, &user_id, &message).await;
    Ok(Json(ChatResponse {
        response: outcome.text,
        session_id,
        success: outcome.success,
        tool_used: outcome.tool_used,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

async fn handle_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let in_flight_handles = state.max_concurrent_handles.and_then(|max| {
        state
            .concurrency_semaphore
            .as_ref()
            .map(|semaphore| max.saturating_sub(semaphore.available_permits()))
    });
    Json(HealthResponse {
        status: "healthy",
        agent_available: state.agent.available(),
        timestamp: Utc::now().to_rfc3339(),
        in_flight_handles,
    })
}

/// Build the gateway router (POST /chat, GET /health).
pub fn gateway_router(agent: Agent, max_concurrent_handles: Option<usize>) -> Router {
    let concurrency_semaphore = max_concurrent_handles.map(|n| Arc::new(Semaphore::new(n)));
    let state = GatewayState {
        agent: Arc::new(agent),
        concurrency_semaphore,
        max_concurrent_handles,
    };
    Router::new()
        .route("/health", get(handle_health))
        .route("/chat", post(handle_chat))
        .with_state(state)
}

/// Run the HTTP server on `bind_addr` (e.g. `0.0.0.0:8080`). Graceful
/// shutdown on Ctrl+C (SIGINT) and SIGTERM; in-flight requests complete.
///
/// # Errors
/// Returns an error when binding or serving fails.
pub async fn run_http(
    agent: Agent,
    bind_addr: &str,
    max_concurrent_handles: Option<usize>,
) -> Result<()> {
    let app = gateway_router(agent, max_concurrent_handles);
    let listener = TcpListener::bind(bind_addr).await?;
    let max_str = max_concurrent_handles
        .map_or_else(|| "unlimited".to_string(), |n| n.to_string());
    tracing::info!(
        "gateway listening on {} (max_concurrent={}, Ctrl+C/SIGTERM to stop)",
        bind_addr,
        max_str
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let ctrl_c = tokio::signal::ctrl_c();
        let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
            let _ = ctrl_c.await;
            return;
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
