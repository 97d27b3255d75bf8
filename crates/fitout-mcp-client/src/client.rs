//! Tool-server client: initialize once, then `tools/call`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::sync::Mutex;

use crate::error::TransportError;
use crate::wire::{JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION, RawToolResponse};

/// Response header carrying the server-issued session identifier.
const SESSION_HEADER: &str = "mcp-session-id";
/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Cap on response bodies echoed into error messages.
const ERROR_BODY_MAX_CHARS: usize = 500;

/// Connection settings for one tool server.
#[derive(Debug, Clone)]
pub struct ToolServerConfig {
    /// Display name for logging (e.g. `data`, `email`).
    pub name: String,
    /// Endpoint URL receiving JSON-RPC POST bodies.
    pub url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl ToolServerConfig {
    /// Settings with the default request timeout.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs.max(1);
        self
    }
}

/// Session identity after the `initialize` handshake.
#[derive(Debug, Clone)]
struct SessionIdentity {
    /// Header value issued by the server; echoed on every subsequent request.
    header: Option<String>,
    /// Identifier used in logs: server-issued, or locally fabricated (never sent).
    log_id: String,
}

/// Client for one tool server. Initialization runs at most once per instance;
/// the client is safe to share across concurrent callers.
pub struct ToolServerClient {
    config: ToolServerConfig,
    http: reqwest::Client,
    next_id: AtomicI64,
    init: Mutex<Option<SessionIdentity>>,
}

impl ToolServerClient {
    /// Build a client for the given server.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: ToolServerConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self {
            config,
            http,
            next_id: AtomicI64::new(1),
            init: Mutex::new(None),
        })
    }

    /// Server display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Perform the `initialize` handshake if it has not run yet.
    ///
    /// # Errors
    /// Returns a [`TransportError`] when the handshake request fails.
    pub async fn initialize_once(&self) -> Result<(), TransportError> {
        self.ensure_initialized().await.map(|_| ())
    }

    /// Call a tool by name. Ensures initialization, then issues one
    /// `tools/call`. Failures are surfaced immediately and never retried.
    ///
    /// # Errors
    /// Returns a [`TransportError`] on network failure, HTTP status >= 400,
    /// undecodable bodies, or a JSON-RPC error from the server.
    pub async fn call(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<RawToolResponse, TransportError> {
        let identity = self.ensure_initialized().await?;
        let started = Instant::now();
        let params = json!({"name": tool_name, "arguments": arguments});
        let result = self
            .post_rpc("tools/call", params, identity.header.as_deref())
            .await;
        match result {
            Ok((value, _)) => {
                let raw: RawToolResponse = serde_json::from_value(value)?;
                tracing::debug!(
                    event = "transport.tool_call.completed",
                    server = %self.config.name,
                    session_id = %identity.log_id,
                    tool = tool_name,
                    duration_ms = started.elapsed().as_millis() as u64,
                    is_error = raw.is_error.unwrap_or(false),
                    "tool call completed"
                );
                Ok(raw)
            }
            Err(error) => {
                tracing::warn!(
                    event = "transport.tool_call.failed",
                    server = %self.config.name,
                    session_id = %identity.log_id,
                    tool = tool_name,
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "tool call failed"
                );
                Err(error)
            }
        }
    }

    /// Run `initialize` under the guard; concurrent first callers wait and
    /// reuse the cached identity.
    async fn ensure_initialized(&self) -> Result<SessionIdentity, TransportError> {
        let mut guard = self.init.lock().await;
        if let Some(identity) = guard.as_ref() {
            return Ok(identity.clone());
        }
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let (_, session_header) = self.post_rpc("initialize", params, None).await?;
        let log_id = session_header
            .clone()
            .unwrap_or_else(|| format!("local-{}", uuid::Uuid::new_v4()));
        tracing::info!(
            event = "transport.initialized",
            server = %self.config.name,
            session_id = %log_id,
            server_issued = session_header.is_some(),
            "tool server session initialized"
        );
        let identity = SessionIdentity {
            header: session_header,
            log_id,
        };
        *guard = Some(identity.clone());
        Ok(identity)
    }

    /// POST one JSON-RPC request; returns the `result` value and any
    /// session header the server attached to the response.
    async fn post_rpc(
        &self,
        method: &'static str,
        params: serde_json::Value,
        session: Option<&str>,
    ) -> Result<(serde_json::Value, Option<String>), TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        };
        let mut request = self
            .http
            .post(&self.config.url)
            .header("Accept", "application/json, text/event-stream")
            .json(&body);
        if let Some(token) = session {
            request = request.header(SESSION_HEADER, token);
        }
        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                TransportError::Timeout(self.config.timeout_secs)
            } else {
                TransportError::Network {
                    url: self.config.url.clone(),
                    source: error,
                }
            }
        })?;

        let status = response.status();
        let session_header = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response.text().await.map_err(|error| {
            if error.is_timeout() {
                TransportError::Timeout(self.config.timeout_secs)
            } else {
                TransportError::Network {
                    url: self.config.url.clone(),
                    source: error,
                }
            }
        })?;

        if status.as_u16() >= 400 {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        let envelope = decode_body(&text, &content_type)?;
        if let Some(error) = envelope.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = envelope.result.ok_or(TransportError::MissingResult)?;
        Ok((result, session_header))
    }
}

/// Decode a response body as JSON or as an SSE stream of `data:` lines.
fn decode_body(body: &str, content_type: &str) -> Result<JsonRpcResponse, TransportError> {
    if content_type.starts_with("text/event-stream") {
        if let Some(envelope) = last_event_data(body) {
            return Ok(envelope);
        }
        // No decodable data line: fall back to treating the body as JSON.
        return serde_json::from_str(body).map_err(|_| TransportError::EventStream);
    }
    Ok(serde_json::from_str(body)?)
}

/// Last successfully decoded `data: <json>` line of an event-stream body.
fn last_event_data(body: &str) -> Option<JsonRpcResponse> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|data| serde_json::from_str(data.trim()).ok())
        .next_back()
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= ERROR_BODY_MAX_CHARS {
        return body.to_string();
    }
    body.chars().take(ERROR_BODY_MAX_CHARS).collect()
}
