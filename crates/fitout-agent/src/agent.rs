//! Session-owning orchestrator: one user message → router decision → at most
//! one tool dispatch → Korean reply.
//!
//! Single-shot by construction: the router is consulted exactly once per
//! message and its decision is consumed exactly once. The only path that
//! issues two transport calls is the name→id resolution before a detail or
//! mutation, and those two calls always differ.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value, json};

use fitout_mcp_client::{RawToolResponse, ToolServerClient, ToolServerConfig};

use crate::catalog::{ToolInvocation, ToolServer, build_invocation};
use crate::config::AgentConfig;
use crate::formatter::{self, FormattedResponse, RenderContext, ResponseKind};
use crate::llm::LlmClient;
use crate::observability::AgentEvent;
use crate::router::{NamedAction, Router, RouterDecision};
use crate::session::{SessionStore, Turn};

/// Outcome of one handled message. Always well-formed; errors surface as
/// `success = false` with Korean text, never as a panic or HTTP failure.
#[derive(Debug, Clone, Serialize)]
pub struct HandleOutcome {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_used: Option<String>,
    pub success: bool,
    pub timing_ms: u64,
}

/// The assistant: sessions + router + one transport per tool server.
pub struct Agent {
    config: AgentConfig,
    sessions: SessionStore,
    router: Router,
    data: ToolServerClient,
    email: ToolServerClient,
}

struct ReplyParts {
    formatted: FormattedResponse,
    invocation: Option<ToolInvocation>,
}

impl ReplyParts {
    fn plain(formatted: FormattedResponse) -> Self {
        Self {
            formatted,
            invocation: None,
        }
    }
}

impl Agent {
    /// Build the agent: two transports, session store, router (LLM when an
    /// inference URL is configured, keyword-only otherwise).
    ///
    /// # Errors
    /// Returns an error when an HTTP client cannot be constructed.
    pub fn from_config(config: AgentConfig) -> Result<Self> {
        let data = ToolServerClient::new(
            ToolServerConfig::new("data", &config.data_server_url)
                .with_timeout_secs(config.tool_timeout_secs),
        )
        .context("failed to build data tool server client")?;
        let email = ToolServerClient::new(
            ToolServerConfig::new("email", &config.email_server_url)
                .with_timeout_secs(config.tool_timeout_secs),
        )
        .context("failed to build email tool server client")?;
        let llm = if config.inference_url.trim().is_empty() {
            None
        } else {
            Some(LlmClient::new(
                config.inference_url.clone(),
                config.model.clone(),
                config.resolve_api_key(),
            ))
        };
        let sessions = SessionStore::new(config.session_ttl_secs, config.session_soft_cap);
        Ok(Self {
            sessions,
            router: Router::with_llm(llm),
            data,
            email,
            config,
        })
    }

    /// Handle one user message for a session. Grows the session history by
    /// exactly one user turn and one assistant turn.
    pub async fn handle(&self, session_id: &str, user_id: &str, user_text: &str) -> HandleOutcome {
        let started = Instant::now();
        let slot = self.sessions.get_or_create(session_id, user_id).await;
        // Serializes concurrent messages for the same session; different
        // sessions proceed in parallel.
        let mut session = slot.lock().await;

        let handle_timeout = Duration::from_secs(self.config.handle_timeout_secs.max(1));
        let parts = {
            let history = session.history.as_slice();
            match tokio::time::timeout(handle_timeout, self.process(user_text, history)).await {
                Ok(parts) => parts,
                Err(_) => {
                    tracing::warn!(
                        event = AgentEvent::HandleTimedOut.as_str(),
                        session_id,
                        timeout_secs = self.config.handle_timeout_secs,
                        "message handling timed out"
                    );
                    ReplyParts::plain(formatter::render_timeout())
                }
            }
        };

        session.history.push(Turn::user(user_text));
        let mut assistant = Turn::assistant(parts.formatted.text.clone());
        assistant.tool_call = parts.invocation.clone();
        assistant.tool_result_summary = parts
            .invocation
            .as_ref()
            .map(|_| summary_line(&parts.formatted.text));
        session.history.push(assistant);
        tracing::debug!(
            event = AgentEvent::TurnsAppended.as_str(),
            session_id,
            history_len = session.history.len(),
            "turns appended"
        );

        let tool_used = parts
            .invocation
            .as_ref()
            .map(|invocation| invocation.tool_name.clone());
        let success = parts.formatted.is_ok();
        let timing_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            event = AgentEvent::HandleCompleted.as_str(),
            session_id,
            tool_used = tool_used.as_deref(),
            success,
            timing_ms,
            "message handled"
        );
        HandleOutcome {
            text: parts.formatted.text,
            tool_used,
            success,
            timing_ms,
        }
    }

    /// Always true once construction succeeded; the keyword fallback keeps
    /// the agent answering even without a reachable LLM.
    #[must_use]
    pub fn available(&self) -> bool {
        true
    }

    /// Drop one session's history.
    pub async fn clear_session(&self, session_id: &str) {
        self.sessions.clear(session_id).await;
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }

    /// Snapshot of one session's history, if the session exists.
    pub async fn history(&self, session_id: &str) -> Option<Vec<Turn>> {
        self.sessions.history(session_id).await
    }

    /// Router → dispatch. Called exactly once per message.
    async fn process(&self, user_text: &str, history: &[Turn]) -> ReplyParts {
        match self.router.decide(user_text, history).await {
            RouterDecision::Plain(text) => ReplyParts::plain(FormattedResponse::plain(text)),
            RouterDecision::Call {
                invocation,
                search_term,
            } => self.dispatch(invocation, search_term).await,
            RouterDecision::ResolveByName {
                collection,
                name,
                action,
            } => self.resolve_then_act(&collection, &name, action).await,
        }
    }

    /// Fire one tool call and render the result. Never retries.
    async fn dispatch(&self, invocation: ToolInvocation, search_term: Option<String>) -> ReplyParts {
        let kind = formatter::operation_kind(&invocation.tool_name, search_term.is_some());
        let context = RenderContext {
            search_term,
            recipient: invocation
                .arguments
                .get("email")
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        let transport = self.transport_for(invocation.server);
        let result = transport
            .call(&invocation.tool_name, Value::Object(invocation.arguments.clone()))
            .await;
        let mut formatted = match result {
            Ok(raw) => formatter::render(&raw, kind, &context),
            Err(error) => formatter::render_transport_error(&error),
        };
        formatted.source_tool = Some(invocation.tool_name.clone());
        ReplyParts {
            formatted,
            invocation: Some(invocation),
        }
    }

    /// List-then-match resolution: bind a document id by exact `description`
    /// match, then run the intended call. Two transport calls, one intent.
    async fn resolve_then_act(&self, collection: &str, name: &str, action: NamedAction) -> ReplyParts {
        let mut lookup_args = Map::new();
        lookup_args.insert("collection".to_string(), json!(collection));
        lookup_args.insert("limit".to_string(), json!(self.config.lookup_limit));
        let listing = self
            .data
            .call("firestore_list_documents", Value::Object(lookup_args))
            .await;
        let raw = match listing {
            Ok(raw) => raw,
            Err(error) => return ReplyParts::plain(formatter::render_transport_error(&error)),
        };
        let Some(id) = find_document_id(&raw, name) else {
            tracing::debug!(
                event = AgentEvent::LookupMissed.as_str(),
                collection,
                name,
                "no document matched the name"
            );
            return ReplyParts::plain(FormattedResponse {
                text: format!("❌ '{name}'에 해당하는 문서를 찾지 못했어요."),
                kind: ResponseKind::Error,
                source_tool: Some("firestore_list_documents".to_string()),
            });
        };
        tracing::debug!(
            event = AgentEvent::LookupResolved.as_str(),
            collection,
            name,
            id = %id,
            "document name resolved"
        );

        let mut args = Map::new();
        args.insert("collection".to_string(), json!(collection));
        args.insert("id".to_string(), json!(id));
        let tool_name = match action {
            NamedAction::Detail => "firestore_get_document",
            NamedAction::Delete => "firestore_delete_document",
            NamedAction::Update(data) => {
                args.insert("data".to_string(), Value::Object(data));
                args.insert("merge".to_string(), json!(true));
                "firestore_update_document"
            }
        };
        match build_invocation(tool_name, args) {
            Ok(invocation) => self.dispatch(invocation, None).await,
            Err(error) => ReplyParts::plain(FormattedResponse {
                text: format!("❌ 오류 발생: {error}"),
                kind: ResponseKind::Error,
                source_tool: None,
            }),
        }
    }

    fn transport_for(&self, server: ToolServer) -> &ToolServerClient {
        match server {
            ToolServer::Data => &self.data,
            ToolServer::Email => &self.email,
        }
    }
}

/// First line of a reply, capped for history summaries.
fn summary_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    line.chars().take(80).collect()
}

/// Exact-match `data.description` scan over a listing payload.
fn find_document_id(raw: &RawToolResponse, name: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw.first_text()?.trim()).ok()?;
    let items = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(object) => object
            .get("documents")
            .or_else(|| object.get("items"))
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice),
        _ => return None,
    };
    let wanted = name.trim();
    for item in items {
        let description = item
            .pointer("/data/description")
            .or_else(|| item.get("description"))
            .and_then(Value::as_str);
        if description.map(str::trim) == Some(wanted) {
            return match item.get("id") {
                Some(Value::String(id)) => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => None,
            };
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitout_mcp_client::ContentItem;

    fn listing_raw() -> RawToolResponse {
        let payload = json!({"documents": [
            {"id": "A1", "data": {"description": "수성 효성 헤링턴"}},
            {"id": 1734608505871_u64, "data": {"description": "도원동 롯데캐슬"}},
        ]});
        RawToolResponse {
            content: vec![ContentItem::text(payload.to_string())],
            is_error: None,
        }
    }

    #[test]
    fn find_document_id_matches_exact_description() {
        assert_eq!(
            find_document_id(&listing_raw(), "수성 효성 헤링턴").as_deref(),
            Some("A1")
        );
        assert_eq!(
            find_document_id(&listing_raw(), "도원동 롯데캐슬").as_deref(),
            Some("1734608505871")
        );
        assert_eq!(find_document_id(&listing_raw(), "없는 주소"), None);
        assert_eq!(find_document_id(&listing_raw(), "수성"), None);
    }

    #[test]
    fn summary_line_takes_first_line_only() {
        assert_eq!(summary_line("첫 줄\n둘째 줄"), "첫 줄");
    }
}
