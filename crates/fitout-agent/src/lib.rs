//! Korean chat assistant for interior fit-out field work.
//!
//! One user message → intent router (LLM tool-calling with a deterministic
//! keyword fallback) → at most one remote tool dispatch (Firestore data
//! server or estimate-email server) → Korean reply. Sessions are in-memory;
//! each message is handled single-shot, with no tool retries.

#![allow(missing_docs)]

mod agent;
mod catalog;
mod config;
mod formatter;
mod gateway;
mod llm;
mod observability;
mod router;
mod session;

pub use agent::{Agent, HandleOutcome};
pub use catalog::{
    ArgSpec, ArgType, CATALOG, DEFAULT_LIST_LIMIT, InvocationError, ToolDescriptor,
    ToolInvocation, ToolServer, build_invocation, coerce_process_data, descriptor, tools_for_llm,
};
pub use config::AgentConfig;
pub use formatter::{
    FormattedResponse, OperationKind, RenderContext, ResponseKind, render, render_timeout,
    render_transport_error,
};
pub use gateway::{
    ChatRequest, ChatResponse, GatewayState, HealthResponse, gateway_router, run_http,
    validate_chat_request,
};
pub use router::{NamedAction, Router, RouterDecision};
pub use session::{Session, SessionStore, Turn, TurnRole};
