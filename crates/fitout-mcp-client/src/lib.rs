//! Tool-server client: JSON-RPC 2.0 over HTTP against one remote tool server.
//!
//! **Protocol:**
//! 1. `initialize` request with protocolVersion, capabilities, clientInfo.
//!    The response may carry an `mcp-session-id` header; when present it is
//!    cached and echoed as a header on every subsequent request.
//! 2. `tools/call` with `{name, arguments}`; the result is a content envelope
//!    (`content: [{type: "text", text}]` plus an error flag).
//!
//! Responses arrive as `application/json` or `text/event-stream`; for the
//! event stream the last decodable `data: <json>` line is authoritative.
//! Failed calls are never retried here.

mod client;
mod error;
mod wire;

pub use client::{ToolServerClient, ToolServerConfig};
pub use error::TransportError;
pub use wire::{ContentItem, RawToolResponse};
