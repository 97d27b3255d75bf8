//! JSON-RPC 2.0 envelope and tool-call result types.

use serde::{Deserialize, Serialize};

pub(crate) const JSONRPC_VERSION: &str = "2.0";
pub(crate) const PROTOCOL_VERSION: &str = "2024-11-05";

/// Outgoing JSON-RPC request envelope.
#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: i64,
    pub method: &'static str,
    pub params: serde_json::Value,
}

/// Incoming JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcResponse {
    #[serde(default)]
    #[allow(dead_code)]
    pub id: Option<i64>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorBody>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JsonRpcErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// One content item in a tool response (only `type: "text"` carries payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Content type discriminator (`"text"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Text payload: a human string or a JSON-encoded value.
    #[serde(default)]
    pub text: String,
}

impl ContentItem {
    /// Build a text content item.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Raw tool response: ordered content plus the server's error flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawToolResponse {
    /// Ordered content items.
    #[serde(default)]
    pub content: Vec<ContentItem>,
    /// Set by the server when the tool itself reported a failure.
    #[serde(rename = "isError", alias = "is_error", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl RawToolResponse {
    /// Text of the first content item, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|item| item.text.as_str())
    }
}
