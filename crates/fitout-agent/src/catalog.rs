//! Static registry of the callable remote tools and their argument shapes.
//!
//! The catalog is the authoritative source the router uses to construct
//! valid tool calls; nothing outside this table is ever dispatched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Which remote server a tool lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolServer {
    /// Firestore-backed data server.
    Data,
    /// Estimate-email server.
    Email,
}

impl ToolServer {
    /// Stable lowercase name for logging.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Email => "email",
        }
    }
}

/// Primitive argument type in a tool schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    String,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ArgType {
    fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

/// One argument in a tool schema.
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub required: bool,
    pub typ: ArgType,
}

const fn req(name: &'static str, typ: ArgType) -> ArgSpec {
    ArgSpec {
        name,
        required: true,
        typ,
    }
}

const fn opt(name: &'static str, typ: ArgType) -> ArgSpec {
    ArgSpec {
        name,
        required: false,
        typ,
    }
}

/// Static description of one callable tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolDescriptor {
    pub server: ToolServer,
    pub name: &'static str,
    pub description: &'static str,
    pub args: &'static [ArgSpec],
}

/// All callable tools, data server first.
pub const CATALOG: &[ToolDescriptor] = &[
    ToolDescriptor {
        server: ToolServer::Data,
        name: "firestore_list_collections",
        description: "List top-level Firestore collections",
        args: &[],
    },
    ToolDescriptor {
        server: ToolServer::Data,
        name: "firestore_list_documents",
        description: "List documents in a collection (id + data per document)",
        args: &[req("collection", ArgType::String), opt("limit", ArgType::Integer)],
    },
    ToolDescriptor {
        server: ToolServer::Data,
        name: "firestore_get_document",
        description: "Fetch one document by id",
        args: &[req("collection", ArgType::String), req("id", ArgType::String)],
    },
    ToolDescriptor {
        server: ToolServer::Data,
        name: "firestore_add_document",
        description: "Create a document; the server assigns an id when none is given",
        args: &[
            req("collection", ArgType::String),
            req("data", ArgType::Object),
            opt("id", ArgType::String),
        ],
    },
    ToolDescriptor {
        server: ToolServer::Data,
        name: "firestore_update_document",
        description: "Partially update a document (merge by default)",
        args: &[
            req("collection", ArgType::String),
            req("id", ArgType::String),
            req("data", ArgType::Object),
            opt("merge", ArgType::Boolean),
        ],
    },
    ToolDescriptor {
        server: ToolServer::Data,
        name: "firestore_delete_document",
        description: "Delete a document by id",
        args: &[req("collection", ArgType::String), req("id", ArgType::String)],
    },
    ToolDescriptor {
        server: ToolServer::Data,
        name: "firestore_query_collection_group",
        description: "Query across a collection group with optional filters",
        args: &[
            req("collection", ArgType::String),
            opt("where", ArgType::Array),
            opt("order_by", ArgType::String),
            opt("limit", ArgType::Integer),
        ],
    },
    ToolDescriptor {
        server: ToolServer::Email,
        name: "send_estimate_email",
        description: "Render the estimate PDF for an address and email it",
        args: &[
            req("email", ArgType::String),
            req("address", ArgType::String),
            req("process_data", ArgType::Array),
            opt("notes", ArgType::String),
            opt("hidden_processes", ArgType::Array),
            opt("corporate_profit", ArgType::Integer),
            opt("subject", ArgType::String),
            opt("template_content", ArgType::String),
        ],
    },
    ToolDescriptor {
        server: ToolServer::Email,
        name: "test_connection",
        description: "Check the email server connection",
        args: &[],
    },
    ToolDescriptor {
        server: ToolServer::Email,
        name: "get_server_info",
        description: "Describe the email server",
        args: &[],
    },
];

/// Default page size for document listings.
pub const DEFAULT_LIST_LIMIT: u64 = 20;

/// Look up a tool by name.
#[must_use]
pub fn descriptor(name: &str) -> Option<&'static ToolDescriptor> {
    CATALOG.iter().find(|tool| tool.name == name)
}

/// Tool definitions in the shape the chat-completions API expects
/// (`name` / `description` / `parameters` JSON schema).
#[must_use]
pub fn tools_for_llm() -> Vec<Value> {
    CATALOG
        .iter()
        .map(|tool| {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for arg in tool.args {
                properties.insert(
                    arg.name.to_string(),
                    json!({"type": arg.typ.json_type()}),
                );
                if arg.required {
                    required.push(Value::String(arg.name.to_string()));
                }
            }
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                },
            })
        })
        .collect()
}

/// A single tool invocation bound for one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub server: ToolServer,
    pub tool_name: String,
    pub arguments: Map<String, Value>,
}

/// Why an invocation could not be built from the given name/arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    /// Tool name is not in the catalog.
    UnknownTool(String),
    /// A required argument is absent.
    MissingArg(&'static str),
}

impl std::fmt::Display for InvocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTool(name) => write!(f, "unknown tool `{name}`"),
            Self::MissingArg(name) => write!(f, "missing required argument `{name}`"),
        }
    }
}

/// Validate a tool call against the catalog and normalize its arguments.
///
/// Normalization: `process_data` is always coerced to an array; arguments not
/// in the schema are dropped.
///
/// # Errors
/// [`InvocationError::UnknownTool`] for names outside the catalog,
/// [`InvocationError::MissingArg`] when a required argument is absent.
pub fn build_invocation(
    name: &str,
    mut arguments: Map<String, Value>,
) -> Result<ToolInvocation, InvocationError> {
    let tool = descriptor(name).ok_or_else(|| InvocationError::UnknownTool(name.to_string()))?;
    arguments.retain(|key, _| tool.args.iter().any(|arg| arg.name == key));
    if tool.args.iter().any(|arg| arg.name == "process_data") {
        let coerced = coerce_process_data(arguments.get("process_data"));
        arguments.insert("process_data".to_string(), coerced);
    }
    for arg in tool.args.iter().filter(|arg| arg.required) {
        match arguments.get(arg.name) {
            None | Some(Value::Null) => return Err(InvocationError::MissingArg(arg.name)),
            Some(Value::String(text)) if text.trim().is_empty() => {
                return Err(InvocationError::MissingArg(arg.name));
            }
            Some(_) => {}
        }
    }
    Ok(ToolInvocation {
        server: tool.server,
        tool_name: tool.name.to_string(),
        arguments,
    })
}

/// Coerce any `process_data` shape to a JSON array for the wire: arrays pass
/// through, objects are wrapped, JSON-encoded strings are parsed first, and
/// everything else becomes `[]`.
#[must_use]
pub fn coerce_process_data(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Array(items)) => Value::Array(items.clone()),
        Some(Value::Object(map)) => Value::Array(vec![Value::Object(map.clone())]),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Value::Array(Vec::new());
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Array(items)) => Value::Array(items),
                Ok(Value::Object(map)) => Value::Array(vec![Value::Object(map)]),
                _ => Value::Array(Vec::new()),
            }
        }
        _ => Value::Array(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names_are_unique() {
        for (index, tool) in CATALOG.iter().enumerate() {
            assert!(
                CATALOG[index + 1..].iter().all(|other| other.name != tool.name),
                "duplicate tool name {}",
                tool.name
            );
        }
    }

    #[test]
    fn llm_definitions_carry_required_lists() {
        let tools = tools_for_llm();
        let add = tools
            .iter()
            .find(|tool| tool.get("name").and_then(Value::as_str) == Some("firestore_add_document"))
            .unwrap();
        let required = add.pointer("/parameters/required").unwrap();
        assert_eq!(required, &json!(["collection", "data"]));
    }

    #[test]
    fn build_invocation_rejects_unknown_tool() {
        let error = build_invocation("firestore_drop_collection", Map::new()).unwrap_err();
        assert!(matches!(error, InvocationError::UnknownTool(_)));
    }

    #[test]
    fn build_invocation_requires_collection() {
        let error = build_invocation("firestore_list_documents", Map::new()).unwrap_err();
        assert_eq!(error, InvocationError::MissingArg("collection"));
    }

    #[test]
    fn build_invocation_drops_unknown_arguments() {
        let mut args = Map::new();
        args.insert("collection".to_string(), json!("addressesJson"));
        args.insert("surprise".to_string(), json!(1));
        let invocation = build_invocation("firestore_list_documents", args).unwrap();
        assert!(!invocation.arguments.contains_key("surprise"));
        assert_eq!(invocation.server, ToolServer::Data);
    }

    #[test]
    fn process_data_always_becomes_an_array() {
        let cases = [
            (None, json!([])),
            (Some(json!(null)), json!([])),
            (Some(json!("")), json!([])),
            (Some(json!("[]")), json!([])),
            (Some(json!("[1,2]")), json!([1, 2])),
            (Some(json!("{\"a\":1}")), json!([{"a": 1}])),
            (Some(json!({"a": 1})), json!([{"a": 1}])),
            (Some(json!([{"a": 1}])), json!([{"a": 1}])),
            (Some(json!(5)), json!([])),
        ];
        for (input, expected) in cases {
            assert_eq!(coerce_process_data(input.as_ref()), expected);
        }
    }

    #[test]
    fn send_estimate_email_coerces_process_data_before_dispatch() {
        let mut args = Map::new();
        args.insert("email".to_string(), json!("a@b.co"));
        args.insert("address".to_string(), json!("수성 래미안"));
        args.insert("process_data".to_string(), json!("{\"공정\":\"도배\"}"));
        let invocation = build_invocation("send_estimate_email", args).unwrap();
        assert_eq!(invocation.server, ToolServer::Email);
        assert!(invocation.arguments.get("process_data").unwrap().is_array());
    }
}
