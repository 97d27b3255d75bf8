//! Integration tests against a mock tool server (axum on an ephemeral port):
//! handshake, session header echo, tools/call envelopes, SSE bodies, errors.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use fitout_mcp_client::{ToolServerClient, ToolServerConfig, TransportError};

/// One request as seen by the mock server.
#[derive(Debug, Clone)]
struct SeenRequest {
    method: String,
    session_header: Option<String>,
    params: Value,
}

#[derive(Clone)]
struct MockState {
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    /// Response mode: "json", "sse", "http-error", "rpc-error".
    mode: &'static str,
}

async fn mock_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let method = body
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let id = body.get("id").cloned().unwrap_or(json!(0));
    let session_header = headers
        .get("mcp-session-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.seen.lock().await.push(SeenRequest {
        method: method.clone(),
        session_header,
        params: body.get("params").cloned().unwrap_or(Value::Null),
    });

    if method == "initialize" {
        let envelope = json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {"protocolVersion": "2024-11-05", "capabilities": {}},
        });
        return ([("mcp-session-id", "sess-0042")], Json(envelope)).into_response();
    }

    match state.mode {
        "sse" => {
            let envelope = json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {"content": [{"type": "text", "text": "from-sse"}]},
            });
            let body = format!("event: message\ndata: {{\"noise\":1}}\ndata: {envelope}\n\n");
            (
                [("content-type", "text/event-stream")],
                body,
            )
                .into_response()
        }
        "http-error" => {
            (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
        }
        "rpc-error" => {
            let envelope = json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32000, "message": "tool exploded"},
            });
            Json(envelope).into_response()
        }
        _ => {
            let envelope = json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "content": [{"type": "text", "text": "{\"ok\":true}"}],
                    "isError": false,
                },
            });
            Json(envelope).into_response()
        }
    }
}

async fn spawn_mock(mode: &'static str) -> (String, MockState) {
    let state = MockState {
        seen: Arc::new(Mutex::new(Vec::new())),
        mode,
    };
    let app = Router::new()
        .route("/", post(mock_handler))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/"), state)
}

#[tokio::test]
async fn initialize_runs_once_and_session_header_is_echoed() {
    let (url, state) = spawn_mock("json").await;
    let client = ToolServerClient::new(ToolServerConfig::new("data", url)).unwrap();

    client.initialize_once().await.unwrap();
    client.initialize_once().await.unwrap();
    client.call("firestore_list_collections", json!({})).await.unwrap();
    client.call("firestore_list_collections", json!({})).await.unwrap();

    let seen = state.seen.lock().await;
    let initializes: Vec<_> = seen.iter().filter(|r| r.method == "initialize").collect();
    assert_eq!(initializes.len(), 1, "initialize must run at most once");
    assert!(initializes[0].session_header.is_none());

    let calls: Vec<_> = seen.iter().filter(|r| r.method == "tools/call").collect();
    assert_eq!(calls.len(), 2);
    for call in calls {
        assert_eq!(call.session_header.as_deref(), Some("sess-0042"));
    }
}

#[tokio::test]
async fn call_sends_name_and_arguments_and_decodes_content() {
    let (url, state) = spawn_mock("json").await;
    let client = ToolServerClient::new(ToolServerConfig::new("data", url)).unwrap();

    let raw = client
        .call("firestore_get_document", json!({"collection": "addressesJson", "id": "A1"}))
        .await
        .unwrap();
    assert_eq!(raw.first_text(), Some("{\"ok\":true}"));
    assert_eq!(raw.is_error, Some(false));

    let seen = state.seen.lock().await;
    let call = seen.iter().find(|r| r.method == "tools/call").unwrap();
    assert_eq!(
        call.params.get("name").and_then(Value::as_str),
        Some("firestore_get_document")
    );
    assert_eq!(
        call.params
            .pointer("/arguments/collection")
            .and_then(Value::as_str),
        Some("addressesJson")
    );
}

#[tokio::test]
async fn event_stream_bodies_use_the_last_data_line() {
    let (url, _state) = spawn_mock("sse").await;
    let client = ToolServerClient::new(ToolServerConfig::new("data", url)).unwrap();

    let raw = client.call("test_connection", json!({})).await.unwrap();
    assert_eq!(raw.first_text(), Some("from-sse"));
}

#[tokio::test]
async fn http_error_status_surfaces_as_transport_error() {
    let (url, _state) = spawn_mock("http-error").await;
    let client = ToolServerClient::new(ToolServerConfig::new("data", url)).unwrap();

    let error = client.call("test_connection", json!({})).await.unwrap_err();
    match error {
        TransportError::Status { status, .. } => assert_eq!(status, 500),
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn json_rpc_error_surfaces_with_server_message() {
    let (url, _state) = spawn_mock("rpc-error").await;
    let client = ToolServerClient::new(ToolServerConfig::new("data", url)).unwrap();

    let error = client.call("test_connection", json!({})).await.unwrap_err();
    match error {
        TransportError::Rpc { code, message } => {
            assert_eq!(code, -32000);
            assert_eq!(message, "tool exploded");
        }
        other => panic!("expected Rpc error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    // Port 9 (discard) on localhost is not listening.
    let client =
        ToolServerClient::new(ToolServerConfig::new("data", "http://127.0.0.1:9/")).unwrap();
    let error = client.call("test_connection", json!({})).await.unwrap_err();
    assert!(matches!(error, TransportError::Network { .. }));
}
