//! Korean rendering of raw tool responses.
//!
//! One unwrap step normalizes the content envelope (JSON payload, plain text,
//! or server-reported error); rendering is a pure function of the normalized
//! value plus the operation kind. No network, no retries, no state.

mod labels;

use fitout_mcp_client::{RawToolResponse, TransportError};
use serde_json::Value;

use labels::{PRIORITY_FIELDS, label};

/// What kind of operation produced the response (drives rendering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    ListCollections,
    List,
    Detail,
    Search,
    Add,
    Update,
    Delete,
    EmailSend,
    EmailTest,
    EmailInfo,
}

/// Kind of the rendered reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    List,
    Detail,
    Search,
    MutationOk,
    MutationErr,
    Plain,
    Error,
}

/// Rendered reply plus classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedResponse {
    pub text: String,
    pub kind: ResponseKind,
    pub source_tool: Option<String>,
}

impl FormattedResponse {
    /// Plain passthrough (router replies).
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ResponseKind::Plain,
            source_tool: None,
        }
    }

    /// True unless the reply reports an error.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !matches!(self.kind, ResponseKind::MutationErr | ResponseKind::Error)
    }
}

/// Extra context the orchestrator passes alongside the raw response.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// In-memory filter applied to list items before counting.
    pub search_term: Option<String>,
    /// Recipient echoed in email confirmations.
    pub recipient: Option<String>,
}

/// Classify a tool by the operation kind its response is rendered as.
#[must_use]
pub fn operation_kind(tool_name: &str, has_search_term: bool) -> OperationKind {
    match tool_name {
        "firestore_list_collections" => OperationKind::ListCollections,
        "firestore_get_document" => OperationKind::Detail,
        "firestore_add_document" => OperationKind::Add,
        "firestore_update_document" => OperationKind::Update,
        "firestore_delete_document" => OperationKind::Delete,
        "send_estimate_email" => OperationKind::EmailSend,
        "test_connection" => OperationKind::EmailTest,
        "get_server_info" => OperationKind::EmailInfo,
        // list_documents / query_collection_group
        _ if has_search_term => OperationKind::Search,
        _ => OperationKind::List,
    }
}

/// Normalized payload after envelope unwrap.
#[derive(Debug)]
enum Payload {
    Json(Value),
    Text(String),
    ServerError(String),
}

/// Unwrap `content[0].text`: structured value when it parses as JSON,
/// the string as-is otherwise, or the server-reported error.
fn unwrap_content(raw: &RawToolResponse) -> Payload {
    let text = raw.first_text().unwrap_or_default();
    if raw.is_error == Some(true) {
        let reason = if text.trim().is_empty() {
            "알 수 없는 오류".to_string()
        } else {
            text.to_string()
        };
        return Payload::ServerError(reason);
    }
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            if let Some(reason) = embedded_error(&value) {
                return Payload::ServerError(reason);
            }
            return Payload::Json(value);
        }
    }
    Payload::Text(text.to_string())
}

/// Error reported inside the payload: `{error: …}` or `{status: "error"}`.
fn embedded_error(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    if let Some(error) = object.get("error") {
        let reason = match error {
            Value::String(text) => text.clone(),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| other.to_string(), str::to_string),
        };
        return Some(reason);
    }
    if object.get("status").and_then(Value::as_str) == Some("error") {
        let reason = object
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("알 수 없는 오류");
        return Some(reason.to_string());
    }
    None
}

/// Render one raw tool response as Korean user-facing text.
#[must_use]
pub fn render(raw: &RawToolResponse, kind: OperationKind, context: &RenderContext) -> FormattedResponse {
    match unwrap_content(raw) {
        Payload::ServerError(reason) => {
            let response_kind = match kind {
                OperationKind::Add
                | OperationKind::Update
                | OperationKind::Delete
                | OperationKind::EmailSend => ResponseKind::MutationErr,
                _ => ResponseKind::Error,
            };
            FormattedResponse {
                text: format!("❌ 오류 발생: {reason}"),
                kind: response_kind,
                source_tool: None,
            }
        }
        Payload::Json(value) => render_payload(&value, None, kind, context),
        Payload::Text(text) => render_payload(&Value::Null, Some(text.as_str()), kind, context),
    }
}

fn render_payload(
    value: &Value,
    text: Option<&str>,
    kind: OperationKind,
    context: &RenderContext,
) -> FormattedResponse {
    match kind {
        OperationKind::ListCollections | OperationKind::List | OperationKind::Search => {
            render_listing(value, text, kind, context.search_term.as_deref())
        }
        OperationKind::Detail => render_detail(value, text),
        OperationKind::Add => mutation_ok("✅ 문서가 성공적으로 추가되었습니다.", value),
        OperationKind::Update => mutation_ok("✅ 문서가 성공적으로 수정되었습니다.", value),
        OperationKind::Delete => mutation_ok("✅ 문서가 성공적으로 삭제되었습니다.", value),
        OperationKind::EmailSend => {
            let text = match context.recipient.as_deref() {
                Some(recipient) => {
                    format!("✅ {recipient} 주소로 견적서 이메일을 보냈습니다.")
                }
                None => "✅ 견적서 이메일을 보냈습니다.".to_string(),
            };
            FormattedResponse {
                text,
                kind: ResponseKind::MutationOk,
                source_tool: None,
            }
        }
        OperationKind::EmailTest => FormattedResponse {
            text: "✅ 이메일 서버 연결이 정상입니다.".to_string(),
            kind: ResponseKind::Plain,
            source_tool: None,
        },
        OperationKind::EmailInfo => render_server_info(value, text),
    }
}

/// List/search rendering: header with count, then `<id> - <summary>` lines.
fn render_listing(
    value: &Value,
    text: Option<&str>,
    kind: OperationKind,
    search_term: Option<&str>,
) -> FormattedResponse {
    if let Some(text) = text {
        // Non-JSON payload from a list tool: pass the server text through.
        let body = if text.trim().is_empty() {
            "📭 등록된 문서가 없습니다.".to_string()
        } else {
            text.to_string()
        };
        return FormattedResponse {
            text: body,
            kind: listing_kind(kind),
            source_tool: None,
        };
    }

    let mut items = document_items(value);
    if let Some(term) = search_term {
        let needle = term.to_lowercase();
        items.retain(|(_, data)| matches_search(data.as_ref(), &needle));
    }

    if items.is_empty() {
        let empty_text = match kind {
            OperationKind::Search => "🔍 검색 결과가 없습니다.",
            OperationKind::ListCollections => "📭 컬렉션이 없습니다.",
            _ => "📭 등록된 문서가 없습니다.",
        };
        return FormattedResponse {
            text: empty_text.to_string(),
            kind: listing_kind(kind),
            source_tool: None,
        };
    }

    let header = match kind {
        OperationKind::Search => format!("🔍 검색 결과 ({}건)", items.len()),
        OperationKind::ListCollections => format!("📚 컬렉션 목록 ({}건)", items.len()),
        _ => format!("📋 문서 목록 ({}건)", items.len()),
    };
    let mut lines = vec![header];
    for (id, data) in &items {
        match summary_of(data.as_ref()) {
            Some(summary) => lines.push(format!("{id} - {summary}")),
            None => lines.push(id.clone()),
        }
    }
    FormattedResponse {
        text: lines.join("\n"),
        kind: listing_kind(kind),
        source_tool: None,
    }
}

fn listing_kind(kind: OperationKind) -> ResponseKind {
    if kind == OperationKind::Search {
        ResponseKind::Search
    } else {
        ResponseKind::List
    }
}

/// Items of a listing payload as `(id, data)` pairs.
fn document_items(value: &Value) -> Vec<(String, Option<Value>)> {
    let array = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(object) => object
            .get("documents")
            .or_else(|| object.get("items"))
            .or_else(|| object.get("collections"))
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice),
        _ => &[],
    };
    array
        .iter()
        .map(|item| match item {
            Value::String(name) => (name.clone(), None),
            Value::Object(object) => {
                let id = object
                    .get("id")
                    .map(display_scalar)
                    .or_else(|| object.get("name").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_else(|| "?".to_string());
                let data = object.get("data").cloned().unwrap_or_else(|| item.clone());
                (id, Some(data))
            }
            other => (display_scalar(other), None),
        })
        .collect()
}

fn summary_of(data: Option<&Value>) -> Option<String> {
    let object = data?.as_object()?;
    for key in ["description", "name", "title"] {
        if let Some(text) = object.get(key).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

fn matches_search(data: Option<&Value>, needle: &str) -> bool {
    let Some(object) = data.and_then(Value::as_object) else {
        return false;
    };
    ["description", "dataJson"].iter().any(|key| {
        object
            .get(*key)
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_lowercase().contains(needle))
    })
}

/// Detail rendering: priority fields in fixed order, then JSON-encoded string
/// fields expanded recursively under a `📋 … 내용:` sub-header.
fn render_detail(value: &Value, text: Option<&str>) -> FormattedResponse {
    if let Some(text) = text {
        let body = if text.trim().is_empty() {
            "📭 문서 내용이 없습니다.".to_string()
        } else {
            text.to_string()
        };
        return FormattedResponse {
            text: body,
            kind: ResponseKind::Detail,
            source_tool: None,
        };
    }

    let mut lines = vec!["📄 문서 상세 정보".to_string()];
    let object = value.as_object();
    if let Some(object) = object {
        if let Some(id) = object.get("id") {
            lines.push(format!("🆔 ID: {}", display_scalar(id)));
        }
    }
    let data = object
        .and_then(|object| object.get("data"))
        .and_then(Value::as_object)
        .or(object);

    if let Some(data) = data {
        for field in PRIORITY_FIELDS {
            if let Some(value) = data.get(*field) {
                if !value.is_object() && !value.is_array() {
                    lines.push(format!("{}: {}", label(field), display_scalar(value)));
                }
            }
        }
        for (key, value) in data {
            if PRIORITY_FIELDS.contains(&key.as_str()) || key == "id" {
                continue;
            }
            let Some(text) = value.as_str() else { continue };
            let trimmed = text.trim();
            if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
                continue;
            }
            if let Ok(embedded) = serde_json::from_str::<Value>(trimmed) {
                lines.push(format!("📋 {} 내용:", label(key)));
                render_embedded(&embedded, 1, &mut lines);
            }
        }
    }
    FormattedResponse {
        text: lines.join("\n"),
        kind: ResponseKind::Detail,
        source_tool: None,
    }
}

/// Recursive key rendering for embedded JSON, in order of appearance.
fn render_embedded(value: &Value, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(object) => {
            for (key, value) in object {
                match value {
                    Value::Object(_) | Value::Array(_) => {
                        lines.push(format!("{indent}{}:", label(key)));
                        render_embedded(value, depth + 1, lines);
                    }
                    other => {
                        lines.push(format!("{indent}{}: {}", label(key), display_scalar(other)));
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(_) | Value::Array(_) => render_embedded(item, depth, lines),
                    other => lines.push(format!("{indent}- {}", display_scalar(other))),
                }
            }
        }
        other => lines.push(format!("{indent}{}", display_scalar(other))),
    }
}

fn mutation_ok(message: &str, value: &Value) -> FormattedResponse {
    let mut text = message.to_string();
    if let Some(id) = value
        .get("id")
        .or_else(|| value.get("documentId"))
        .filter(|id| !id.is_null())
    {
        text.push_str(&format!("\n🆔 ID: {}", display_scalar(id)));
    }
    FormattedResponse {
        text,
        kind: ResponseKind::MutationOk,
        source_tool: None,
    }
}

fn render_server_info(value: &Value, text: Option<&str>) -> FormattedResponse {
    let mut lines = vec!["ℹ️ 이메일 서버 정보:".to_string()];
    match (value.as_object(), text) {
        (Some(object), _) => {
            for (key, value) in object {
                lines.push(format!("{}: {}", label(key), display_scalar(value)));
            }
        }
        (None, Some(text)) if !text.trim().is_empty() => lines.push(text.to_string()),
        _ => {}
    }
    FormattedResponse {
        text: lines.join("\n"),
        kind: ResponseKind::Plain,
        source_tool: None,
    }
}

/// Scalar display: timestamps truncated to the date, booleans in Korean.
fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => short_date(text).to_string(),
        Value::Bool(true) => "예".to_string(),
        Value::Bool(false) => "아니오".to_string(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Truncate `YYYY-MM-DDTHH:…` timestamps to `YYYY-MM-DD`.
fn short_date(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() > 10
        && bytes[10] == b'T'
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[8..10].iter().all(u8::is_ascii_digit)
    {
        return &value[..10];
    }
    value
}

/// Transport failures as user-facing Korean text.
#[must_use]
pub fn render_transport_error(error: &TransportError) -> FormattedResponse {
    if error.is_timeout() {
        return render_timeout();
    }
    FormattedResponse {
        text: format!("❌ 오류 발생: {error}"),
        kind: ResponseKind::Error,
        source_tool: None,
    }
}

/// Fixed timeout reply.
#[must_use]
pub fn render_timeout() -> FormattedResponse {
    FormattedResponse {
        text: "❌ 요청 시간이 초과되었습니다.".to_string(),
        kind: ResponseKind::Error,
        source_tool: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitout_mcp_client::ContentItem;
    use serde_json::json;

    fn raw_with_text(text: impl Into<String>) -> RawToolResponse {
        RawToolResponse {
            content: vec![ContentItem::text(text)],
            is_error: None,
        }
    }

    fn raw_with_json(value: &Value) -> RawToolResponse {
        raw_with_text(value.to_string())
    }

    #[test]
    fn timestamps_truncate_to_date() {
        assert_eq!(short_date("2024-12-24T02:49:35.432Z"), "2024-12-24");
        assert_eq!(short_date("2024-12-24"), "2024-12-24");
        assert_eq!(short_date("note about T shirts"), "note about T shirts");
    }

    #[test]
    fn list_renders_header_count_and_lines() {
        let payload = json!({"documents": [
            {"id": "A1", "data": {"description": "수성 효성 헤링턴"}},
            {"id": "A2", "data": {"description": "도원동 롯데캐슬"}},
        ]});
        let out = render(&raw_with_json(&payload), OperationKind::List, &RenderContext::default());
        let lines: Vec<&str> = out.text.lines().collect();
        assert!(lines[0].contains('2'), "header must carry the count: {}", lines[0]);
        assert_eq!(lines[1], "A1 - 수성 효성 헤링턴");
        assert_eq!(lines[2], "A2 - 도원동 롯데캐슬");
        assert_eq!(out.kind, ResponseKind::List);
    }

    #[test]
    fn empty_list_is_a_korean_message_not_empty() {
        let out = render(
            &raw_with_json(&json!({"documents": []})),
            OperationKind::List,
            &RenderContext::default(),
        );
        assert!(!out.text.is_empty());
        assert!(out.text.contains("없습니다"));
    }

    #[test]
    fn search_filters_on_description_and_datajson() {
        let payload = json!([
            {"id": "A1", "data": {"description": "수성 효성 헤링턴"}},
            {"id": "A2", "data": {"description": "도원동 롯데캐슬", "dataJson": "{\"clientName\":\"효성\"}"}},
            {"id": "A3", "data": {"description": "범어동 아파트"}},
        ]);
        let context = RenderContext {
            search_term: Some("효성".to_string()),
            recipient: None,
        };
        let out = render(&raw_with_json(&payload), OperationKind::Search, &context);
        assert!(out.text.contains("2건"));
        assert!(out.text.contains("A1"));
        assert!(out.text.contains("A2"));
        assert!(!out.text.contains("A3"));
        assert_eq!(out.kind, ResponseKind::Search);
    }

    #[test]
    fn detail_renders_priority_fields_and_expands_datajson() {
        let payload = json!({
            "id": "1734608505871",
            "data": {
                "description": "수성 효성 헤링턴 105동 1503호",
                "createdAt": "2024-12-24T02:49:35.432Z",
                "dataJson": "{\"firstFloorPassword\":\"1503#1234\",\"unitPassword\":\"1234\",\"siteNumber\":15}",
            },
        });
        let out = render(&raw_with_json(&payload), OperationKind::Detail, &RenderContext::default());
        assert!(out.text.contains("📝 설명: 수성 효성 헤링턴 105동 1503호"));
        assert!(out.text.contains("📅 생성일: 2024-12-24"));
        assert!(out.text.contains("내용:"));
        assert!(out.text.contains("🗝️ 1층비밀번호: 1503#1234"));
        assert!(out.text.contains("🔑 세대비밀번호: 1234"));
        assert!(out.text.contains("🔢 현장번호: 15"));
    }

    #[test]
    fn plain_string_with_brace_mid_text_is_not_expanded() {
        let payload = json!({
            "data": {
                "description": "본문",
                "memoText": "가격은 {협의} 이후 확정",
            },
        });
        let out = render(&raw_with_json(&payload), OperationKind::Detail, &RenderContext::default());
        assert!(!out.text.contains("내용:"));
    }

    #[test]
    fn mutation_success_and_error_render_fixed_messages() {
        let ok = render(
            &raw_with_json(&json!({"id": "A9", "status": "ok"})),
            OperationKind::Add,
            &RenderContext::default(),
        );
        assert!(ok.text.contains("✅ 문서가 성공적으로 추가되었습니다."));
        assert!(ok.text.contains("A9"));
        assert_eq!(ok.kind, ResponseKind::MutationOk);

        let err = render(
            &raw_with_json(&json!({"error": "이미 존재하는 문서입니다"})),
            OperationKind::Add,
            &RenderContext::default(),
        );
        assert!(err.text.starts_with("❌ 오류 발생: "));
        assert!(err.text.contains("이미 존재하는 문서입니다"));
        assert_eq!(err.kind, ResponseKind::MutationErr);
    }

    #[test]
    fn is_error_flag_overrides_payload() {
        let raw = RawToolResponse {
            content: vec![ContentItem::text("백엔드 실패")],
            is_error: Some(true),
        };
        let out = render(&raw, OperationKind::List, &RenderContext::default());
        assert_eq!(out.kind, ResponseKind::Error);
        assert!(out.text.contains("백엔드 실패"));
    }

    #[test]
    fn email_send_confirmation_includes_recipient() {
        let context = RenderContext {
            search_term: None,
            recipient: Some("gncloud86@naver.com".to_string()),
        };
        let out = render(
            &raw_with_text("Estimate email sent"),
            OperationKind::EmailSend,
            &context,
        );
        assert!(out.text.contains("gncloud86@naver.com"));
        assert_eq!(out.kind, ResponseKind::MutationOk);
    }

    #[test]
    fn rendering_is_deterministic() {
        let payload = json!({"documents": [{"id": "A1", "data": {"description": "수성"}}]});
        let raw = raw_with_json(&payload);
        let first = render(&raw, OperationKind::List, &RenderContext::default());
        let second = render(&raw, OperationKind::List, &RenderContext::default());
        assert_eq!(first, second);
    }
}
