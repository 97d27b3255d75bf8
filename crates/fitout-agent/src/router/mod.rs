//! Intent router: one utterance → exactly one of plain reply / tool call.
//!
//! The LLM path gives the model the tool catalog under a strict contract
//! (one tool call or plain text). Malformed output or an unavailable LLM
//! drops to the deterministic keyword path. The router never emits more than
//! one tool call per utterance.

mod extract;
mod keyword;

use serde_json::{Map, Value, json};

use crate::catalog::{
    DEFAULT_LIST_LIMIT, InvocationError, ToolInvocation, build_invocation, tools_for_llm,
};
use crate::llm::{ChatMessage, LlmClient};
use crate::observability::AgentEvent;
use crate::session::{Turn, TurnRole};

use keyword::Intent;

/// Collections the assistant operates on.
const ADDRESS_COLLECTION: &str = "addressesJson";
const SCHEDULE_COLLECTION: &str = "schedules";
const CONTRACTOR_COLLECTION: &str = "contractors";

/// Recent turns forwarded to the LLM for conversational continuity.
const HISTORY_WINDOW: usize = 20;

const GREETING_REPLY: &str =
    "안녕하세요! 인테리어 현장 도우미입니다. 주소 관리, 일정 관리, 견적서 이메일 발송을 도와드려요. 😊";
const HELP_REPLY: &str = "다음과 같이 요청해 주세요:\n\
    📍 주소 — \"주소 목록 보여줘\", \"주소명: ○○ 등록해줘\", \"○○ 상세정보\", \"○○ 삭제해줘\"\n\
    📅 일정 — \"오늘 일정\", \"예정된 일정\", \"일정 등록해줘\"\n\
    📧 견적서 — \"보낼주소@example.com 주소로 ○○ 견적서 보내줘\"";
const UNKNOWN_REPLY: &str =
    "요청을 이해하지 못했어요. \"주소 목록\"이나 \"오늘 일정\"처럼 말씀해 주시면 도와드릴게요.";
const REGISTER_CLARIFY: &str =
    "등록할 주소를 말씀해 주세요. 예: \"주소명: 서울시 강남구 테헤란로 123 등록해줘\"";
const UPDATE_CLARIFY: &str =
    "수정할 주소와 변경할 내용을 함께 말씀해 주세요. 예: \"○○ 메모를 △△로 수정해줘\"";
const DELETE_CLARIFY: &str = "삭제할 주소의 이름이나 ID를 말씀해 주세요.";
const DETAIL_CLARIFY: &str = "조회할 주소의 이름이나 ID를 말씀해 주세요.";
const SEARCH_CLARIFY: &str = "어떤 주소를 검색할까요? 검색어를 함께 말씀해 주세요.";
const EMAIL_CLARIFY: &str = "견적서를 받을 이메일 주소를 함께 말씀해 주세요.";
const EMAIL_ADDRESS_CLARIFY: &str = "어느 현장의 견적서를 보낼까요? 현장 주소를 함께 말씀해 주세요.";
const SCHEDULE_REGISTER_CLARIFY: &str = "등록할 일정 내용을 말씀해 주세요.";
const SCHEDULE_UPDATE_GUIDE: &str =
    "일정 수정은 채팅으로 지원되지 않아요. 일정 화면에서 직접 수정해 주세요.";
const SCHEDULE_DELETE_GUIDE: &str =
    "일정 삭제는 채팅으로 지원되지 않아요. 일정 화면에서 직접 삭제해 주세요.";

const SYSTEM_PROMPT: &str = "당신은 인테리어 시공 업체의 업무 도우미입니다. \
    사용자의 한국어 요청을 처리하기 위해 도구를 호출하거나, 도구가 필요 없으면 한국어로 직접 답합니다.\n\
    규칙:\n\
    - 한 메시지에 도구는 정확히 하나만 호출합니다. 같은 도구를 반복 호출하지 않습니다.\n\
    - 주소는 addressesJson, 일정은 schedules, 협력업체는 contractors 컬렉션을 사용합니다.\n\
    - 주소 등록 시 data는 {description, dataJson} 형태이며 dataJson에는 siteNumber, isCompleted, createdAt을 넣습니다.\n\
    - 문서 id는 10자리 이상 숫자입니다. 이름만 주어지면 id 인자에 그 이름을 그대로 넣으세요.\n\
    - 실패한 호출을 다시 시도하지 않습니다.";

/// Follow-up action once a document name has been resolved to an id.
#[derive(Debug, Clone, PartialEq)]
pub enum NamedAction {
    Detail,
    Update(Map<String, Value>),
    Delete,
}

/// What the router decided for one utterance. Consumed at most once.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterDecision {
    /// Answer directly with this text; no tool is called.
    Plain(String),
    /// Call exactly one tool.
    Call {
        invocation: ToolInvocation,
        /// In-memory filter applied to the listing before rendering.
        search_term: Option<String>,
    },
    /// Resolve a document by `description` first, then run the action.
    ResolveByName {
        collection: String,
        name: String,
        action: NamedAction,
    },
}

/// Intent router. Stateless apart from the LLM handle.
pub struct Router {
    llm: Option<LlmClient>,
}

impl Router {
    /// Router without an LLM: every utterance goes through the keyword path.
    #[must_use]
    pub fn keyword_only() -> Self {
        Self { llm: None }
    }

    pub(crate) fn with_llm(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    /// Decide for one utterance. Invoked exactly once per utterance.
    pub async fn decide(&self, utterance: &str, history: &[Turn]) -> RouterDecision {
        if let Some(ref llm) = self.llm {
            match self.decide_with_llm(llm, utterance, history).await {
                Ok(Some(decision)) => return decision,
                Ok(None) => {
                    tracing::debug!(
                        event = AgentEvent::RouteFallback.as_str(),
                        reason = "malformed_llm_output",
                        "falling back to keyword routing"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        event = AgentEvent::RouteFallback.as_str(),
                        reason = "llm_unavailable",
                        error = %error,
                        "falling back to keyword routing"
                    );
                }
            }
        }
        let intent = keyword::classify(utterance);
        tracing::debug!(
            event = AgentEvent::RouteDecided.as_str(),
            route = "keyword",
            intent = intent.as_str(),
            "route decided"
        );
        decision_for_intent(intent, utterance)
    }

    /// One LLM round under the tool-calling contract. `Ok(None)` means the
    /// output was unusable and the keyword path should decide.
    async fn decide_with_llm(
        &self,
        llm: &LlmClient,
        utterance: &str,
        history: &[Turn],
    ) -> anyhow::Result<Option<RouterDecision>> {
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        let recent = history.len().saturating_sub(HISTORY_WINDOW);
        for turn in &history[recent..] {
            messages.push(match turn.role {
                TurnRole::User => ChatMessage::user(turn.content.clone()),
                TurnRole::Assistant => ChatMessage::assistant(turn.content.clone()),
            });
        }
        messages.push(ChatMessage::user(utterance));

        let reply = llm.chat(messages, Some(tools_for_llm())).await?;

        if let Some(tool_calls) = reply.tool_calls {
            let Some(first) = tool_calls.first() else {
                return Ok(plain_or_none(reply.content));
            };
            if tool_calls.len() > 1 {
                tracing::debug!(
                    event = AgentEvent::RouteDecided.as_str(),
                    dropped_calls = tool_calls.len() - 1,
                    "multiple tool calls in one turn; keeping the first"
                );
            }
            let arguments: Map<String, Value> = if first.function.arguments.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str(&first.function.arguments) {
                    Ok(Value::Object(map)) => map,
                    _ => return Ok(None),
                }
            };
            return match build_invocation(&first.function.name, arguments) {
                Ok(invocation) => {
                    tracing::debug!(
                        event = AgentEvent::RouteDecided.as_str(),
                        route = "llm",
                        tool = %invocation.tool_name,
                        "route decided"
                    );
                    Ok(Some(resolve_named_id(invocation)))
                }
                Err(InvocationError::UnknownTool(_) | InvocationError::MissingArg(_)) => Ok(None),
            };
        }
        Ok(plain_or_none(reply.content))
    }
}

fn plain_or_none(content: Option<String>) -> Option<RouterDecision> {
    content
        .filter(|text| !text.trim().is_empty())
        .map(RouterDecision::Plain)
}

/// Id-bearing calls whose `id` is not an all-digits token become a
/// name-resolution decision; the orchestrator binds the id first.
fn resolve_named_id(invocation: ToolInvocation) -> RouterDecision {
    let id_is_name = invocation
        .arguments
        .get("id")
        .and_then(Value::as_str)
        .map(|id| !(id.len() >= 10 && id.chars().all(|c| c.is_ascii_digit())));
    let collection = invocation
        .arguments
        .get("collection")
        .and_then(Value::as_str)
        .unwrap_or(ADDRESS_COLLECTION)
        .to_string();
    if id_is_name == Some(true) {
        let name = invocation
            .arguments
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let action = match invocation.tool_name.as_str() {
            "firestore_get_document" => Some(NamedAction::Detail),
            "firestore_delete_document" => Some(NamedAction::Delete),
            "firestore_update_document" => invocation
                .arguments
                .get("data")
                .and_then(Value::as_object)
                .cloned()
                .map(NamedAction::Update),
            _ => None,
        };
        if let Some(action) = action {
            return RouterDecision::ResolveByName {
                collection,
                name,
                action,
            };
        }
    }
    RouterDecision::Call {
        invocation,
        search_term: None,
    }
}

/// Deterministic decision for one classified intent.
fn decision_for_intent(intent: Intent, utterance: &str) -> RouterDecision {
    match intent {
        Intent::Greet => RouterDecision::Plain(GREETING_REPLY.to_string()),
        Intent::Help | Intent::Capabilities => RouterDecision::Plain(HELP_REPLY.to_string()),
        Intent::Unknown => RouterDecision::Plain(UNKNOWN_REPLY.to_string()),

        Intent::AddressList => list_documents(ADDRESS_COLLECTION, list_limit(utterance), None),
        Intent::AddressSearch => {
            let term = extract::search_term(utterance);
            if term.is_empty() {
                RouterDecision::Plain(SEARCH_CLARIFY.to_string())
            } else {
                list_documents(ADDRESS_COLLECTION, 100, Some(term))
            }
        }
        Intent::AddressDetail => match extract::document_id(utterance) {
            Some(id) => get_document(ADDRESS_COLLECTION, &id),
            None => {
                let name = extract::detail_name(utterance);
                if name.is_empty() {
                    RouterDecision::Plain(DETAIL_CLARIFY.to_string())
                } else {
                    RouterDecision::ResolveByName {
                        collection: ADDRESS_COLLECTION.to_string(),
                        name,
                        action: NamedAction::Detail,
                    }
                }
            }
        },
        Intent::AddressRegister => {
            let description = extract::register_description(utterance);
            if description.is_empty() {
                return RouterDecision::Plain(REGISTER_CLARIFY.to_string());
            }
            let mut args = Map::new();
            args.insert("collection".to_string(), json!(ADDRESS_COLLECTION));
            args.insert(
                "data".to_string(),
                json!({
                    "description": description,
                    "dataJson": extract::datajson_skeleton(),
                }),
            );
            call_or_clarify("firestore_add_document", args, REGISTER_CLARIFY)
        }
        Intent::AddressUpdate => RouterDecision::Plain(UPDATE_CLARIFY.to_string()),
        Intent::AddressDelete => match extract::document_id(utterance) {
            Some(id) => delete_document(ADDRESS_COLLECTION, &id),
            None => {
                let name = extract::mutate_name(utterance);
                if name.is_empty() {
                    RouterDecision::Plain(DELETE_CLARIFY.to_string())
                } else {
                    RouterDecision::ResolveByName {
                        collection: ADDRESS_COLLECTION.to_string(),
                        name,
                        action: NamedAction::Delete,
                    }
                }
            }
        },

        Intent::ScheduleToday => query_schedules(json!([["date", "==", extract::today()]]), None),
        Intent::ScheduleUpcoming => {
            query_schedules(json!([["date", ">=", extract::today()]]), Some("date"))
        }
        Intent::ScheduleList => list_documents(SCHEDULE_COLLECTION, list_limit(utterance), None),
        Intent::ScheduleReport => list_documents(SCHEDULE_COLLECTION, 100, None),
        Intent::ScheduleSearch => {
            let term = extract::search_term(utterance);
            if term.is_empty() {
                RouterDecision::Plain(SEARCH_CLARIFY.to_string())
            } else {
                list_documents(SCHEDULE_COLLECTION, 100, Some(term))
            }
        }
        Intent::ScheduleRegister => {
            let description = extract::register_description(utterance.replace("일정", " ").trim());
            if description.is_empty() {
                return RouterDecision::Plain(SCHEDULE_REGISTER_CLARIFY.to_string());
            }
            let mut args = Map::new();
            args.insert("collection".to_string(), json!(SCHEDULE_COLLECTION));
            args.insert(
                "data".to_string(),
                json!({
                    "description": description,
                    "date": extract::today(),
                    "createdAt": extract::now_rfc3339(),
                }),
            );
            call_or_clarify("firestore_add_document", args, SCHEDULE_REGISTER_CLARIFY)
        }
        Intent::ScheduleUpdate => RouterDecision::Plain(SCHEDULE_UPDATE_GUIDE.to_string()),
        Intent::ScheduleDelete => RouterDecision::Plain(SCHEDULE_DELETE_GUIDE.to_string()),

        Intent::ContractorsList => {
            list_documents(CONTRACTOR_COLLECTION, list_limit(utterance), None)
        }
        Intent::ContractorsDetail => match extract::document_id(utterance) {
            Some(id) => get_document(CONTRACTOR_COLLECTION, &id),
            None => {
                let name = extract::detail_name(utterance.replace("업체", " ").trim());
                if name.is_empty() {
                    RouterDecision::Plain(DETAIL_CLARIFY.to_string())
                } else {
                    RouterDecision::ResolveByName {
                        collection: CONTRACTOR_COLLECTION.to_string(),
                        name,
                        action: NamedAction::Detail,
                    }
                }
            }
        },

        Intent::EmailSendQuote => {
            let Some(email) = extract::email_address(utterance) else {
                return RouterDecision::Plain(EMAIL_CLARIFY.to_string());
            };
            let address = extract::quote_address(utterance, &email);
            if address.is_empty() {
                return RouterDecision::Plain(EMAIL_ADDRESS_CLARIFY.to_string());
            }
            let mut args = Map::new();
            args.insert("email".to_string(), json!(email));
            args.insert("address".to_string(), json!(address));
            args.insert("process_data".to_string(), json!([]));
            call_or_clarify("send_estimate_email", args, EMAIL_CLARIFY)
        }
        Intent::EmailTest => call_or_clarify("test_connection", Map::new(), UNKNOWN_REPLY),
        Intent::EmailInfo => call_or_clarify("get_server_info", Map::new(), UNKNOWN_REPLY),
    }
}

fn list_limit(utterance: &str) -> u64 {
    if utterance.contains("전체") || utterance.contains("모두") || utterance.contains("전부") {
        100
    } else {
        DEFAULT_LIST_LIMIT
    }
}

fn list_documents(collection: &str, limit: u64, search_term: Option<String>) -> RouterDecision {
    let mut args = Map::new();
    args.insert("collection".to_string(), json!(collection));
    args.insert("limit".to_string(), json!(limit));
    call_or_clarify_with_search("firestore_list_documents", args, search_term)
}

fn get_document(collection: &str, id: &str) -> RouterDecision {
    let mut args = Map::new();
    args.insert("collection".to_string(), json!(collection));
    args.insert("id".to_string(), json!(id));
    call_or_clarify("firestore_get_document", args, DETAIL_CLARIFY)
}

fn delete_document(collection: &str, id: &str) -> RouterDecision {
    let mut args = Map::new();
    args.insert("collection".to_string(), json!(collection));
    args.insert("id".to_string(), json!(id));
    call_or_clarify("firestore_delete_document", args, DELETE_CLARIFY)
}

fn query_schedules(filter: Value, order_by: Option<&str>) -> RouterDecision {
    let mut args = Map::new();
    args.insert("collection".to_string(), json!(SCHEDULE_COLLECTION));
    args.insert("where".to_string(), filter);
    if let Some(field) = order_by {
        args.insert("order_by".to_string(), json!(field));
    }
    args.insert("limit".to_string(), json!(100));
    call_or_clarify("firestore_query_collection_group", args, UNKNOWN_REPLY)
}

fn call_or_clarify(
    tool_name: &str,
    args: Map<String, Value>,
    clarify: &str,
) -> RouterDecision {
    match build_invocation(tool_name, args) {
        Ok(invocation) => RouterDecision::Call {
            invocation,
            search_term: None,
        },
        Err(_) => RouterDecision::Plain(clarify.to_string()),
    }
}

fn call_or_clarify_with_search(
    tool_name: &str,
    args: Map<String, Value>,
    search_term: Option<String>,
) -> RouterDecision {
    match build_invocation(tool_name, args) {
        Ok(invocation) => RouterDecision::Call {
            invocation,
            search_term,
        },
        Err(_) => RouterDecision::Plain(UNKNOWN_REPLY.to_string()),
    }
}
