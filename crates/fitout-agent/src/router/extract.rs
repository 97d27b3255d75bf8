//! Deterministic argument extraction from Korean/English utterances.

use std::sync::OnceLock;

use chrono::{FixedOffset, Utc};
use regex::Regex;
use serde_json::json;

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn email_regex() -> Option<&'static Regex> {
    EMAIL_RE
        .get_or_init(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").ok())
        .as_ref()
}

/// Leading markers stripped from a register utterance.
const REGISTER_PREFIXES: &[&str] = &["주소명:", "주소명 :", "주소:", "주소 :"];

/// Trailing register verb phrases, longest first.
const REGISTER_VERBS: &[&str] = &[
    "등록해주세요",
    "등록해줘",
    "등록해 줘",
    "등록해",
    "등록",
    "추가해주세요",
    "추가해줘",
    "추가해 줘",
    "추가해",
    "추가",
];

/// Tokens dropped when isolating a detail target name.
const DETAIL_NOISE: &[&str] = &[
    "상세정보",
    "상세 정보",
    "상세",
    "자세히",
    "알려줘",
    "보여줘",
    "조회해줘",
    "조회",
    "정보",
];

/// Tokens dropped when isolating a delete/update target name.
const MUTATE_NOISE: &[&str] = &[
    "삭제해주세요",
    "삭제해줘",
    "삭제해 줘",
    "삭제",
    "지워줘",
    "지워",
    "수정해주세요",
    "수정해줘",
    "수정",
    "변경해줘",
    "변경",
    "주소",
];

/// Tokens dropped around a quote-email address phrase.
const EMAIL_NOISE: &[&str] = &[
    "견적서",
    "견적",
    "보내주세요",
    "보내줘",
    "보내",
    "발송해줘",
    "발송",
    "전송해줘",
    "전송",
    "이메일",
    "메일",
    "주소로",
    "앞으로",
    "으로",
];

/// Tokens dropped when isolating a search term.
const SEARCH_NOISE: &[&str] = &[
    "검색해줘",
    "검색",
    "찾아줘",
    "찾아봐",
    "찾아",
    "조회해줘",
    "조회",
    "주소",
    "일정",
    "목록",
    "관련",
];

/// First all-digits run of at least 10 characters: treated as a document id.
pub(crate) fn document_id(utterance: &str) -> Option<String> {
    utterance
        .split(|c: char| !c.is_ascii_digit())
        .find(|token| token.len() >= 10)
        .map(str::to_string)
}

/// Email address in the utterance, if any.
pub(crate) fn email_address(utterance: &str) -> Option<String> {
    email_regex()?
        .find(utterance)
        .map(|found| found.as_str().to_string())
}

/// Canonical address description for a register request: leading
/// `주소명:`/`주소:` markers and trailing register verbs stripped.
pub(crate) fn register_description(utterance: &str) -> String {
    let mut text = utterance.trim();
    for prefix in REGISTER_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim();
            break;
        }
    }
    let mut changed = true;
    while changed {
        changed = false;
        for verb in REGISTER_VERBS {
            if let Some(rest) = text.strip_suffix(verb) {
                text = rest.trim();
                changed = true;
            }
        }
    }
    text.trim_matches(|c: char| c == ',' || c == '.').trim().to_string()
}

/// Target name for a detail request: id digits and detail verbs removed.
pub(crate) fn detail_name(utterance: &str) -> String {
    strip_noise(utterance, DETAIL_NOISE)
}

/// Target name for a delete/update request.
pub(crate) fn mutate_name(utterance: &str) -> String {
    strip_noise(utterance, MUTATE_NOISE)
}

/// Address phrase for a quote email: the email token and send verbs removed.
pub(crate) fn quote_address(utterance: &str, email: &str) -> String {
    let cleaned = utterance.replace(email, " ");
    strip_noise(&cleaned, EMAIL_NOISE)
}

/// Free-text search term with search verbs and domain nouns removed.
pub(crate) fn search_term(utterance: &str) -> String {
    strip_noise(utterance, SEARCH_NOISE)
}

fn strip_noise(utterance: &str, noise: &[&str]) -> String {
    let mut text = utterance.trim().to_string();
    if let Some(id) = document_id(&text) {
        text = text.replace(&id, " ");
    }
    for token in noise {
        text = text.replace(token, " ");
    }
    text.split_whitespace()
        .map(|token| token.trim_matches(|c: char| c == ',' || c == '.'))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Seoul wall-clock timestamp (UTC+9) in RFC 3339.
pub(crate) fn now_rfc3339() -> String {
    match FixedOffset::east_opt(9 * 3600) {
        Some(seoul) => Utc::now().with_timezone(&seoul).to_rfc3339(),
        None => Utc::now().to_rfc3339(),
    }
}

/// Seoul calendar date, `YYYY-MM-DD`.
pub(crate) fn today() -> String {
    match FixedOffset::east_opt(9 * 3600) {
        Some(seoul) => Utc::now().with_timezone(&seoul).format("%Y-%m-%d").to_string(),
        None => Utc::now().format("%Y-%m-%d").to_string(),
    }
}

/// Structured-attributes skeleton stored alongside a freshly registered
/// address description.
pub(crate) fn datajson_skeleton() -> String {
    let now = now_rfc3339();
    json!({
        "siteNumber": 0,
        "isCompleted": true,
        "createdAt": now,
        "lastModified": now,
    })
    .to_string()
}
