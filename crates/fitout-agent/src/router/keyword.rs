//! Deterministic keyword fallback: lexicon scoring with priority overrides.
//!
//! Runs when the LLM is unavailable or returned a malformed tool call. Score
//! per intent = sum of character lengths of lexicon tokens found in the
//! lowercased utterance; ties break by lexicon declaration order; score 0 is
//! `Unknown`.

use super::extract;

/// Closed intent set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Intent {
    Greet,
    Help,
    Capabilities,
    AddressRegister,
    AddressDelete,
    AddressUpdate,
    AddressSearch,
    AddressDetail,
    AddressList,
    ScheduleToday,
    ScheduleUpcoming,
    ScheduleRegister,
    ScheduleDelete,
    ScheduleUpdate,
    ScheduleSearch,
    ScheduleReport,
    ScheduleList,
    ContractorsDetail,
    ContractorsList,
    EmailSendQuote,
    EmailTest,
    EmailInfo,
    Unknown,
}

impl Intent {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Greet => "greet",
            Self::Help => "help",
            Self::Capabilities => "capability_listing",
            Self::AddressRegister => "address.register",
            Self::AddressDelete => "address.delete",
            Self::AddressUpdate => "address.update",
            Self::AddressSearch => "address.search",
            Self::AddressDetail => "address.detail",
            Self::AddressList => "address.list",
            Self::ScheduleToday => "schedule.today",
            Self::ScheduleUpcoming => "schedule.upcoming",
            Self::ScheduleRegister => "schedule.register",
            Self::ScheduleDelete => "schedule.delete",
            Self::ScheduleUpdate => "schedule.update",
            Self::ScheduleSearch => "schedule.search",
            Self::ScheduleReport => "schedule.report",
            Self::ScheduleList => "schedule.list",
            Self::ContractorsDetail => "contractors.detail",
            Self::ContractorsList => "contractors.list",
            Self::EmailSendQuote => "email.send_quote",
            Self::EmailTest => "email.test",
            Self::EmailInfo => "email.info",
            Self::Unknown => "unknown",
        }
    }

    fn is_address(self) -> bool {
        matches!(
            self,
            Self::AddressRegister
                | Self::AddressDelete
                | Self::AddressUpdate
                | Self::AddressSearch
                | Self::AddressDetail
                | Self::AddressList
        )
    }

    fn is_schedule(self) -> bool {
        matches!(
            self,
            Self::ScheduleToday
                | Self::ScheduleUpcoming
                | Self::ScheduleRegister
                | Self::ScheduleDelete
                | Self::ScheduleUpdate
                | Self::ScheduleSearch
                | Self::ScheduleReport
                | Self::ScheduleList
        )
    }
}

/// Lexicon in declaration order (the tie-break order).
const LEXICON: &[(Intent, &[&str])] = &[
    (Intent::Greet, &["안녕", "반가", "하이", "hello", "hi"]),
    (Intent::Help, &["도움말", "도와줘", "사용법", "help"]),
    (Intent::Capabilities, &["뭘 할 수", "무엇을 할 수", "할 수 있", "할수있", "기능"]),
    (Intent::AddressRegister, &["주소 등록", "주소명", "등록해줘", "등록해", "추가해줘", "추가해"]),
    (Intent::AddressDelete, &["주소 삭제", "삭제해줘", "삭제", "지워줘", "지워"]),
    (Intent::AddressUpdate, &["주소 수정", "수정해줘", "수정", "변경해줘", "변경"]),
    (Intent::AddressSearch, &["주소 검색", "검색", "찾아줘", "찾아"]),
    (Intent::AddressDetail, &["상세정보", "상세", "자세히"]),
    (Intent::AddressList, &["주소 목록", "주소 리스트", "주소 전체", "목록", "리스트"]),
    (Intent::ScheduleToday, &["오늘 일정", "오늘의 일정", "오늘 스케줄", "오늘"]),
    (Intent::ScheduleUpcoming, &["예정된 일정", "다가오는 일정", "예정", "다가오는"]),
    (Intent::ScheduleRegister, &["일정 등록", "일정 추가", "스케줄 등록"]),
    (Intent::ScheduleDelete, &["일정 삭제", "스케줄 삭제"]),
    (Intent::ScheduleUpdate, &["일정 수정", "일정 변경", "스케줄 수정"]),
    (Intent::ScheduleSearch, &["일정 검색", "일정 찾아"]),
    (Intent::ScheduleReport, &["일정 보고", "일정 리포트", "일정 현황", "주간 보고"]),
    (Intent::ScheduleList, &["일정 목록", "일정 리스트", "일정", "스케줄"]),
    (Intent::ContractorsDetail, &["업체 상세", "협력업체 상세"]),
    (Intent::ContractorsList, &["협력업체", "업체 목록", "업체", "contractors", "contractor"]),
    (Intent::EmailSendQuote, &["견적서", "견적", "이메일 보내", "메일 보내", "보내줘"]),
    (Intent::EmailTest, &["이메일 테스트", "메일 테스트", "연결 테스트", "연결 확인"]),
    (Intent::EmailInfo, &["이메일 서버 정보", "서버 정보", "메일 서버"]),
];

/// Multi-character city/place nouns used by the address override.
const PLACE_NOUNS: &[&str] = &[
    "서울", "부산", "대구", "인천", "광주", "대전", "울산", "세종", "수원", "창원",
    "아파트", "빌라", "오피스텔", "번지", "동 ", "단지", "캐슬", "래미안", "푸르지오",
    "헤링턴", "자이", "힐스테이트",
];

/// Address verb tokens in the fixed priority order: register > delete >
/// update > search; no verb hit falls through to list.
const ADDRESS_VERBS: &[(Intent, &[&str])] = &[
    (Intent::AddressRegister, &["등록", "추가"]),
    (Intent::AddressDelete, &["삭제", "지워"]),
    (Intent::AddressUpdate, &["수정", "변경"]),
    (Intent::AddressSearch, &["검색", "찾아"]),
];

fn score(utterance: &str, tokens: &[&str]) -> usize {
    tokens
        .iter()
        .filter(|token| utterance.contains(&token.to_lowercase()))
        .map(|token| token.chars().count())
        .sum()
}

/// Pick the intent for one utterance.
pub(crate) fn classify(utterance: &str) -> Intent {
    let lowered = utterance.to_lowercase();

    let mut best = Intent::Unknown;
    let mut best_score = 0usize;
    for (intent, tokens) in LEXICON {
        let intent_score = score(&lowered, tokens);
        if intent_score > best_score {
            best = *intent;
            best_score = intent_score;
        }
    }
    if best_score == 0 {
        return Intent::Unknown;
    }

    // An explicit email address plus a send-ish phrasing always means the
    // quote email, even when a place noun is present.
    if extract::email_address(utterance).is_some()
        && score(&lowered, &["견적서", "견적", "보내", "전송", "발송"]) > 0
    {
        return Intent::EmailSendQuote;
    }

    // Generic verbs (등록/수정/…) also score for address intents; an explicit
    // `일정`/`스케줄` keeps the utterance in the schedule domain.
    if (lowered.contains("일정") || lowered.contains("스케줄")) && best.is_address() {
        best = best_schedule_intent(&lowered);
    }

    // `주소` plus a place noun prefers an address intent.
    if lowered.contains("주소")
        && PLACE_NOUNS.iter().any(|noun| lowered.contains(&noun.to_lowercase()))
        && !best.is_address()
    {
        best = best_address_intent(&lowered);
    }

    // Among address intents, the verb decides: register > delete > update > search > list.
    if best.is_address() {
        best = address_verb_override(&lowered, best);
    }
    best
}

fn best_address_intent(lowered: &str) -> Intent {
    let mut best = Intent::AddressList;
    let mut best_score = 0usize;
    for (intent, tokens) in LEXICON {
        if !intent.is_address() {
            continue;
        }
        let intent_score = score(lowered, tokens);
        if intent_score > best_score {
            best = *intent;
            best_score = intent_score;
        }
    }
    best
}

fn best_schedule_intent(lowered: &str) -> Intent {
    let mut best = Intent::ScheduleList;
    let mut best_score = 0usize;
    for (intent, tokens) in LEXICON {
        if !intent.is_schedule() {
            continue;
        }
        let intent_score = score(lowered, tokens);
        if intent_score > best_score {
            best = *intent;
            best_score = intent_score;
        }
    }
    best
}

fn address_verb_override(lowered: &str, fallback: Intent) -> Intent {
    for (intent, verbs) in ADDRESS_VERBS {
        if verbs.iter().any(|verb| lowered.contains(verb)) {
            return *intent;
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_and_list_and_detail() {
        assert_eq!(classify("안녕 반가워"), Intent::Greet);
        assert_eq!(classify("주소 목록 보여줘"), Intent::AddressList);
        assert_eq!(classify("1734608505871 상세정보"), Intent::AddressDetail);
    }

    #[test]
    fn register_wins_over_list_when_verb_present() {
        assert_eq!(
            classify("서울시 강남구 테헤란로 123번지 등록해줘"),
            Intent::AddressRegister
        );
        assert_eq!(classify("주소 목록에서 테헤란로 삭제해줘"), Intent::AddressDelete);
    }

    #[test]
    fn email_with_address_noun_still_routes_to_quote() {
        assert_eq!(
            classify("gncloud86@naver.com 주소로 수성 래미안 견적서 보내줘"),
            Intent::EmailSendQuote
        );
    }

    #[test]
    fn address_with_place_noun_prefers_address_intents() {
        assert_eq!(classify("주소 중에 서울 아파트 목록"), Intent::AddressList);
    }

    #[test]
    fn schedule_intents() {
        assert_eq!(classify("오늘 일정 알려줘"), Intent::ScheduleToday);
        assert_eq!(classify("예정된 일정 보여줘"), Intent::ScheduleUpcoming);
        assert_eq!(classify("일정 목록"), Intent::ScheduleList);
        assert_eq!(classify("일정 수정하고 싶어"), Intent::ScheduleUpdate);
        assert_eq!(classify("일정 등록해줘"), Intent::ScheduleRegister);
    }

    #[test]
    fn zero_score_is_unknown() {
        assert_eq!(classify("오렌지 주스"), Intent::Unknown);
    }

    #[test]
    fn contractors() {
        assert_eq!(classify("협력업체 목록 보여줘"), Intent::ContractorsList);
    }
}
