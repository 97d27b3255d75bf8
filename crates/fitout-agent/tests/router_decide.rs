//! Router public API: without an LLM, `decide` is deterministic and always
//! lands on exactly one plain reply or one catalog-conforming call.

use fitout_agent::{NamedAction, Router, RouterDecision, descriptor};

#[tokio::test]
async fn decide_is_deterministic_without_an_llm() {
    let router = Router::keyword_only();
    let first = router.decide("주소 목록 보여줘", &[]).await;
    let second = router.decide("주소 목록 보여줘", &[]).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn every_call_decision_names_a_catalog_tool() {
    let router = Router::keyword_only();
    let utterances = [
        "주소 목록 보여줘",
        "전체 주소 목록",
        "1734608505871 상세정보",
        "서울시 강남구 테헤란로 123번지 등록해줘",
        "오늘 일정 알려줘",
        "예정된 일정 보여줘",
        "일정 목록",
        "협력업체 목록",
        "gncloud86@naver.com 주소로 수성 래미안 견적서 보내줘",
    ];
    for utterance in utterances {
        match router.decide(utterance, &[]).await {
            RouterDecision::Call { invocation, .. } => {
                let tool = descriptor(&invocation.tool_name);
                assert!(tool.is_some(), "{utterance} produced an unknown tool");
                let tool = tool.unwrap();
                for arg in tool.args.iter().filter(|arg| arg.required) {
                    assert!(
                        invocation.arguments.contains_key(arg.name),
                        "{utterance} missing required `{}` for {}",
                        arg.name,
                        tool.name
                    );
                }
            }
            RouterDecision::ResolveByName { .. } | RouterDecision::Plain(_) => {
                panic!("{utterance} should have produced a direct call")
            }
        }
    }
}

#[tokio::test]
async fn name_bearing_mutations_resolve_first() {
    let router = Router::keyword_only();
    match router.decide("수성 효성 헤링턴 삭제해줘", &[]).await {
        RouterDecision::ResolveByName {
            collection,
            name,
            action,
        } => {
            assert_eq!(collection, "addressesJson");
            assert_eq!(name, "수성 효성 헤링턴");
            assert_eq!(action, NamedAction::Delete);
        }
        other => panic!("expected name resolution, got {other:?}"),
    }
}

#[tokio::test]
async fn unintelligible_input_is_a_clarification() {
    let router = Router::keyword_only();
    match router.decide("오렌지 주스", &[]).await {
        RouterDecision::Plain(text) => assert!(!text.is_empty()),
        other => panic!("expected plain reply, got {other:?}"),
    }
}
