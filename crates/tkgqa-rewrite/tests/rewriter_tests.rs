use proptest::prelude::*;
use tkgqa_kg::{Fact, FactIndex};
use tkgqa_rewrite::{QuestionRewriter, SignalType};

fn store() -> FactIndex {
    FactIndex::from_facts(vec![
        Fact::new("Summit", "hosted", "Paris", "2014-05-10"),
        Fact::new("Barack Obama", "Make_a_visit", "Kenya", "2015-07-24"),
        Fact::new("Barack Obama", "Praise_or_endorse", "Kenya", "2015-07-26"),
        Fact::new("Foreign Minister (France)", "Criticize_or_denounce", "Russia", "2014-03-03"),
    ])
    .unwrap()
}

#[test]
fn rewrite_result_serializes_snake_case_signal() {
    let idx = store();
    let r = QuestionRewriter::new(&idx).rewrite("After the summit in Paris, who attended?");
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["signal_type"], "after");
    assert_eq!(json["anchor_timestamp"], "2014-05-10");
    assert_eq!(json["was_rewritten"], true);
}

#[test]
fn trigger_verbs_disambiguate_between_events() {
    let idx = store();
    let rewriter = QuestionRewriter::new(&idx);

    let r = rewriter.rewrite("Once Obama praised Kenya, which country did he visit?");
    assert_eq!(r.signal_type, Some(SignalType::Once));
    assert_eq!(r.anchor_timestamp.as_deref(), Some("2015-07-26"));
    assert_eq!(r.rewritten, "After 2015-07-26, which country did he visit?");

    let r = rewriter.rewrite("Following Obama's trip to Kenya, who did he meet?");
    assert_eq!(r.anchor_timestamp.as_deref(), Some("2015-07-24"));
    assert_eq!(r.rewritten, "After 2015-07-24, who did he meet?");
}

#[test]
fn role_anchor_resolves_through_role_entity() {
    let idx = store();
    let r = QuestionRewriter::new(&idx)
        .rewrite("During the condemnation by the Foreign Minister (France), who responded?");
    assert_eq!(
        r.anchor_entities,
        vec!["Foreign Minister (France)", "France"]
    );
    assert_eq!(r.anchor_timestamp.as_deref(), Some("2014-03-03"));
    assert_eq!(r.rewritten, "On 2014-03-03, who responded?");
}

proptest! {
    #[test]
    fn rewritten_differs_only_when_flagged(q in "[A-Za-z ,?]{0,40}") {
        let idx = store();
        let r = QuestionRewriter::new(&idx).rewrite(&q);
        prop_assert_eq!(&r.original, &q);
        prop_assert_eq!(r.was_rewritten, r.rewritten != q);
        if r.anchor_timestamp.is_none() {
            prop_assert_eq!(&r.rewritten, &q);
        }
    }
}
