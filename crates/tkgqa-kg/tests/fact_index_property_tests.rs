use proptest::prelude::*;
use tkgqa_kg::{Fact, FactIndex};

const NAMES: &[&str] = &["John Doe", "JOHN DOE", "john doe", "Jane Roe", "Paris", "paris"];
const RELATIONS: &[&str] = &["visit", "meet", "host"];
const DATES: &[&str] = &["2014-01-01", "2015-06-30"];

fn fact_strategy() -> impl Strategy<Value = Fact> {
    (
        prop::sample::select(NAMES),
        prop::sample::select(RELATIONS),
        prop::sample::select(NAMES),
        prop::sample::select(DATES),
    )
        .prop_map(|(h, r, t, d)| Fact::new(h, r, t, d))
}

proptest! {
    #[test]
    fn retrieve_is_case_insensitive_superset(
        facts in prop::collection::vec(fact_strategy(), 0..40),
        query in prop::sample::select(NAMES),
    ) {
        let index = FactIndex::from_facts(facts.clone()).unwrap();
        let hits = index.retrieve(&[query]);

        let q = query.to_lowercase();
        for fact in &facts {
            if fact.head.to_lowercase() == q || fact.tail.to_lowercase() == q {
                prop_assert!(hits.contains(fact), "missing {:?}", fact);
            }
        }
        prop_assert!(hits.iter().all(|f| f.score == Some(1.0)));
    }

    #[test]
    fn retrieve_never_exceeds_cap(
        facts in prop::collection::vec(fact_strategy(), 0..40),
        cap in 0usize..10,
    ) {
        let index = FactIndex::from_facts(facts).unwrap();
        let hits = index.retrieve_capped(&["john doe", "paris"], cap);
        prop_assert!(hits.len() <= cap);
    }
}
