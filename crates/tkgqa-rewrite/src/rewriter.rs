//! Anchor timestamp resolution and the template splice.

use std::collections::BTreeMap;
use std::ops::Range;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tkgqa_kg::{Fact, FactIndex};

use crate::anchor::AnchorEntityExtractor;
use crate::signal::{SignalDetector, SignalType};
use crate::RewriteResult;

/// Only the first retrieved facts are scored.
pub const MAX_ANCHOR_CANDIDATES: usize = 50;

const RELATION_MATCH_POINTS: i64 = 3;

/// Canonical event verb → surface forms that may appear in an anchor phrase.
const SYNONYMS: &[(&str, &[&str])] = &[
    (
        "praise",
        &["praise", "praised", "offer praise", "offered praise", "commend", "laud", "hail"],
    ),
    ("endorse", &["endorse", "endorsed", "back", "support"]),
    ("consult", &["consult", "consulted", "consultation"]),
    (
        "appeal",
        &["appeal", "appealed", "request", "requested", "call for", "urge"],
    ),
    (
        "threaten",
        &["threaten", "threatened", "threat", "warn", "warning"],
    ),
    (
        "reject",
        &["reject", "rejected", "deny", "denied", "refuse", "refused"],
    ),
    ("visit", &["visit", "visited", "travel", "traveled", "trip"]),
    ("meet", &["meet", "met", "meeting", "talk", "talks"]),
    (
        "criticize",
        &["criticize", "criticised", "criticized", "condemn", "condemned"],
    ),
    (
        "negotiate",
        &["negotiate", "negotiated", "negotiations", "bargain"],
    ),
    ("host", &["host", "hosted"]),
];

/// Counters over a batch of rewrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteStats {
    pub total: usize,
    /// Questions with a detected signal.
    pub detected: usize,
    pub rewritten: usize,
    /// Rewrites per signal type.
    pub by_signal: BTreeMap<SignalType, usize>,
}

impl RewriteStats {
    pub fn from_results(results: &[RewriteResult]) -> Self {
        let mut stats = Self {
            total: results.len(),
            ..Self::default()
        };
        for r in results {
            if r.signal_type.is_some() {
                stats.detected += 1;
            }
            if r.was_rewritten {
                stats.rewritten += 1;
                if let Some(signal) = r.signal_type {
                    *stats.by_signal.entry(signal).or_default() += 1;
                }
            }
        }
        stats
    }

    pub fn rewrite_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.rewritten as f64 / self.total as f64
        }
    }
}

/// Rule-based rewriter over a borrowed fact index.
pub struct QuestionRewriter<'a> {
    index: &'a FactIndex,
    detector: SignalDetector,
    anchors: AnchorEntityExtractor,
    /// (trigger, canonical) pairs flattened from [`SYNONYMS`].
    triggers: Vec<(&'static str, &'static str)>,
}

impl<'a> QuestionRewriter<'a> {
    pub fn new(index: &'a FactIndex) -> Self {
        let triggers = SYNONYMS
            .iter()
            .flat_map(|(canon, forms)| forms.iter().map(move |t| (*t, *canon)))
            .collect();
        Self {
            index,
            detector: SignalDetector::new(),
            anchors: AnchorEntityExtractor::new(),
            triggers,
        }
    }

    pub fn rewrite(&self, question: &str) -> RewriteResult {
        let mut result = RewriteResult::unchanged(question);

        let Some(signal) = self.detector.detect(question) else {
            return result;
        };
        if signal.anchor.is_empty() {
            return result;
        }
        result.signal_type = Some(signal.signal);
        result.anchor_phrase = Some(signal.anchor.clone());

        result.anchor_entities = self.anchors.extract(&signal.anchor);
        if result.anchor_entities.is_empty() {
            debug!(signal = %signal.signal, anchor = %signal.anchor, "no anchor entities");
            return result;
        }

        let Some(timestamp) = self.resolve_timestamp(&result.anchor_entities, &signal.anchor)
        else {
            debug!(signal = %signal.signal, anchor = %signal.anchor, "anchor timestamp unresolved");
            return result;
        };

        let rewritten = splice_lead_in(question, signal.span, &signal.signal.lead_in(&timestamp));
        result.was_rewritten = rewritten != question;
        result.rewritten = rewritten;
        result.anchor_timestamp = Some(timestamp);
        result
    }

    /// Rewrite a batch in parallel; output order follows input order.
    pub fn rewrite_all<S>(&self, questions: &[S]) -> (Vec<RewriteResult>, RewriteStats)
    where
        S: AsRef<str> + Sync,
    {
        let results: Vec<RewriteResult> = questions
            .par_iter()
            .map(|q| self.rewrite(q.as_ref()))
            .collect();
        let stats = RewriteStats::from_results(&results);
        debug!(
            total = stats.total,
            detected = stats.detected,
            rewritten = stats.rewritten,
            "batch rewrite"
        );
        (results, stats)
    }

    /// Date of the best-scoring candidate fact, if its score is positive.
    pub fn resolve_timestamp(&self, entities: &[String], anchor: &str) -> Option<String> {
        let candidates = self.index.retrieve(entities);
        let ctx = anchor.to_lowercase();
        let entities_lc: Vec<String> = entities.iter().map(|e| e.to_lowercase()).collect();

        let mut best: Option<&Fact> = None;
        let mut best_score: i64 = -1;
        for fact in candidates.iter().take(MAX_ANCHOR_CANDIDATES) {
            let score = self.score_fact(fact, &ctx, &entities_lc);
            if score > best_score {
                best_score = score;
                best = Some(fact);
            }
        }

        let best = best.filter(|_| best_score > 0)?;
        debug!(
            score = best_score,
            head = %best.head,
            relation = %best.relation,
            date = %best.date,
            "anchor event"
        );
        Some(best.date.clone()).filter(|d| !d.is_empty())
    }

    fn score_fact(&self, fact: &Fact, ctx: &str, entities_lc: &[String]) -> i64 {
        let relation = fact.relation.to_lowercase();
        let head = fact.head.to_lowercase();
        let tail = fact.tail.to_lowercase();

        let mut score = 0;
        for (trigger, canon) in &self.triggers {
            if ctx.contains(trigger) && (relation.contains(canon) || relation.contains(trigger)) {
                score += RELATION_MATCH_POINTS;
            }
        }
        for entity in entities_lc {
            if head.contains(entity.as_str()) {
                score += 1;
            }
            if tail.contains(entity.as_str()) {
                score += 1;
            }
        }
        score
    }
}

/// Replace `span` with `lead_in`, keeping the text around it readable.
fn splice_lead_in(question: &str, span: Range<usize>, lead_in: &str) -> String {
    let prefix = &question[..span.start];
    let suffix = &question[span.end..];

    let mut replacement = lead_in.to_string();
    let rest = suffix.trim_start();
    if !suffix.is_empty()
        && !suffix.starts_with(',')
        && ["who", "which", "what"].iter().any(|w| rest.starts_with(w))
    {
        replacement.push(',');
    }
    if !suffix.is_empty() && !suffix.starts_with(|c: char| matches!(c, ' ' | ',' | '?' | '.')) {
        replacement.push(' ');
    }

    format!("{prefix}{replacement}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(facts: Vec<Fact>) -> FactIndex {
        FactIndex::from_facts(facts).unwrap()
    }

    #[test]
    fn paris_summit_is_rewritten() {
        let idx = index(vec![Fact::new("Summit", "hosted", "Paris", "2014-05-10")]);
        let r = QuestionRewriter::new(&idx).rewrite("After the summit in Paris, who attended?");

        assert_eq!(r.rewritten, "After 2014-05-10, who attended?");
        assert!(r.was_rewritten);
        assert_eq!(r.signal_type, Some(SignalType::After));
        assert_eq!(r.anchor_phrase.as_deref(), Some("summit in Paris"));
        assert_eq!(r.anchor_entities, vec!["Paris"]);
        assert_eq!(r.anchor_timestamp.as_deref(), Some("2014-05-10"));
    }

    #[test]
    fn zero_score_leaves_question_alone() {
        // Reached only through the substring fallback; nothing in the fact
        // mentions "paris region" or a trigger verb.
        let idx = index(vec![Fact::new("Paris", "make_statement", "Berlin", "2014-05-10")]);
        let q = "After the summit in Paris Region, who attended?";
        let r = QuestionRewriter::new(&idx).rewrite(q);

        assert_eq!(r.anchor_entities, vec!["Paris Region"]);
        assert_eq!(r.anchor_timestamp, None);
        assert!(!r.was_rewritten);
        assert_eq!(r.rewritten, q);
        assert_eq!(r.signal_type, Some(SignalType::After));
    }

    #[test]
    fn relation_triggers_pick_the_event() {
        let idx = index(vec![
            Fact::new("Jane Roe", "make_statement", "Paris", "2014-01-01"),
            Fact::new("Jane Roe", "Make_a_visit", "Paris", "2014-05-10"),
        ]);
        let r = QuestionRewriter::new(&idx)
            .rewrite("When Jane Roe visited Paris who praised her?");
        assert_eq!(r.anchor_timestamp.as_deref(), Some("2014-05-10"));
        assert_eq!(r.rewritten, "On 2014-05-10, who praised her?");
    }

    #[test]
    fn first_best_fact_wins_ties() {
        let idx = index(vec![
            Fact::new("Kenya", "sign_agreement", "Uganda", "2013-02-02"),
            Fact::new("Kenya", "sign_agreement", "Uganda", "2013-09-09"),
        ]);
        let r = QuestionRewriter::new(&idx).rewrite("Before the deal with Kenya, what happened?");
        assert_eq!(r.rewritten, "Before 2013-02-02, what happened?");
    }

    #[test]
    fn no_signal_or_entities_is_unchanged() {
        let idx = index(vec![Fact::new("Summit", "hosted", "Paris", "2014-05-10")]);
        let rewriter = QuestionRewriter::new(&idx);

        let r = rewriter.rewrite("Who attended the summit?");
        assert_eq!(r, RewriteResult::unchanged("Who attended the summit?"));

        let r = rewriter.rewrite("After the summit, who attended?");
        assert_eq!(r.signal_type, Some(SignalType::After));
        assert!(r.anchor_entities.is_empty());
        assert!(!r.was_rewritten);
    }

    #[test]
    fn splice_adds_comma_and_space() {
        assert_eq!(
            splice_lead_in("When X who won?", 0..6, "On 2014-01-01"),
            "On 2014-01-01, who won?"
        );
        assert_eq!(
            splice_lead_in("Once Xthen?", 0..6, "After 2014-01-01"),
            "After 2014-01-01 then?"
        );
        assert_eq!(splice_lead_in("Once X", 0..6, "After 2014-01-01"), "After 2014-01-01");
    }

    #[test]
    fn batch_stats_count_by_signal() {
        let idx = index(vec![Fact::new("Summit", "hosted", "Paris", "2014-05-10")]);
        let rewriter = QuestionRewriter::new(&idx);
        let (results, stats) = rewriter.rewrite_all(&[
            "After the summit in Paris, who attended?",
            "Who attended?",
            "During the summit in Paris, who spoke?",
            "Before the summit, who arrived?",
        ]);

        assert_eq!(results.len(), 4);
        assert_eq!(results[1].original, "Who attended?");
        assert_eq!(stats.total, 4);
        assert_eq!(stats.detected, 3);
        assert_eq!(stats.rewritten, 2);
        assert_eq!(stats.by_signal.get(&SignalType::After), Some(&1));
        assert_eq!(stats.by_signal.get(&SignalType::During), Some(&1));
        assert!((stats.rewrite_rate() - 0.5).abs() < 1e-12);
    }
}
