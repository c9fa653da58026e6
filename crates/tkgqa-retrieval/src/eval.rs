//! Ranking metrics over pipeline output.

use serde::{Deserialize, Serialize};

use tkgqa_kg::Fact;

/// Hit@k and mean reciprocal rank over a set of questions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitMrr {
    pub hit_at_k: f64,
    pub mrr: f64,
    pub hits: usize,
    pub total: usize,
    pub k: usize,
}

/// 1-based rank of the first fact equal to `gold` (quadruple identity).
pub fn gold_rank(ranked: &[Fact], gold: &Fact) -> Option<usize> {
    ranked.iter().position(|f| f == gold).map(|i| i + 1)
}

/// `ranks[i]` is the gold rank for question `i`, `None` when not found.
///
/// A hit is a rank `<= k`. Reciprocal ranks are summed for every found rank,
/// whatever its value. Both are averaged over all questions; an empty input
/// gives zeros.
pub fn compute_hit_mrr(ranks: &[Option<usize>], k: usize) -> HitMrr {
    let total = ranks.len();
    let hits = ranks.iter().flatten().filter(|&&r| r <= k).count();
    let rr_sum: f64 = ranks
        .iter()
        .flatten()
        .filter(|&&r| r > 0)
        .map(|&r| 1.0 / r as f64)
        .sum();

    let (hit_at_k, mrr) = if total == 0 {
        (0.0, 0.0)
    } else {
        (hits as f64 / total as f64, rr_sum / total as f64)
    };
    HitMrr {
        hit_at_k,
        mrr,
        hits,
        total,
        k,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hit_and_mrr_over_mixed_ranks() {
        let m = compute_hit_mrr(&[Some(1), None, Some(3)], 10);
        assert_eq!(m.hits, 2);
        assert_eq!(m.total, 3);
        assert_relative_eq!(m.hit_at_k, 2.0 / 3.0);
        assert_relative_eq!(m.mrr, (1.0 + 1.0 / 3.0) / 3.0);
    }

    #[test]
    fn ranks_beyond_k_count_for_mrr_only() {
        let m = compute_hit_mrr(&[Some(20)], 10);
        assert_eq!(m.hits, 0);
        assert_relative_eq!(m.mrr, 0.05);
    }

    #[test]
    fn empty_input_is_zero() {
        let m = compute_hit_mrr(&[], 10);
        assert_eq!(m.total, 0);
        assert_eq!(m.hit_at_k, 0.0);
        assert_eq!(m.mrr, 0.0);
    }

    #[test]
    fn gold_rank_ignores_scores() {
        let gold = Fact::new("A", "meet", "B", "2014-01-01");
        let mut hit = gold.clone();
        hit.score = Some(0.3);
        let ranked = vec![Fact::new("A", "meet", "C", "2014-01-01"), hit];
        assert_eq!(gold_rank(&ranked, &gold), Some(2));
        assert_eq!(gold_rank(&ranked[..1], &gold), None);
    }
}
