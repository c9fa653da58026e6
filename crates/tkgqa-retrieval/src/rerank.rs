//! Semantic reranking of candidate facts.

use std::sync::Arc;

use tracing::debug;

use tkgqa_kg::Fact;

use crate::oracle::{OracleError, SimilarityOracle};

pub const DEFAULT_TOP_K: usize = 10;

/// Orders facts by similarity between the question and each fact sentence
/// ([`Fact::to_text`]).
#[derive(Clone)]
pub struct SemanticReranker {
    oracle: Arc<dyn SimilarityOracle>,
}

impl SemanticReranker {
    pub fn new(oracle: Arc<dyn SimilarityOracle>) -> Self {
        Self { oracle }
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Top `top_k` facts by similarity, highest first; ties keep input order.
    ///
    /// With at most `top_k` facts the input is returned untouched and the
    /// oracle is not called. Otherwise each returned fact carries the new
    /// `score` and its previous score (or 0.0) in `retriever_score`.
    pub fn rerank(
        &self,
        question: &str,
        facts: Vec<Fact>,
        top_k: usize,
    ) -> Result<Vec<Fact>, OracleError> {
        if facts.is_empty() || facts.len() <= top_k {
            return Ok(facts);
        }

        let query = self.oracle.embed(question)?;
        let texts: Vec<String> = facts.iter().map(Fact::to_text).collect();
        let vectors = self.oracle.embed_batch(&texts)?;
        if vectors.len() != facts.len() {
            return Err(OracleError::BatchMismatch {
                expected: facts.len(),
                got: vectors.len(),
            });
        }

        let mut scored: Vec<Fact> = facts
            .into_iter()
            .zip(vectors)
            .map(|(mut fact, v)| {
                fact.retriever_score = Some(fact.score.unwrap_or(0.0));
                fact.score = Some(f64::from(self.oracle.similarity(&query, &v)));
                fact
            })
            .collect();

        // `sort_by` is stable, so equal scores keep retrieval order.
        scored.sort_by(|a, b| {
            let a = a.score.unwrap_or(0.0);
            let b = b.score.unwrap_or(0.0);
            b.total_cmp(&a)
        });
        scored.truncate(top_k);

        debug!(
            candidates = texts.len(),
            kept = scored.len(),
            oracle = self.oracle.name(),
            "semantic rerank"
        );
        Ok(scored)
    }
}

impl std::fmt::Debug for SemanticReranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticReranker")
            .field("oracle", &self.oracle.name())
            .finish()
    }
}
