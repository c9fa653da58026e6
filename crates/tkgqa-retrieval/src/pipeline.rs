//! End-to-end question → ranked facts.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tkgqa_extract::{DateMention, ExpansionMode, Extractor, ImplicitExpander};
use tkgqa_kg::{AffiliationGraph, Fact, FactIndex, DEFAULT_RETRIEVAL_CAP};

use crate::config::{AblationFlags, ConfigError, PipelineConfig, DEFAULT_RERANK_INPUT_CAP};
use crate::rerank::{SemanticReranker, DEFAULT_TOP_K};
use crate::temporal::TemporalFilter;
use crate::PipelineError;

/// Per-request knobs: stage toggles plus the list caps between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    pub flags: AblationFlags,
    pub expansion_mode: ExpansionMode,
    pub retriever_cap: usize,
    pub rerank_input_cap: usize,
    pub encoder_top_k: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            flags: AblationFlags::default(),
            expansion_mode: ExpansionMode::default(),
            retriever_cap: DEFAULT_RETRIEVAL_CAP,
            rerank_input_cap: DEFAULT_RERANK_INPUT_CAP,
            encoder_top_k: DEFAULT_TOP_K,
        }
    }
}

impl From<&PipelineConfig> for ProcessOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            flags: config.flags,
            expansion_mode: config.expansion_mode,
            retriever_cap: config.retriever_cap,
            rerank_input_cap: config.rerank_input_cap,
            encoder_top_k: config.encoder_top_k,
        }
    }
}

/// Everything one `process` call saw, stage by stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub question: String,
    /// Flags the request ran with.
    pub config: AblationFlags,
    pub extracted_entities: Vec<String>,
    pub extracted_dates: Vec<DateMention>,
    pub expanded_entities: Vec<String>,
    /// Expanded names that were not extracted directly.
    pub expansion_added: Vec<String>,
    pub retrieved_candidates: usize,
    pub after_time_filter: usize,
    pub rerank_input_capped: usize,
    pub final_triples: Vec<Fact>,
    pub final_count: usize,
    /// Reserved for external entity linking; always empty.
    pub wikipedia_candidates: Vec<String>,
}

pub struct Pipeline {
    extractor: Extractor,
    expander: ImplicitExpander,
    graph: AffiliationGraph,
    index: Arc<FactIndex>,
    temporal: TemporalFilter,
    reranker: SemanticReranker,
}

impl Pipeline {
    pub fn new(
        extractor: Extractor,
        graph: AffiliationGraph,
        index: Arc<FactIndex>,
        temporal: TemporalFilter,
        reranker: SemanticReranker,
    ) -> Self {
        Self {
            extractor,
            expander: ImplicitExpander::new(),
            graph,
            index,
            temporal,
            reranker,
        }
    }

    /// Load the fact store and affiliation graph named in `config` and build
    /// the configured tagger and oracle.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let facts_path = config
            .facts_path
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("facts_path is required".to_string()))?;

        let index = FactIndex::load(facts_path)?.with_cap(config.retriever_cap);
        let graph = match &config.affiliations_path {
            Some(path) => AffiliationGraph::load(path)?,
            None => AffiliationGraph::default(),
        };
        let extractor = Extractor::new(config.build_tagger()?)
            .with_allowed_role_heads(config.allowed_role_heads.iter().cloned());
        let reranker = SemanticReranker::new(config.build_oracle()?);

        info!(
            facts = index.len(),
            affiliations = graph.len(),
            oracle = reranker.oracle_name(),
            "pipeline ready"
        );
        Ok(Self::new(
            extractor,
            graph,
            Arc::new(index),
            TemporalFilter::new(config.time_tolerance_days),
            reranker,
        ))
    }

    pub fn index(&self) -> &Arc<FactIndex> {
        &self.index
    }

    pub fn process(
        &self,
        question: &str,
        options: &ProcessOptions,
    ) -> Result<PipelineResult, PipelineError> {
        let flags = options.flags;

        let extraction = self.extractor.extract(question);
        let extracted_entities = extraction.entity_names();

        let expanded_entities = if flags.use_implicit {
            self.expander
                .expand(&extraction.entities, &self.graph, options.expansion_mode)
        } else {
            extracted_entities.clone()
        };
        let original: HashSet<&str> = extracted_entities.iter().map(String::as_str).collect();
        let expansion_added: Vec<String> = expanded_entities
            .iter()
            .filter(|name| !original.contains(name.as_str()))
            .cloned()
            .collect();

        let candidates = self
            .index
            .retrieve_capped(&expanded_entities, options.retriever_cap);
        let retrieved_candidates = candidates.len();

        let mut filtered = if flags.use_time_filter && !extraction.dates.is_empty() {
            self.temporal.filter(candidates, &extraction.dates)
        } else {
            candidates
        };
        let after_time_filter = filtered.len();

        filtered.truncate(options.rerank_input_cap);
        let rerank_input_capped = filtered.len();

        let final_triples = if flags.use_reranker && !filtered.is_empty() {
            self.reranker
                .rerank(question, filtered, options.encoder_top_k)?
        } else {
            filtered.truncate(options.encoder_top_k);
            filtered
        };

        debug!(
            entities = extracted_entities.len(),
            expanded = expanded_entities.len(),
            retrieved = retrieved_candidates,
            after_time_filter,
            rerank_input_capped,
            final_count = final_triples.len(),
            "processed question"
        );

        Ok(PipelineResult {
            question: question.to_string(),
            config: flags,
            extracted_entities,
            extracted_dates: extraction.dates,
            expanded_entities,
            expansion_added,
            retrieved_candidates,
            after_time_filter,
            rerank_input_capped,
            final_count: final_triples.len(),
            final_triples,
            wikipedia_candidates: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{OracleError, SimilarityOracle, TokenHashOracle};

    struct FailingOracle;

    impl SimilarityOracle for FailingOracle {
        fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, OracleError> {
            Err(OracleError::Backend("offline".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn facts() -> Vec<Fact> {
        let mut facts: Vec<Fact> = (1..=20)
            .map(|d| Fact::new("France", "Host_a_visit", format!("Guest {d}"), format!("2015-03-{d:02}")))
            .collect();
        facts.push(Fact::new("France", "Sign_formal_agreement", "Germany", "2013-01-01"));
        facts
    }

    fn pipeline(oracle: Arc<dyn SimilarityOracle>) -> Pipeline {
        Pipeline::new(
            Extractor::rule_based(),
            AffiliationGraph::default(),
            Arc::new(FactIndex::from_facts(facts()).unwrap()),
            TemporalFilter::default(),
            SemanticReranker::new(oracle),
        )
    }

    #[test]
    fn role_question_expands_filters_and_caps() {
        let p = pipeline(Arc::new(TokenHashOracle::default()));
        let out = p
            .process(
                "Whom did the Foreign Minister (France) host in March 2015?",
                &ProcessOptions::default(),
            )
            .unwrap();

        assert_eq!(out.extracted_entities, vec!["Foreign Minister (France)"]);
        assert_eq!(out.expansion_added, vec!["France"]);
        assert_eq!(out.retrieved_candidates, 21);
        assert_eq!(out.after_time_filter, 20);
        assert_eq!(out.rerank_input_capped, 20);
        assert_eq!(out.final_count, 10);
        assert!(out.final_triples.iter().all(|f| f.retriever_score == Some(1.0)));
    }

    #[test]
    fn disabled_stages_pass_lists_through() {
        let p = pipeline(Arc::new(FailingOracle));
        let options = ProcessOptions {
            flags: AblationFlags {
                use_implicit: false,
                use_time_filter: false,
                use_reranker: false,
            },
            encoder_top_k: 3,
            ..ProcessOptions::default()
        };
        let out = p.process("What did France do in 2013?", &options).unwrap();

        assert!(out.expansion_added.is_empty());
        assert_eq!(out.retrieved_candidates, 21);
        assert_eq!(out.after_time_filter, 21);
        assert_eq!(out.final_count, 3);
        assert_eq!(out.final_triples[0].tail, "Guest 1");
        assert!(out.final_triples.iter().all(|f| f.retriever_score.is_none()));
    }

    #[test]
    fn oracle_failure_is_the_only_error() {
        let p = pipeline(Arc::new(FailingOracle));
        let err = p
            .process("What did France do?", &ProcessOptions::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Oracle(OracleError::Backend(_))));

        let out = p
            .process("what happened?", &ProcessOptions::default())
            .unwrap();
        assert_eq!(out.final_count, 0);
        assert!(out.extracted_entities.is_empty());
    }

    #[test]
    fn result_serializes_with_stage_fields() {
        let p = pipeline(Arc::new(TokenHashOracle::default()));
        let out = p
            .process("What did France sign in 2013?", &ProcessOptions::default())
            .unwrap();
        let json = serde_json::to_value(&out).unwrap();
        for key in [
            "question",
            "config",
            "extracted_entities",
            "extracted_dates",
            "expanded_entities",
            "expansion_added",
            "retrieved_candidates",
            "after_time_filter",
            "rerank_input_capped",
            "final_triples",
            "final_count",
            "wikipedia_candidates",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["config"]["use_reranker"], true);
        assert_eq!(json["after_time_filter"], 1);
        assert_eq!(json["final_triples"][0]["tail"], "Germany");
    }
}
