//! Retrieval over a temporal knowledge graph.
//!
//! ```text
//!   question
//!      │
//!      ▼
//!   Extractor ──► ImplicitExpander ──► FactIndex::retrieve
//!                                           │
//!                                           ▼
//!                                    TemporalFilter (fail-open)
//!                                           │  cap: rerank_input_cap
//!                                           ▼
//!                                    SemanticReranker ──► top-k facts
//!                                       (SimilarityOracle)
//! ```
//!
//! [`Pipeline`] wires the stages together under ablation flags and reports
//! every intermediate list in a [`PipelineResult`].

pub mod config;
pub mod eval;
pub mod oracle;
pub mod pipeline;
pub mod rerank;
pub mod temporal;

use thiserror::Error;

pub use config::{AblationFlags, ConfigError, OracleConfig, PipelineConfig, TaggerConfig};
pub use eval::{compute_hit_mrr, gold_rank, HitMrr};
pub use oracle::{cosine_similarity, OracleError, SimilarityOracle, TokenHashOracle};
pub use pipeline::{Pipeline, PipelineResult, ProcessOptions};
pub use rerank::SemanticReranker;
pub use temporal::{TemporalFilter, DEFAULT_TOLERANCE_DAYS};

#[cfg(feature = "llm-ollama")]
pub use oracle::OllamaOracle;

/// Errors surfaced by [`Pipeline::process`].
///
/// Per-question data problems (no entities, unparseable dates, no hits)
/// never produce an error; only the similarity backend can fail a request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("similarity oracle failed: {0}")]
    Oracle(#[from] OracleError),
}
