//! Pipeline configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```json
//! {
//!   "facts_path": "data/icews_facts.json",
//!   "affiliations_path": "data/implicit_graph.json",
//!   "flags": { "use_reranker": false },
//!   "oracle": { "kind": "ollama", "model": "nomic-embed-text" }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tkgqa_extract::{EntityTagger, ExpansionMode, RuleBasedTagger};
use tkgqa_kg::{KgError, DEFAULT_RETRIEVAL_CAP};

use crate::oracle::{SimilarityOracle, TokenHashOracle, DEFAULT_TOKEN_HASH_DIM};
use crate::rerank::DEFAULT_TOP_K;
use crate::temporal::DEFAULT_TOLERANCE_DAYS;

pub const DEFAULT_RERANK_INPUT_CAP: usize = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("{0} requires building with the `llm-ollama` feature")]
    FeatureDisabled(&'static str),

    #[error(transparent)]
    Kg(#[from] KgError),
}

/// Stage toggles for ablation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AblationFlags {
    pub use_implicit: bool,
    pub use_time_filter: bool,
    pub use_reranker: bool,
}

impl Default for AblationFlags {
    fn default() -> Self {
        Self {
            use_implicit: true,
            use_time_filter: true,
            use_reranker: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OracleConfig {
    TokenHash {
        #[serde(default = "default_token_hash_dim")]
        dim: usize,
    },
    Ollama {
        /// Falls back to `TKGQA_OLLAMA_HOST` / `OLLAMA_HOST`.
        #[serde(default)]
        host: Option<String>,
        model: String,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

fn default_token_hash_dim() -> usize {
    DEFAULT_TOKEN_HASH_DIM
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig::TokenHash {
            dim: DEFAULT_TOKEN_HASH_DIM,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaggerConfig {
    #[default]
    RuleBased,
    Ollama {
        #[serde(default)]
        host: Option<String>,
        model: String,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub facts_path: Option<PathBuf>,
    pub affiliations_path: Option<PathBuf>,
    pub retriever_cap: usize,
    pub time_tolerance_days: i64,
    pub encoder_top_k: usize,
    pub rerank_input_cap: usize,
    pub flags: AblationFlags,
    pub expansion_mode: ExpansionMode,
    pub oracle: OracleConfig,
    pub tagger: TaggerConfig,
    /// Role heads the extractor accepts; empty accepts all.
    pub allowed_role_heads: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            facts_path: None,
            affiliations_path: None,
            retriever_cap: DEFAULT_RETRIEVAL_CAP,
            time_tolerance_days: DEFAULT_TOLERANCE_DAYS,
            encoder_top_k: DEFAULT_TOP_K,
            rerank_input_cap: DEFAULT_RERANK_INPUT_CAP,
            flags: AblationFlags::default(),
            expansion_mode: ExpansionMode::default(),
            oracle: OracleConfig::default(),
            tagger: TaggerConfig::default(),
            allowed_role_heads: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("retriever_cap", self.retriever_cap),
            ("encoder_top_k", self.encoder_top_k),
            ("rerank_input_cap", self.rerank_input_cap),
        ];
        for (field, value) in nonzero {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{field} must be greater than 0")));
            }
        }
        if self.time_tolerance_days < 0 {
            return Err(ConfigError::Invalid(
                "time_tolerance_days must not be negative".to_string(),
            ));
        }
        match &self.oracle {
            OracleConfig::TokenHash { dim: 0 } => {
                return Err(ConfigError::Invalid("oracle.dim must be greater than 0".to_string()))
            }
            OracleConfig::Ollama { model, .. } if model.trim().is_empty() => {
                return Err(ConfigError::Invalid("oracle.model must not be empty".to_string()))
            }
            _ => {}
        }
        if let TaggerConfig::Ollama { model, .. } = &self.tagger {
            if model.trim().is_empty() {
                return Err(ConfigError::Invalid("tagger.model must not be empty".to_string()));
            }
        }
        Ok(())
    }

    pub fn build_oracle(&self) -> Result<Arc<dyn SimilarityOracle>, ConfigError> {
        match &self.oracle {
            OracleConfig::TokenHash { dim } => Ok(Arc::new(TokenHashOracle::new(*dim))),
            #[cfg(feature = "llm-ollama")]
            OracleConfig::Ollama {
                host,
                model,
                timeout_secs,
            } => {
                let host = resolve_host(host.as_deref());
                Ok(Arc::new(
                    crate::oracle::OllamaOracle::new(&host, model.clone())
                        .with_timeout(timeout_from_secs(*timeout_secs)),
                ))
            }
            #[cfg(not(feature = "llm-ollama"))]
            OracleConfig::Ollama { .. } => Err(ConfigError::FeatureDisabled("ollama oracle")),
        }
    }

    pub fn build_tagger(&self) -> Result<Box<dyn EntityTagger>, ConfigError> {
        match &self.tagger {
            TaggerConfig::RuleBased => Ok(Box::new(RuleBasedTagger::new())),
            #[cfg(feature = "llm-ollama")]
            TaggerConfig::Ollama {
                host,
                model,
                timeout_secs,
            } => {
                let host = resolve_host(host.as_deref());
                Ok(Box::new(
                    tkgqa_extract::OllamaTagger::new(&host, model.clone())
                        .with_timeout(timeout_from_secs(*timeout_secs)),
                ))
            }
            #[cfg(not(feature = "llm-ollama"))]
            TaggerConfig::Ollama { .. } => Err(ConfigError::FeatureDisabled("ollama tagger")),
        }
    }
}

/// Explicit host, else the environment default.
pub fn resolve_host(host: Option<&str>) -> String {
    match host {
        Some(h) if !h.trim().is_empty() => tkgqa_extract::ollama::normalize_ollama_host(h),
        _ => tkgqa_extract::ollama::default_ollama_host(),
    }
}

/// Seconds to an optional HTTP timeout; `0` means no timeout.
pub fn timeout_from_secs(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|s| *s > 0).map(Duration::from_secs)
}
