//! Text similarity backends.
//!
//! The reranker only needs vectors for a question and a batch of fact
//! sentences. [`TokenHashOracle`] is deterministic and dependency-free;
//! [`OllamaOracle`] (feature `llm-ollama`) calls a local embedding model.

use thiserror::Error;

pub const DEFAULT_TOKEN_HASH_DIM: usize = 128;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("embedding backend failed: {0}")]
    Backend(String),

    #[error("embedding backend returned {got} vectors for {expected} inputs")]
    BatchMismatch { expected: usize, got: usize },

    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Embeds text for similarity scoring.
pub trait SimilarityOracle: Send + Sync {
    /// One vector per input text, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OracleError>;

    fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError> {
        let mut out = self.embed_batch(&[text.to_string()])?;
        match out.len() {
            1 => Ok(out.remove(0)),
            got => Err(OracleError::BatchMismatch { expected: 1, got }),
        }
    }

    /// Cosine similarity in `[-1, 1]`.
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }

    /// Short backend label for logs.
    fn name(&self) -> &str;
}

/// Cosine similarity of two vectors; 0.0 for a zero vector or mismatched lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na <= 0.0 || nb <= 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0)
}

pub(crate) fn normalize_in_place(v: &mut [f32]) {
    let norm2: f32 = v.iter().map(|x| x * x).sum();
    if norm2 <= 0.0 {
        return;
    }
    let inv = 1.0f32 / norm2.sqrt();
    for x in v.iter_mut() {
        *x *= inv;
    }
}

// ============================================================================
// Token-hash oracle
// ============================================================================

fn fnv1a64(s: &str) -> u64 {
    let mut h: u64 = 14695981039346656037;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(1099511628211);
    }
    h
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Bag-of-tokens hashed into a fixed number of signed buckets.
///
/// Texts sharing tokens get a positive cosine; unrelated texts land near 0.
#[derive(Debug, Clone, Copy)]
pub struct TokenHashOracle {
    dim: usize,
}

impl TokenHashOracle {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for token in tokenize(text) {
            let h = fnv1a64(&token);
            let idx = (h % self.dim as u64) as usize;
            let sign = if (h >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        normalize_in_place(&mut v);
        v
    }
}

impl Default for TokenHashOracle {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_HASH_DIM)
    }
}

impl SimilarityOracle for TokenHashOracle {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OracleError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn name(&self) -> &str {
        "token_hash"
    }
}

// ============================================================================
// Ollama oracle
// ============================================================================

#[cfg(feature = "llm-ollama")]
pub use ollama::OllamaOracle;

#[cfg(feature = "llm-ollama")]
mod ollama {
    use std::time::Duration;

    use serde::Deserialize;
    use tracing::debug;

    use tkgqa_extract::ollama::normalize_ollama_host;

    use super::{normalize_in_place, OracleError, SimilarityOracle};

    /// Embeddings from a local Ollama server.
    ///
    /// Tries the batched `/api/embed` endpoint first and falls back to the
    /// per-item `/api/embeddings` endpoint on older servers.
    #[derive(Debug, Clone)]
    pub struct OllamaOracle {
        host: String,
        model: String,
        timeout: Option<Duration>,
    }

    #[derive(Deserialize)]
    struct EmbedResp {
        embeddings: Vec<Vec<f32>>,
    }

    #[derive(Deserialize)]
    struct EmbeddingsResp {
        embedding: Vec<f32>,
    }

    impl OllamaOracle {
        pub fn new(host: &str, model: impl Into<String>) -> Self {
            Self {
                host: normalize_ollama_host(host),
                model: model.into(),
                timeout: None,
            }
        }

        pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
            self.timeout = timeout;
            self
        }

        fn client(&self) -> Result<reqwest::blocking::Client, OracleError> {
            let mut builder = reqwest::blocking::Client::builder();
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }
            builder
                .build()
                .map_err(|e| OracleError::Backend(format!("failed to build http client: {e}")))
        }

        fn unreachable(url: &str, e: reqwest::Error) -> OracleError {
            OracleError::Backend(format!(
                "ollama unreachable at {url}: {e} (start it with `ollama serve` or point TKGQA_OLLAMA_HOST elsewhere)"
            ))
        }
    }

    impl SimilarityOracle for OllamaOracle {
        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OracleError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let client = self.client()?;

            let url_embed = format!("{}/api/embed", self.host);
            let body = serde_json::json!({
                "model": self.model,
                "input": texts,
                "truncate": true
            });
            let resp = client
                .post(&url_embed)
                .json(&body)
                .send()
                .map_err(|e| Self::unreachable(&url_embed, e))?;

            let mut out = if resp.status().is_success() {
                let parsed: EmbedResp = resp.json().map_err(|e| {
                    OracleError::Backend(format!("ollama /api/embed returned invalid JSON: {e}"))
                })?;
                parsed.embeddings
            } else {
                debug!(status = %resp.status(), "ollama /api/embed unavailable; using /api/embeddings");
                let url = format!("{}/api/embeddings", self.host);
                let mut out = Vec::with_capacity(texts.len());
                for text in texts {
                    let body = serde_json::json!({ "model": self.model, "prompt": text });
                    let resp = client
                        .post(&url)
                        .json(&body)
                        .send()
                        .map_err(|e| Self::unreachable(&url, e))?;
                    if !resp.status().is_success() {
                        let status = resp.status();
                        let text = resp.text().unwrap_or_default();
                        return Err(OracleError::Backend(format!(
                            "ollama http error {status}: {text}"
                        )));
                    }
                    let parsed: EmbeddingsResp = resp.json().map_err(|e| {
                        OracleError::Backend(format!(
                            "ollama /api/embeddings returned invalid JSON: {e}"
                        ))
                    })?;
                    out.push(parsed.embedding);
                }
                out
            };

            if out.len() != texts.len() {
                return Err(OracleError::BatchMismatch {
                    expected: texts.len(),
                    got: out.len(),
                });
            }
            let dim = out.first().map_or(0, Vec::len);
            for v in out.iter_mut() {
                if v.len() != dim {
                    return Err(OracleError::DimensionMismatch {
                        left: dim,
                        right: v.len(),
                    });
                }
                normalize_in_place(v);
            }
            Ok(out)
        }

        fn name(&self) -> &str {
            "ollama"
        }
    }
}
