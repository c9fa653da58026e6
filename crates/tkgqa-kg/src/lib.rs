//! TKGQA knowledge graph layer.
//!
//! A temporal knowledge graph here is a flat list of dated quadruples
//! `(head, relation, tail, date)`. This crate owns:
//!
//! - the [`Fact`] record and its identity rules,
//! - loading a fact store from JSON or TSV ([`store`]),
//! - the read-only entity index used by retrieval ([`FactIndex`]),
//! - the static entity affiliation graph used for implicit expansion
//!   ([`AffiliationGraph`]).
//!
//! Everything is built once at startup and is immutable afterwards, so the
//! index can be shared across threads behind an `Arc` without locking.

pub mod affiliation;
pub mod fact_index;
pub mod store;

use serde::{Deserialize, Deserializer, Serialize};
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

pub use affiliation::AffiliationGraph;
pub use fact_index::{FactIndex, DEFAULT_RETRIEVAL_CAP, FALLBACK_MAX_KEYS};

// ============================================================================
// Core Types
// ============================================================================

/// A dated fact `(head, relation, tail, date)`.
///
/// Identity is the quadruple. `score` and `retriever_score` are per-request
/// annotations written by retrieval and reranking; they are ignored by
/// `PartialEq` and `Hash`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fact {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub head: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub relation: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tail: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Score assigned before reranking replaced `score`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retriever_score: Option<f64>,
}

impl Fact {
    pub fn new(
        head: impl Into<String>,
        relation: impl Into<String>,
        tail: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            head: head.into(),
            relation: relation.into(),
            tail: tail.into(),
            date: date.into(),
            score: None,
            retriever_score: None,
        }
    }

    pub fn quad(&self) -> (&str, &str, &str, &str) {
        (&self.head, &self.relation, &self.tail, &self.date)
    }

    /// Canonical sentence rendering used for embedding:
    /// `"<head> <relation words> <tail> on <date>"`.
    pub fn to_text(&self) -> String {
        let relation = self.relation.replace('_', " ").to_lowercase();
        format!("{} {} {} on {}", self.head, relation, self.tail, self.date)
    }
}

/// `null` in a store record reads as an empty field, which indexing skips.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.quad() == other.quad()
    }
}

impl Eq for Fact {}

impl Hash for Fact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.quad().hash(state);
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Fatal errors while loading the fact store or the affiliation graph.
#[derive(Debug, thiserror::Error)]
pub enum KgError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {} as JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("fact store holds {count} facts; at most {} can be indexed", u32::MAX)]
    TooManyFacts { count: usize },
}
