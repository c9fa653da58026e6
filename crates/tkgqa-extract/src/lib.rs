//! Question preprocessing for temporal KG question answering.
//!
//! ```text
//!   question ──► Extractor ──────────────► entities + dates
//!                  │  role pattern ("Foreign Minister (France)")
//!                  │  EntityTagger (rule-based | model-backed)
//!                  │  date patterns (iso > month_year > year)
//!                  ▼
//!              ImplicitExpander ──► expanded entity names
//!                  │  "Role (Country)" → Country
//!                  │  AffiliationGraph lookups
//! ```
//!
//! Extraction is best-effort and never fails: odd input simply yields fewer
//! mentions.

pub mod expansion;
pub mod extractor;
pub mod ollama;
pub mod tagger;

use serde::{Deserialize, Serialize};

pub use expansion::{ExpansionMode, ImplicitExpander};
pub use extractor::Extractor;
pub use tagger::{EntityTagger, RuleBasedTagger, SpanLabel, TaggedSpan};

#[cfg(feature = "llm-ollama")]
pub use ollama::OllamaTagger;

// ============================================================================
// Core Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// "Role (Country)" position holder.
    #[serde(rename = "ROLE", alias = "ICEWS_ROLE")]
    Role,
    #[serde(rename = "LEADER")]
    Leader,
    #[serde(rename = "COUNTRY")]
    Country,
    #[serde(rename = "ORG")]
    Org,
}

/// An entity mentioned in a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl EntityMention {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            role: None,
            country: None,
        }
    }

    pub fn role(role: impl Into<String>, country: impl Into<String>) -> Self {
        let role = role.into();
        let country = country.into();
        Self {
            name: format!("{role} ({country})"),
            kind: EntityKind::Role,
            role: Some(role),
            country: Some(country),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `YYYY-MM-DD`
    Iso,
    /// `YYYY-MM`
    MonthYear,
    /// `YYYY`
    Year,
}

/// A date mentioned in a question, normalized to a prefix of `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateMention {
    pub date: String,
    pub format: DateFormat,
}

impl DateMention {
    pub fn new(date: impl Into<String>, format: DateFormat) -> Self {
        Self {
            date: date.into(),
            format,
        }
    }
}

/// Output of [`Extractor::extract`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub entities: Vec<EntityMention>,
    pub dates: Vec<DateMention>,
}

impl Extraction {
    pub fn entity_names(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.name.clone()).collect()
    }
}
