//! Implicit entity expansion.
//!
//! A question about "Foreign Minister (France)" is usually answerable from
//! facts about France, and a question about a leader often needs facts about
//! the country they are affiliated with. The expander appends those implied
//! names after each original one.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tkgqa_kg::AffiliationGraph;

use crate::EntityMention;

const ROLE_SUFFIX_PATTERN: &str = r"^.+\(([^)]+)\)$";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionMode {
    /// Role-suffix country plus affiliation graph.
    #[default]
    PatternBased,
    /// Affiliation graph only.
    StaticOnly,
}

pub struct ImplicitExpander {
    role_suffix: Regex,
}

impl ImplicitExpander {
    pub fn new() -> Self {
        Self {
            role_suffix: Regex::new(ROLE_SUFFIX_PATTERN).expect("role suffix pattern is valid"),
        }
    }

    pub fn expand(
        &self,
        entities: &[EntityMention],
        graph: &AffiliationGraph,
        mode: ExpansionMode,
    ) -> Vec<String> {
        let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
        self.expand_names(&names, graph, mode)
    }

    /// Names in input order, each followed by the names it implies.
    /// Duplicate-free by exact string; empty names are skipped.
    pub fn expand_names<S: AsRef<str>>(
        &self,
        names: &[S],
        graph: &AffiliationGraph,
        mode: ExpansionMode,
    ) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(names.len());
        let mut seen: HashSet<String> = HashSet::new();
        let mut push = |name: &str| {
            if seen.insert(name.to_string()) {
                out.push(name.to_string());
            }
        };

        for name in names {
            let name = name.as_ref();
            if name.is_empty() {
                continue;
            }
            push(name);

            if mode == ExpansionMode::PatternBased {
                if let Some(cap) = self.role_suffix.captures(name) {
                    push(&cap[1]);
                }
            }

            if let Some(affiliate) = graph.affiliate_of(name) {
                push(affiliate);
            }
        }

        debug!(input = names.len(), expanded = out.len(), ?mode, "implicit expansion");
        out
    }
}

impl Default for ImplicitExpander {
    fn default() -> Self {
        Self::new()
    }
}
