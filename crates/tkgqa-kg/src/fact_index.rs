//! FactIndex: entity → fact lookups over a loaded fact store.
//!
//! Every fact is indexed under its head and its tail, twice:
//! - exact string: `entity -> {fact positions}`
//! - lowercased:   `entity.to_lowercase() -> {fact positions}`
//!
//! Retrieval unions both lookups for every requested name. When that finds
//! nothing, a bounded substring scan over the lowercase keys runs instead
//! (`"Obama"` vs `"Barack Obama"`). The scan stops once
//! [`FALLBACK_MAX_KEYS`] distinct keys have contributed, so very common
//! substrings cannot pull in most of the store.
//!
//! The index never changes after construction. Retrieval hands out owned
//! copies of facts; callers are free to write scores onto them.

use std::path::Path;

use ahash::{AHashMap, AHashSet};
use roaring::RoaringBitmap;
use tracing::{debug, info};

use crate::store::load_facts;
use crate::{Fact, KgError};

/// Default maximum number of facts returned by [`FactIndex::retrieve`].
pub const DEFAULT_RETRIEVAL_CAP: usize = 1000;

/// Maximum number of distinct keys the substring fallback may accept.
pub const FALLBACK_MAX_KEYS: usize = 200;

/// Names shorter than this (in chars, after trimming) never trigger the fallback.
pub const FALLBACK_MIN_NAME_CHARS: usize = 4;

/// Uniform score assigned to every retrieved fact.
pub const RETRIEVAL_SCORE: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct FactIndex {
    facts: Vec<Fact>,
    /// `entity -> {fact positions}` (head or tail, exact).
    by_entity: AHashMap<String, RoaringBitmap>,
    /// `lowercased entity -> {fact positions}`.
    by_entity_lc: AHashMap<String, RoaringBitmap>,
    /// Lowercase keys in first-seen order; the fallback scans these.
    keys_lc: Vec<String>,
    cap: usize,
}

impl FactIndex {
    /// Load a fact store from disk and index it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KgError> {
        let path = path.as_ref();
        let facts = load_facts(path)?;
        let index = Self::from_facts(facts)?;
        info!(
            path = %path.display(),
            facts = index.len(),
            entities = index.entity_count(),
            "loaded fact store"
        );
        Ok(index)
    }

    pub fn from_facts(facts: Vec<Fact>) -> Result<Self, KgError> {
        if u32::try_from(facts.len()).is_err() {
            return Err(KgError::TooManyFacts { count: facts.len() });
        }

        let mut by_entity: AHashMap<String, RoaringBitmap> = AHashMap::new();
        let mut by_entity_lc: AHashMap<String, RoaringBitmap> = AHashMap::new();
        let mut keys_lc: Vec<String> = Vec::new();

        for (pos, fact) in (0u32..).zip(facts.iter()) {
            for entity in [&fact.head, &fact.tail] {
                if entity.is_empty() {
                    continue;
                }
                by_entity.entry(entity.clone()).or_default().insert(pos);

                let lc = entity.to_lowercase();
                match by_entity_lc.get_mut(&lc) {
                    Some(bits) => {
                        bits.insert(pos);
                    }
                    None => {
                        keys_lc.push(lc.clone());
                        by_entity_lc.insert(lc, RoaringBitmap::from_iter([pos]));
                    }
                }
            }
        }

        Ok(Self {
            facts,
            by_entity,
            by_entity_lc,
            keys_lc,
            cap: DEFAULT_RETRIEVAL_CAP,
        })
    }

    /// Override the default retrieval cap.
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// The canonical (unscored) facts, in load order.
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Number of distinct exact entity keys.
    pub fn entity_count(&self) -> usize {
        self.by_entity.len()
    }

    /// Whether `name` occurs as a head or tail, ignoring case.
    pub fn contains_entity(&self, name: &str) -> bool {
        self.by_entity.contains_key(name) || self.by_entity_lc.contains_key(&name.to_lowercase())
    }

    /// Retrieve facts mentioning any of `names`, capped at the index default.
    pub fn retrieve<S: AsRef<str>>(&self, names: &[S]) -> Vec<Fact> {
        self.retrieve_capped(names, self.cap)
    }

    /// Retrieve facts mentioning any of `names`, returning at most `cap`.
    ///
    /// Results are ordered by store position and carry `score = 1.0`.
    pub fn retrieve_capped<S: AsRef<str>>(&self, names: &[S], cap: usize) -> Vec<Fact> {
        let mut positions = RoaringBitmap::new();
        for name in names {
            let name = name.as_ref();
            if name.is_empty() {
                continue;
            }
            if let Some(bits) = self.by_entity.get(name) {
                positions |= bits;
            }
            if let Some(bits) = self.by_entity_lc.get(&name.to_lowercase()) {
                positions |= bits;
            }
        }

        let used_fallback = positions.is_empty();
        if used_fallback {
            positions = self.fallback_positions(names);
        }

        let out: Vec<Fact> = positions
            .iter()
            .take(cap)
            .map(|pos| {
                let mut fact = self.facts[pos as usize].clone();
                fact.score = Some(RETRIEVAL_SCORE);
                fact
            })
            .collect();

        debug!(
            names = names.len(),
            matched = positions.len(),
            returned = out.len(),
            used_fallback,
            "fact retrieval"
        );
        out
    }

    fn fallback_positions<S: AsRef<str>>(&self, names: &[S]) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        let mut accepted: AHashSet<&str> = AHashSet::new();

        'names: for name in names {
            let needle = name.as_ref().trim().to_lowercase();
            if needle.chars().count() < FALLBACK_MIN_NAME_CHARS {
                continue;
            }

            for key in &self.keys_lc {
                if !(key.contains(needle.as_str()) || needle.contains(key.as_str())) {
                    continue;
                }
                if let Some(bits) = self.by_entity_lc.get(key) {
                    out |= bits;
                }
                accepted.insert(key.as_str());
                if accepted.len() >= FALLBACK_MAX_KEYS {
                    break 'names;
                }
            }
        }

        out
    }
}
