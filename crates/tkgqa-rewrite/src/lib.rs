//! Implicit → explicit temporal question rewriting.
//!
//! "After the summit in Paris, who attended?" names its time only through
//! an event. The rewriter finds that event in the fact store and splices its
//! date into the question: "After 2014-05-10, who attended?".
//!
//! Stages, each run once:
//!
//! 1. [`SignalDetector`]: introducer word + anchor phrase
//! 2. [`AnchorEntityExtractor`]: entity names inside the anchor phrase
//! 3. timestamp resolution against a [`tkgqa_kg::FactIndex`]
//! 4. template splice
//!
//! Any stage coming up empty stops the run with `was_rewritten = false`.

pub mod anchor;
pub mod rewriter;
pub mod signal;

use serde::{Deserialize, Serialize};

pub use anchor::{AnchorEntityExtractor, ROLE_STOP};
pub use rewriter::{QuestionRewriter, RewriteStats, MAX_ANCHOR_CANDIDATES};
pub use signal::{SignalDetector, SignalMatch, SignalType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteResult {
    pub original: String,
    /// Equal to `original` unless a rewrite happened.
    pub rewritten: String,
    pub signal_type: Option<SignalType>,
    pub anchor_phrase: Option<String>,
    pub anchor_entities: Vec<String>,
    pub anchor_timestamp: Option<String>,
    pub was_rewritten: bool,
}

impl RewriteResult {
    pub fn unchanged(question: &str) -> Self {
        Self {
            original: question.to_string(),
            rewritten: question.to_string(),
            signal_type: None,
            anchor_phrase: None,
            anchor_entities: Vec::new(),
            anchor_timestamp: None,
            was_rewritten: false,
        }
    }
}
