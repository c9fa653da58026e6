//! Temporal signal detection.

use std::fmt;
use std::ops::Range;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Words that introduce an implicit time reference, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    AtTheTime,
    Following,
    After,
    Before,
    During,
    Once,
    When,
}

impl SignalType {
    pub const ALL: [SignalType; 7] = [
        SignalType::AtTheTime,
        SignalType::Following,
        SignalType::After,
        SignalType::Before,
        SignalType::During,
        SignalType::Once,
        SignalType::When,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SignalType::AtTheTime => "at_the_time",
            SignalType::Following => "following",
            SignalType::After => "after",
            SignalType::Before => "before",
            SignalType::During => "during",
            SignalType::Once => "once",
            SignalType::When => "when",
        }
    }

    /// The anchor phrase is capture group 1; it ends right before a comma or
    /// a following who/which/what.
    fn pattern(self) -> &'static str {
        match self {
            SignalType::AtTheTime => {
                r"\b[Aa]t\s+the\s+time\s+(?:when\s+)?(.+?)(?:,|\s+who|\s+which|\s+what)"
            }
            SignalType::Following => {
                r"\b[Ff]ollowing\s+(?:the\s+)?(.+?)(?:,|\s+who|\s+which|\s+what)"
            }
            SignalType::After => r"\b[Aa]fter\s+(?:the\s+)?(.+?)(?:,|\s+who|\s+which|\s+what)",
            SignalType::Before => r"\b[Bb]efore\s+(?:the\s+)?(.+?)(?:,|\s+who|\s+which|\s+what)",
            SignalType::During => r"\b[Dd]uring\s+(?:the\s+)?(.+?)(?:,|\s+who|\s+which|\s+what)",
            SignalType::Once => r"\b[Oo]nce\s+(.+?)(?:,|\s+who|\s+which|\s+what)",
            SignalType::When => r"\b[Ww]hen\s+(.+?)(?:,|\s+who|\s+which|\s+what)",
        }
    }

    /// Explicit replacement for the introducer and its anchor phrase.
    pub fn lead_in(self, date: &str) -> String {
        match self {
            SignalType::After | SignalType::Following | SignalType::Once => format!("After {date}"),
            SignalType::Before => format!("Before {date}"),
            SignalType::When | SignalType::During | SignalType::AtTheTime => format!("On {date}"),
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMatch {
    pub signal: SignalType,
    /// Trimmed anchor phrase; may be empty.
    pub anchor: String,
    /// Byte range from the introducer through the end of the anchor phrase.
    /// The terminating comma or question word is outside the range.
    pub span: Range<usize>,
}

pub struct SignalDetector {
    patterns: Vec<(SignalType, Regex)>,
}

impl SignalDetector {
    pub fn new() -> Self {
        let patterns = SignalType::ALL
            .iter()
            .map(|&signal| {
                let re = Regex::new(signal.pattern()).expect("signal pattern is valid");
                (signal, re)
            })
            .collect();
        Self { patterns }
    }

    /// First signal type (in priority order) whose pattern matches anywhere.
    pub fn detect(&self, question: &str) -> Option<SignalMatch> {
        self.patterns.iter().find_map(|(signal, re)| {
            let cap = re.captures(question)?;
            let whole = cap.get(0)?;
            let anchor = cap.get(1)?;
            Some(SignalMatch {
                signal: *signal,
                anchor: anchor.as_str().trim().to_string(),
                span: whole.start()..anchor.end(),
            })
        })
    }
}

impl Default for SignalDetector {
    fn default() -> Self {
        Self::new()
    }
}
