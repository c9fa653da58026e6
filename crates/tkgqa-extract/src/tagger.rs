//! Entity tagging capability.
//!
//! The extractor only needs labelled surface spans. Any NER backend can sit
//! behind [`EntityTagger`]; the crate ships a gazetteer-driven
//! [`RuleBasedTagger`] and, with `llm-ollama`, a model-backed tagger.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpanLabel {
    Person,
    /// Geopolitical entity (country, city, region).
    Gpe,
    Org,
    Other(String),
}

impl SpanLabel {
    /// Map a conventional NER label (`PERSON`, `GPE`, `ORG`, ...) to a span label.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "PERSON" | "PER" => SpanLabel::Person,
            "GPE" | "LOC" | "LOCATION" | "COUNTRY" => SpanLabel::Gpe,
            "ORG" | "ORGANIZATION" | "ORGANISATION" => SpanLabel::Org,
            other => SpanLabel::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedSpan {
    pub text: String,
    pub label: SpanLabel,
}

impl TaggedSpan {
    pub fn new(text: impl Into<String>, label: SpanLabel) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Named-entity tagger used by the [`crate::Extractor`].
pub trait EntityTagger: Send + Sync {
    /// Labelled spans in `text`, in reading order. Must not fail; a backend
    /// that cannot tag returns an empty list.
    fn tag(&self, text: &str) -> Vec<TaggedSpan>;
}

const COUNTRIES: &[&str] = &[
    "Afghanistan", "Albania", "Algeria", "Angola", "Argentina", "Armenia", "Australia",
    "Austria", "Azerbaijan", "Bahrain", "Bangladesh", "Belarus", "Belgium", "Bolivia",
    "Bosnia and Herzegovina", "Brazil", "Bulgaria", "Burundi", "Cambodia", "Cameroon",
    "Canada", "Chad", "Chile", "China", "Colombia", "Croatia", "Cuba", "Cyprus",
    "Czech Republic", "Denmark", "Ecuador", "Egypt", "Eritrea", "Estonia", "Ethiopia",
    "Finland", "France", "Georgia", "Germany", "Ghana", "Greece", "Guatemala", "Haiti",
    "Honduras", "Hungary", "India", "Indonesia", "Iran", "Iraq", "Ireland", "Israel",
    "Italy", "Japan", "Jordan", "Kazakhstan", "Kenya", "Kuwait", "Kyrgyzstan", "Laos",
    "Latvia", "Lebanon", "Libya", "Lithuania", "Malaysia", "Mali", "Mexico", "Moldova",
    "Mongolia", "Morocco", "Mozambique", "Myanmar", "Nepal", "Netherlands", "New Zealand",
    "Nicaragua", "Niger", "Nigeria", "North Korea", "Norway", "Oman", "Pakistan",
    "Palestine", "Panama", "Paraguay", "Peru", "Philippines", "Poland", "Portugal",
    "Qatar", "Romania", "Russia", "Rwanda", "Saudi Arabia", "Senegal", "Serbia",
    "Singapore", "Slovakia", "Somalia", "South Africa", "South Korea", "South Sudan",
    "Spain", "Sri Lanka", "Sudan", "Sweden", "Switzerland", "Syria", "Taiwan",
    "Tajikistan", "Tanzania", "Thailand", "Tunisia", "Turkey", "Uganda", "Ukraine",
    "United Arab Emirates", "United Kingdom", "United States", "Uruguay", "Uzbekistan",
    "Venezuela", "Vietnam", "Yemen", "Zambia", "Zimbabwe",
];

const CITIES: &[&str] = &[
    "Abuja", "Ankara", "Baghdad", "Beijing", "Beirut", "Berlin", "Brussels", "Cairo",
    "Damascus", "Geneva", "Islamabad", "Jerusalem", "Kabul", "Kiev", "Kyiv", "London",
    "Madrid", "Manila", "Minsk", "Moscow", "Nairobi", "New Delhi", "Paris", "Pyongyang",
    "Riyadh", "Rome", "Seoul", "Tehran", "Tokyo", "Tripoli", "Vienna", "Warsaw",
    "Washington",
];

const ORG_KEYWORDS: &[&str] = &[
    "agency", "alliance", "army", "assembly", "association", "bank", "coalition",
    "commission", "committee", "company", "congress", "corporation", "council", "court",
    "federation", "forces", "front", "government", "hamas", "hezbollah", "militia",
    "ministry", "movement", "nations", "nato", "organization", "organisation", "parliament",
    "party", "police", "senate", "taliban", "union", "university",
];

/// Capitalized words that name a position rather than an entity.
const ROLE_WORDS: &[&str] = &[
    "ambassador", "chancellor", "chief", "citizen", "envoy", "governor", "head", "king",
    "leader", "mayor", "member", "minister", "official", "president", "prime", "queen",
    "secretary", "spokesperson", "spokesman",
];

/// Sentence-initial words that are capitalized only by position.
const LEADING_FUNCTION_WORDS: &[&str] = &[
    "a", "after", "an", "are", "at", "before", "between", "can", "could", "did", "do",
    "does", "during", "following", "from", "had", "has", "have", "how", "in", "is", "of",
    "on", "once", "since", "the", "to", "until", "was", "were", "what", "when", "where",
    "which", "who", "whom", "why", "will", "would",
];

const SPAN_PATTERN: &str =
    r"\b[A-Z][A-Za-z'\-]*(?:\s+(?:(?:of|the|and|al|el|bin|de|van|von)\s+)*[A-Z][A-Za-z'\-]*)*";

/// Gazetteer and capitalization heuristics:
/// - known country/city → GPE
/// - any organisation keyword → ORG
/// - any other multi-token span → PERSON
///
/// Single unknown tokens and spans containing a role word are skipped.
pub struct RuleBasedTagger {
    span: Regex,
    places: HashSet<String>,
    org_keywords: HashSet<&'static str>,
    role_words: HashSet<&'static str>,
    function_words: HashSet<&'static str>,
}

impl RuleBasedTagger {
    pub fn new() -> Self {
        Self {
            span: Regex::new(SPAN_PATTERN).expect("span pattern is valid"),
            places: COUNTRIES
                .iter()
                .chain(CITIES)
                .map(|p| p.to_lowercase())
                .collect(),
            org_keywords: ORG_KEYWORDS.iter().copied().collect(),
            role_words: ROLE_WORDS.iter().copied().collect(),
            function_words: LEADING_FUNCTION_WORDS.iter().copied().collect(),
        }
    }

    /// Add extra geopolitical names to the gazetteer.
    pub fn with_places<I, S>(mut self, places: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.places
            .extend(places.into_iter().map(|p| p.as_ref().to_lowercase()));
        self
    }

    fn classify(&self, tokens: &[&str]) -> Option<SpanLabel> {
        let lower: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        if self.places.contains(&lower.join(" ")) {
            return Some(SpanLabel::Gpe);
        }
        if lower.iter().any(|t| self.role_words.contains(t.as_str())) {
            return None;
        }
        if lower.iter().any(|t| self.org_keywords.contains(t.as_str())) {
            return Some(SpanLabel::Org);
        }
        if tokens.len() >= 2 {
            return Some(SpanLabel::Person);
        }
        None
    }
}

impl Default for RuleBasedTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityTagger for RuleBasedTagger {
    fn tag(&self, text: &str) -> Vec<TaggedSpan> {
        let mut out = Vec::new();
        for m in self.span.find_iter(text) {
            let mut tokens: Vec<&str> = m.as_str().split_whitespace().collect();
            let lead = tokens
                .iter()
                .take_while(|t| self.function_words.contains(t.to_lowercase().as_str()))
                .count();
            tokens.drain(..lead);

            if let Some(last) = tokens.last_mut() {
                let token: &str = *last;
                *last = token.strip_suffix("'s").unwrap_or(token);
            }
            if tokens.is_empty() || tokens.iter().any(|t| t.is_empty()) {
                continue;
            }

            if let Some(label) = self.classify(&tokens) {
                out.push(TaggedSpan::new(tokens.join(" "), label));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(text: &str) -> Vec<(String, SpanLabel)> {
        RuleBasedTagger::new()
            .tag(text)
            .into_iter()
            .map(|s| (s.text, s.label))
            .collect()
    }

    #[test]
    fn tags_people_places_and_orgs() {
        assert_eq!(
            tag("Who did Jane Roe visit in Paris after the Security Council vote?"),
            vec![
                ("Jane Roe".to_string(), SpanLabel::Person),
                ("Paris".to_string(), SpanLabel::Gpe),
                ("Security Council".to_string(), SpanLabel::Org),
            ]
        );
    }

    #[test]
    fn strips_leading_question_words_and_possessives() {
        assert_eq!(
            tag("Which country hosted Angela Merkel's visit to United States?"),
            vec![
                ("Angela Merkel".to_string(), SpanLabel::Person),
                ("United States".to_string(), SpanLabel::Gpe),
            ]
        );
    }

    #[test]
    fn skips_roles_and_unknown_single_tokens() {
        assert_eq!(
            tag("Foreign Minister (France) praised Obama"),
            vec![("France".to_string(), SpanLabel::Gpe)]
        );
    }

    #[test]
    fn extra_places_extend_the_gazetteer() {
        let tagger = RuleBasedTagger::new().with_places(["Crimea"]);
        let spans = tagger.tag("What happened in Crimea?");
        assert_eq!(spans, vec![TaggedSpan::new("Crimea", SpanLabel::Gpe)]);
    }

    #[test]
    fn label_mapping() {
        assert_eq!(SpanLabel::from_label("person"), SpanLabel::Person);
        assert_eq!(SpanLabel::from_label("GPE"), SpanLabel::Gpe);
        assert_eq!(SpanLabel::from_label("ORG"), SpanLabel::Org);
        assert_eq!(SpanLabel::from_label("date"), SpanLabel::Other("DATE".into()));
    }
}
