//! Entity names inside an anchor phrase ("the summit in Paris").

use std::ops::Range;

use regex::Regex;

/// Capitalized words that are never names on their own.
pub const ROLE_STOP: [&str; 7] = [
    "Member",
    "Judiciary",
    "Government",
    "President",
    "Minister",
    "Police",
    "Army",
];

const ROLE_PATTERN: &str = r"([A-Z][a-zA-Z\s]+?)\s*\(([^)]+)\)";
const NAME_PATTERN: &str = r"\b([A-Z][a-z]+(?:\s+(?:[A-Z]\.)?[-']?[A-Za-z]+)*(?:\s+(?:al|el|bin|ibn|van|von|de|da|di|le|la)\s+[A-Z][a-z]+)*)\b";

pub struct AnchorEntityExtractor {
    role: Regex,
    name: Regex,
}

impl AnchorEntityExtractor {
    pub fn new() -> Self {
        Self {
            role: Regex::new(ROLE_PATTERN).expect("role pattern is valid"),
            name: Regex::new(NAME_PATTERN).expect("name pattern is valid"),
        }
    }

    /// Role entities (with their countries) first, then names, then
    /// possessive-stripped variants. Duplicate-free, in discovery order.
    ///
    /// Once a multi-word or hyphenated name has been seen, later single-word
    /// names are ignored; single words seen before it are kept.
    pub fn extract(&self, anchor: &str) -> Vec<String> {
        let mut entities: Vec<String> = Vec::new();
        let mut role_spans: Vec<Range<usize>> = Vec::new();

        for cap in self.role.captures_iter(anchor) {
            if let Some(whole) = cap.get(0) {
                role_spans.push(whole.range());
            }
            let country = &cap[2];
            push_unique(&mut entities, format!("{} ({country})", cap[1].trim()));
            push_unique(&mut entities, country.to_string());
        }

        let mut has_full_name = false;
        for cap in self.name.captures_iter(anchor) {
            let Some(m) = cap.get(1) else { continue };
            let name = m.as_str();
            if ROLE_STOP.contains(&name) {
                continue;
            }
            if role_spans.iter().any(|span| span.contains(&m.start())) {
                continue;
            }
            if name.chars().count() <= 2 {
                continue;
            }

            if name.contains(' ') || name.contains('-') {
                push_unique(&mut entities, name.to_string());
                has_full_name = true;
            } else if !has_full_name {
                push_unique(&mut entities, name.to_string());
            }
        }

        let variants: Vec<String> = entities
            .iter()
            .filter_map(|e| e.strip_suffix("'s").map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
            .collect();
        for variant in variants {
            push_unique(&mut entities, variant);
        }

        entities
    }
}

impl Default for AnchorEntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn push_unique(entities: &mut Vec<String>, name: String) {
    if !entities.contains(&name) {
        entities.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(anchor: &str) -> Vec<String> {
        AnchorEntityExtractor::new().extract(anchor)
    }

    #[test]
    fn single_word_place() {
        assert_eq!(extract("summit in Paris"), vec!["Paris"]);
    }

    #[test]
    fn full_name_suppresses_later_single_words() {
        assert_eq!(extract("Angela Merkel's visit to Paris"), vec!["Angela Merkel"]);
    }

    #[test]
    fn single_words_before_a_full_name_are_kept() {
        assert_eq!(
            extract("Paris's talks with Angela Merkel"),
            vec!["Paris", "Angela Merkel"]
        );
    }

    #[test]
    fn role_spans_yield_role_and_country() {
        assert_eq!(
            extract("talks with the Foreign Minister (France's)"),
            vec!["Foreign Minister (France's)", "France's", "France"]
        );
    }

    #[test]
    fn role_stop_words_and_short_names_are_skipped() {
        assert!(extract("the President's trip").is_empty());
        assert!(extract("talks in Ur").is_empty());
    }

    #[test]
    fn names_run_across_lowercase_words() {
        assert_eq!(extract("Jane Roe visited Paris"), vec!["Jane Roe visited Paris"]);
        assert_eq!(extract("the Saudi-led strike"), vec!["Saudi"]);
    }
}
