//! Entity and date extraction from question text.

use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use crate::tagger::{EntityTagger, RuleBasedTagger, SpanLabel};
use crate::{DateFormat, DateMention, EntityKind, EntityMention, Extraction};

/// "<Capitalized words / of> (<Capitalized words>)", e.g. "Head of Government (Nigeria)".
const ROLE_COUNTRY_PATTERN: &str = r"((([A-Z][a-z]+|of)[ /]+)+?)\s*\((([A-Z][a-z]+ ?)+)\)";
const ISO_DATE_PATTERN: &str = r"(\d{4}-\d{2}-\d{2})";
const MONTH_YEAR_PATTERN: &str = r"(?i)(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{4})";
const YEAR_IN_PATTERN: &str = r"in\s+(\d{4})";

fn month_number(month: &str) -> Option<&'static str> {
    Some(match month.to_lowercase().as_str() {
        "january" => "01",
        "february" => "02",
        "march" => "03",
        "april" => "04",
        "may" => "05",
        "june" => "06",
        "july" => "07",
        "august" => "08",
        "september" => "09",
        "october" => "10",
        "november" => "11",
        "december" => "12",
        _ => return None,
    })
}

/// Pattern rules plus a pluggable [`EntityTagger`].
pub struct Extractor {
    tagger: Box<dyn EntityTagger>,
    allowed_role_heads: Option<HashSet<String>>,
    role_country: Regex,
    iso_date: Regex,
    month_year: Regex,
    year_in: Regex,
}

impl Extractor {
    pub fn new(tagger: Box<dyn EntityTagger>) -> Self {
        Self {
            tagger,
            allowed_role_heads: None,
            role_country: Regex::new(ROLE_COUNTRY_PATTERN).expect("role pattern is valid"),
            iso_date: Regex::new(ISO_DATE_PATTERN).expect("iso date pattern is valid"),
            month_year: Regex::new(MONTH_YEAR_PATTERN).expect("month-year pattern is valid"),
            year_in: Regex::new(YEAR_IN_PATTERN).expect("year pattern is valid"),
        }
    }

    /// Extractor backed by the built-in [`RuleBasedTagger`].
    pub fn rule_based() -> Self {
        Self::new(Box::new(RuleBasedTagger::new()))
    }

    /// Only keep role matches whose head (e.g. "Foreign Minister") is listed.
    /// An empty list disables the filter.
    pub fn with_allowed_role_heads<I, S>(mut self, heads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let heads: HashSet<String> = heads.into_iter().map(Into::into).collect();
        self.allowed_role_heads = if heads.is_empty() { None } else { Some(heads) };
        self
    }

    pub fn extract(&self, question: &str) -> Extraction {
        let (mut entities, role_countries) = self.role_entities(question);
        entities.extend(self.tagged_entities(question, &role_countries));
        let entities = dedup_by_name(entities);
        let dates = self.extract_dates(question);

        debug!(
            entities = entities.len(),
            dates = dates.len(),
            "extracted question mentions"
        );
        Extraction { entities, dates }
    }

    /// Role mentions plus the lowercased countries they explain.
    fn role_entities(&self, text: &str) -> (Vec<EntityMention>, HashSet<String>) {
        let mut entities = Vec::new();
        let mut countries = HashSet::new();

        for cap in self.role_country.captures_iter(text) {
            let role = cap[1].trim();
            let country = cap[4].trim();

            if let Some(allowed) = &self.allowed_role_heads {
                if !allowed.contains(role) {
                    continue;
                }
            }

            entities.push(EntityMention::role(role, country));
            countries.insert(country.to_lowercase());
        }

        (entities, countries)
    }

    fn tagged_entities(&self, text: &str, role_countries: &HashSet<String>) -> Vec<EntityMention> {
        self.tagger
            .tag(text)
            .into_iter()
            .filter_map(|span| {
                let kind = match span.label {
                    SpanLabel::Person => EntityKind::Leader,
                    SpanLabel::Gpe => {
                        if role_countries.contains(&span.text.to_lowercase()) {
                            return None;
                        }
                        EntityKind::Country
                    }
                    SpanLabel::Org => EntityKind::Org,
                    SpanLabel::Other(_) => return None,
                };
                Some(EntityMention::new(span.text, kind))
            })
            .collect()
    }

    /// Dates in priority order: iso, then month_year, then year. A literal
    /// already captured by a higher-priority pattern is not added again.
    pub fn extract_dates(&self, text: &str) -> Vec<DateMention> {
        let mut dates = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut push = |date: String, format: DateFormat| {
            if seen.insert(date.clone()) {
                dates.push(DateMention { date, format });
            }
        };

        for cap in self.iso_date.captures_iter(text) {
            push(cap[1].to_string(), DateFormat::Iso);
        }
        for cap in self.month_year.captures_iter(text) {
            if let Some(month) = month_number(&cap[1]) {
                push(format!("{}-{month}", &cap[2]), DateFormat::MonthYear);
            }
        }
        for cap in self.year_in.captures_iter(text) {
            push(cap[1].to_string(), DateFormat::Year);
        }

        dates
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::rule_based()
    }
}

/// Case-insensitive dedup by name; first occurrence wins, empty names dropped.
fn dedup_by_name(entities: Vec<EntityMention>) -> Vec<EntityMention> {
    let mut seen = HashSet::new();
    entities
        .into_iter()
        .filter(|e| {
            let key = e.name.to_lowercase();
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::TaggedSpan;

    struct FixedTagger(Vec<TaggedSpan>);

    impl EntityTagger for FixedTagger {
        fn tag(&self, _text: &str) -> Vec<TaggedSpan> {
            self.0.clone()
        }
    }

    fn extractor(spans: Vec<TaggedSpan>) -> Extractor {
        Extractor::new(Box::new(FixedTagger(spans)))
    }

    #[test]
    fn role_pattern_captures_role_and_country() {
        let ex = extractor(vec![]);
        let out = ex.extract("What did the Foreign Minister (France) criticize in 2015?");
        assert_eq!(out.entities.len(), 1);
        let role = &out.entities[0];
        assert_eq!(role.name, "Foreign Minister (France)");
        assert_eq!(role.kind, EntityKind::Role);
        assert_eq!(role.role.as_deref(), Some("Foreign Minister"));
        assert_eq!(role.country.as_deref(), Some("France"));
    }

    #[test]
    fn role_pattern_accepts_of_tokens() {
        let ex = extractor(vec![]);
        let out = ex.extract("Who did the Head of Government (Nigeria) meet?");
        assert_eq!(out.entities[0].name, "Head of Government (Nigeria)");
    }

    #[test]
    fn gpe_explained_by_role_is_dropped() {
        let ex = extractor(vec![
            TaggedSpan::new("France", SpanLabel::Gpe),
            TaggedSpan::new("Germany", SpanLabel::Gpe),
            TaggedSpan::new("Angela Merkel", SpanLabel::Person),
            TaggedSpan::new("NATO", SpanLabel::Org),
            TaggedSpan::new("2014", SpanLabel::Other("DATE".into())),
        ]);
        let out = ex.extract("Did the Foreign Minister (France) visit Germany?");
        let names: Vec<_> = out.entities.iter().map(|e| (e.name.as_str(), e.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("Foreign Minister (France)", EntityKind::Role),
                ("Germany", EntityKind::Country),
                ("Angela Merkel", EntityKind::Leader),
                ("NATO", EntityKind::Org),
            ]
        );
    }

    #[test]
    fn entities_dedup_case_insensitively() {
        let ex = extractor(vec![
            TaggedSpan::new("Barack Obama", SpanLabel::Person),
            TaggedSpan::new("barack obama", SpanLabel::Person),
            TaggedSpan::new("", SpanLabel::Person),
        ]);
        let out = ex.extract("Barack Obama");
        assert_eq!(out.entities.len(), 1);
        assert_eq!(out.entities[0].name, "Barack Obama");
    }

    #[test]
    fn allowed_role_heads_filter_roles() {
        let ex = extractor(vec![]).with_allowed_role_heads(["Prime Minister"]);
        let out = ex.extract("Foreign Minister (France) met Prime Minister (India)");
        assert_eq!(out.entities.len(), 1);
        assert_eq!(out.entities[0].name, "Prime Minister (India)");
    }

    #[test]
    fn dates_follow_priority_and_dedup() {
        let ex = extractor(vec![]);
        let dates = ex.extract_dates("On 2014-05-10, in March 2015 and in 2016, also in 2016.");
        assert_eq!(
            dates,
            vec![
                DateMention::new("2014-05-10", DateFormat::Iso),
                DateMention::new("2015-03", DateFormat::MonthYear),
                DateMention::new("2016", DateFormat::Year),
            ]
        );
    }

    #[test]
    fn month_names_are_case_insensitive() {
        let ex = extractor(vec![]);
        let dates = ex.extract_dates("in SEPTEMBER 2014");
        assert_eq!(dates, vec![DateMention::new("2014-09", DateFormat::MonthYear)]);
    }

    #[test]
    fn empty_question_yields_nothing() {
        let ex = extractor(vec![]);
        assert_eq!(ex.extract(""), Extraction::default());
    }
}
