//! Fact store loading.
//!
//! Two on-disk shapes are accepted:
//! - `*.json`: a JSON array of `{head, relation, tail, date}` objects
//! - anything else: tab-separated lines, `head \t relation \t tail \t date [\t ...]`
//!
//! TSV lines with fewer than four fields are skipped; extra fields are ignored.

use std::fs;
use std::path::Path;

use crate::{Fact, KgError};

/// Load every fact from `path`, choosing the format by extension.
pub fn load_facts(path: &Path) -> Result<Vec<Fact>, KgError> {
    let text = fs::read_to_string(path).map_err(|source| KgError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if is_json_path(path) {
        parse_json_facts(&text).map_err(|source| KgError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        Ok(parse_tsv_facts(&text))
    }
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

pub fn parse_json_facts(text: &str) -> Result<Vec<Fact>, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn parse_tsv_facts(text: &str) -> Vec<Fact> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let head = fields.next()?;
            let relation = fields.next()?;
            let tail = fields.next()?;
            let date = fields.next()?;
            Some(Fact::new(head, relation, tail, date))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsv_skips_short_lines_and_ignores_extra_columns() {
        let text = "A\tvisit\tB\t2014-01-01\textra\tcols\nshort\tline\n\nC\tmeet\tD\t2015-02-02\n";
        let facts = parse_tsv_facts(text);
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].quad(), ("A", "visit", "B", "2014-01-01"));
        assert_eq!(facts[1].quad(), ("C", "meet", "D", "2015-02-02"));
    }

    #[test]
    fn tsv_keeps_empty_fields() {
        let facts = parse_tsv_facts("\tvisit\tB\t2014-01-01");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].head, "");
    }

    #[test]
    fn json_array_parses() {
        let facts = parse_json_facts(
            r#"[{"head": "A", "relation": "r", "tail": "B", "date": "2014-01-01"}]"#,
        )
        .unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].tail, "B");
    }

    #[test]
    fn json_null_fields_read_as_empty() {
        let facts = parse_json_facts(
            r#"[{"head": null, "relation": "visited", "tail": "Paris", "date": "2014-05-10"},
                {"head": "Jane Roe", "relation": "visited", "tail": "Paris", "date": null}]"#,
        )
        .unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].quad(), ("", "visited", "Paris", "2014-05-10"));
        assert_eq!(facts[1].date, "");

        let index = crate::FactIndex::from_facts(facts).unwrap();
        assert!(!index.contains_entity(""));
        assert_eq!(index.retrieve(&["Paris"]).len(), 2);
        assert_eq!(index.retrieve(&["Jane Roe"]).len(), 1);
    }

    #[test]
    fn json_extension_is_case_insensitive() {
        assert!(is_json_path(Path::new("events.JSON")));
        assert!(!is_json_path(Path::new("events.tsv")));
        assert!(!is_json_path(Path::new("events")));
    }
}
