//! Temporal window filter.

use chrono::NaiveDate;
use tracing::debug;

use tkgqa_extract::{DateFormat, DateMention};
use tkgqa_kg::Fact;

pub const DEFAULT_TOLERANCE_DAYS: i64 = 30;

const ISO_FORMAT: &str = "%Y-%m-%d";

/// Keeps facts whose date agrees with at least one mentioned date.
///
/// - `iso` mentions match facts within `tolerance_days` either side.
/// - `month_year` and `year` mentions match by string prefix.
///
/// When nothing matches, the input is returned unchanged (fail-open): a
/// wrong or unsupported date in the question should not empty the result.
#[derive(Debug, Clone, Copy)]
pub struct TemporalFilter {
    tolerance_days: i64,
}

impl TemporalFilter {
    pub fn new(tolerance_days: i64) -> Self {
        Self {
            tolerance_days: tolerance_days.abs(),
        }
    }

    pub fn tolerance_days(&self) -> i64 {
        self.tolerance_days
    }

    pub fn filter(&self, facts: Vec<Fact>, dates: &[DateMention]) -> Vec<Fact> {
        if dates.is_empty() {
            return facts;
        }

        let kept: Vec<Fact> = facts
            .iter()
            .filter(|fact| dates.iter().any(|d| self.matches(&fact.date, d)))
            .cloned()
            .collect();

        debug!(
            input = facts.len(),
            kept = kept.len(),
            fail_open = kept.is_empty(),
            "temporal filter"
        );
        if kept.is_empty() {
            facts
        } else {
            kept
        }
    }

    pub fn matches(&self, fact_date: &str, mention: &DateMention) -> bool {
        if fact_date.is_empty() || mention.date.is_empty() {
            return false;
        }
        match mention.format {
            DateFormat::Iso => {
                let (Ok(fact_day), Ok(target)) = (
                    NaiveDate::parse_from_str(fact_date, ISO_FORMAT),
                    NaiveDate::parse_from_str(&mention.date, ISO_FORMAT),
                ) else {
                    return false;
                };
                (fact_day - target).num_days().abs() <= self.tolerance_days
            }
            DateFormat::MonthYear | DateFormat::Year => fact_date.starts_with(&mention.date),
        }
    }
}

impl Default for TemporalFilter {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_DAYS)
    }
}
