//! Response validation: a regex heuristic that rejects answers naming
//! companies or years outside the CV.
//!
//! PASS conditions:
//! - every watched company name found in the text resolves to a company in
//!   the work history
//! - every year (1900–2099) found in the text falls inside at least one
//!   role's inclusive year range; a "Present" end date has no upper bound
//!
//! Known limits: fabricated responsibilities or invented relations between
//! real companies pass; coincidental 4-digit numbers ("2048 servers") fail.

use std::collections::{BTreeSet, HashMap, HashSet};

use regex::Regex;
use serde::Serialize;

use crate::models::cv::{is_present, trailing_year, CvRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub unknown_companies: Vec<String>,
    pub out_of_range_years: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct YearRange {
    start: i32,
    /// `None` for an ongoing role.
    end: Option<i32>,
}

impl YearRange {
    fn contains(&self, year: i32) -> bool {
        year >= self.start && self.end.map_or(true, |end| year <= end)
    }
}

#[derive(Debug, Clone)]
pub struct ResponseValidator {
    /// Matches any watched company name on word boundaries.
    company_pattern: Option<Regex>,
    year_pattern: Regex,
    /// Watched name (as written) -> canonical company key, when it has one.
    aliases: HashMap<String, Option<String>>,
    /// Company keys that appear in the work history.
    employers: HashSet<String>,
    ranges: Vec<YearRange>,
}

impl ResponseValidator {
    #[cfg(test)]
    pub fn new(cv: &CvRecord) -> Self {
        Self::with_watchlist(cv, &[])
    }

    /// `watchlist` adds names that are not in the CV but should be caught
    /// if a model mentions them.
    pub fn with_watchlist(cv: &CvRecord, watchlist: &[String]) -> Self {
        let mut aliases: HashMap<String, Option<String>> = HashMap::new();

        for (key, info) in &cv.companies {
            aliases.insert(key.clone(), Some(key.clone()));
            aliases.entry(info.name.clone()).or_insert_with(|| Some(key.clone()));
        }
        for exp in &cv.work_experience {
            aliases.insert(exp.company.clone(), Some(exp.company.clone()));
        }
        for name in watchlist {
            let name = name.trim();
            if !name.is_empty() {
                aliases.entry(name.to_string()).or_insert(None);
            }
        }

        let employers = cv
            .work_experience
            .iter()
            .map(|exp| exp.company.clone())
            .collect();

        let ranges = cv
            .work_experience
            .iter()
            .filter_map(|exp| {
                let start = trailing_year(&exp.start_date)?;
                // `CvRecord::check` guarantees a trailing year unless Present.
                let end = if is_present(&exp.end_date) {
                    None
                } else {
                    Some(trailing_year(&exp.end_date)?)
                };
                Some(YearRange { start, end })
            })
            .collect();

        Self {
            company_pattern: build_company_pattern(aliases.keys()),
            year_pattern: Regex::new(r"\b(?:19|20)\d{2}\b").expect("static year regex"),
            aliases,
            employers,
            ranges,
        }
    }

    pub fn validate(&self, text: &str) -> ValidationOutcome {
        let mut unknown_companies = BTreeSet::new();
        if let Some(pattern) = &self.company_pattern {
            for found in pattern.find_iter(text) {
                let name = found.as_str();
                let known = self
                    .aliases
                    .get(name)
                    .and_then(|canonical| canonical.as_ref())
                    .is_some_and(|key| self.employers.contains(key));
                if !known {
                    unknown_companies.insert(name.to_string());
                }
            }
        }

        let mut out_of_range_years = BTreeSet::new();
        for found in self.year_pattern.find_iter(text) {
            let Ok(year) = found.as_str().parse::<i32>() else {
                continue;
            };
            if !self.ranges.iter().any(|range| range.contains(year)) {
                out_of_range_years.insert(year);
            }
        }

        ValidationOutcome {
            passed: unknown_companies.is_empty() && out_of_range_years.is_empty(),
            unknown_companies: unknown_companies.into_iter().collect(),
            out_of_range_years: out_of_range_years.into_iter().collect(),
        }
    }

    #[cfg(test)]
    pub fn is_valid(&self, text: &str) -> bool {
        self.validate(text).passed
    }
}

/// One alternation over every name, longest first so that
/// "Nebulas Security (Securelink)" wins over "Nebulas Security".
/// `\b` is only added on edges that are word characters; a name ending in
/// ")" would otherwise never match.
fn build_company_pattern<'a>(names: impl Iterator<Item = &'a String>) -> Option<Regex> {
    let mut names: Vec<&String> = names.collect();
    if names.is_empty() {
        return None;
    }
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let alternatives = names
        .iter()
        .map(|name| {
            let starts_word = name.chars().next().is_some_and(is_word_char);
            let ends_word = name.chars().last().is_some_and(is_word_char);
            format!(
                "{}{}{}",
                if starts_word { r"\b" } else { "" },
                regex::escape(name),
                if ends_word { r"\b" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("|");

    Regex::new(&format!("(?:{alternatives})")).ok()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
