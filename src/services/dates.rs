// src/services/dates.rs

//! Publish date resolution.
//!
//! Each candidate runs through an ordered list of strategies; the first one
//! that yields a date decides the confidence tag. When every strategy fails
//! the policy decides between assuming `today` and leaving the date unknown.
//! `today` is always passed in, so resolution never reads the clock.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDate};
use regex::Regex;

use crate::models::{ArticleCandidate, DateConfidence, Policy, ResolvedArticle};
use crate::utils::normalize_whitespace;
use crate::utils::url::extract_url_date;

/// Human-readable formats tried in order; the first match wins.
///
/// Month names match full or abbreviated, case-insensitively.
pub const DATE_FORMATS: &[&str] = &[
    "%d %B %Y",  // 5 Jun 2024
    "%B %d, %Y", // June 5, 2024
    "%B %d %Y",  // June 5 2024
    "%d %B, %Y", // 5 June, 2024
    "%Y-%m-%d",  // 2024-06-05
    "%d/%m/%Y",  // 05/06/2024
    "%m/%d/%Y",  // 06/25/2024
    "%d.%m.%Y",  // 05.06.2024
];

/// One step of the resolution chain.
#[derive(Clone, Copy)]
pub struct DateStrategy {
    /// Tag given to dates this strategy produces
    pub confidence: DateConfidence,
    /// Attempt to derive a date
    pub apply: fn(&ArticleCandidate, &Policy) -> Option<NaiveDate>,
}

/// The default chain: date element, then URL.
pub const DEFAULT_STRATEGIES: &[DateStrategy] = &[
    DateStrategy {
        confidence: DateConfidence::ConfirmedElement,
        apply: from_date_element,
    },
    DateStrategy {
        confidence: DateConfidence::ConfirmedUrl,
        apply: from_url,
    },
];

/// Resolves candidates against a fixed policy.
pub struct DateResolver<'a> {
    policy: &'a Policy,
    strategies: &'a [DateStrategy],
}

impl<'a> DateResolver<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self::with_strategies(policy, DEFAULT_STRATEGIES)
    }

    pub fn with_strategies(policy: &'a Policy, strategies: &'a [DateStrategy]) -> Self {
        Self { policy, strategies }
    }

    /// Resolve one candidate.
    pub fn resolve(&self, candidate: ArticleCandidate, today: NaiveDate) -> ResolvedArticle {
        for strategy in self.strategies {
            if let Some(date) = (strategy.apply)(&candidate, self.policy) {
                return ResolvedArticle {
                    candidate,
                    date: Some(date),
                    confidence: strategy.confidence,
                };
            }
        }

        if self.policy.never_assume_today {
            ResolvedArticle {
                candidate,
                date: None,
                confidence: DateConfidence::Unknown,
            }
        } else {
            ResolvedArticle {
                candidate,
                date: Some(today),
                confidence: DateConfidence::AssumedToday,
            }
        }
    }

    /// Resolve a whole page, keeping document order.
    pub fn resolve_all(
        &self,
        candidates: Vec<ArticleCandidate>,
        today: NaiveDate,
    ) -> Vec<ResolvedArticle> {
        candidates
            .into_iter()
            .map(|candidate| self.resolve(candidate, today))
            .collect()
    }
}

/// Strategy: parse the date element's text.
pub fn from_date_element(candidate: &ArticleCandidate, _policy: &Policy) -> Option<NaiveDate> {
    let raw = candidate.raw_date.as_deref()?;
    let parsed = parse_date_text(raw);
    if parsed.is_none() {
        log::debug!("Unrecognized date '{}' for {}", raw, candidate.url);
    }
    parsed
}

/// Strategy: a `/YYYY/MM/DD/` fragment in the URL, when enabled.
pub fn from_url(candidate: &ArticleCandidate, policy: &Policy) -> Option<NaiveDate> {
    if !policy.extract_date_from_url {
        return None;
    }
    candidate
        .url_date
        .or_else(|| extract_url_date(&candidate.url))
}

fn ordinal_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("static ordinal pattern"))
}

fn weekday_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?,?\s+")
            .expect("static weekday pattern")
    })
}

/// Years below this come from two-digit year text (`%Y` takes any width).
const MIN_YEAR: i32 = 1000;

/// Parse free-form date text.
///
/// Machine formats (RFC 3339, an ISO date followed by any time part) are
/// tried before the human-readable list in [`DATE_FORMATS`]. Two-digit
/// years are rejected rather than read as the first century.
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let text = normalize_whitespace(raw);
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return plausible(dt.date_naive());
    }
    if let Some(date) = iso_date_prefix(&text) {
        return plausible(date);
    }

    let text = weekday_prefix().replace(&text, "");
    let text = ordinal_suffix().replace_all(&text, "$1");

    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(&text, fmt)
            .ok()
            .and_then(plausible)
    })
}

/// `YYYY-MM-DD` optionally followed by `T…` or ` …` (minutes-only times,
/// offsets without seconds).
fn iso_date_prefix(text: &str) -> Option<NaiveDate> {
    let (date, rest) = NaiveDate::parse_and_remainder(text, "%Y-%m-%d").ok()?;
    (rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')).then_some(date)
}

fn plausible(date: NaiveDate) -> Option<NaiveDate> {
    (date.year() >= MIN_YEAR).then_some(date)
}
