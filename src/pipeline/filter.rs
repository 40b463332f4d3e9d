//! Filtering and deduplication.
//!
//! Decides which resolved articles of one cycle get dispatched and marks
//! them in the history. Gates, in order, per article:
//!
//! 1. already in history
//! 2. unconfirmed date under a strict policy
//! 3. outside the look-back window
//! 4. per-cycle cap
//!
//! Accepted articles are marked before delivery is attempted; capped-out
//! articles are not marked and stay eligible next cycle.

use chrono::{Days, NaiveDate};

use crate::models::{DateConfidence, Policy, ResolvedArticle};
use crate::storage::{HistoryEntry, HistoryStore};

/// Why an article was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Identifier already in history (or earlier on the same page)
    Duplicate,
    /// Strict policy and the date was assumed or unknown
    Unconfirmed { confidence: DateConfidence },
    /// Known date older than the window
    OutsideWindow { date: NaiveDate, cutoff: NaiveDate },
    /// Cycle cap already reached
    CapReached,
}

/// An article that was filtered out, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedArticle {
    pub id: String,
    pub title: String,
    pub reason: SkipReason,
}

/// Result of filtering one cycle.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Articles to deliver, in document order
    pub dispatch: Vec<ResolvedArticle>,
    /// Everything else
    pub skipped: Vec<SkippedArticle>,
}

impl FilterOutcome {
    /// Check if there is anything to deliver.
    pub fn has_dispatch(&self) -> bool {
        !self.dispatch.is_empty()
    }

    pub fn duplicate_count(&self) -> usize {
        self.count(|r| matches!(r, SkipReason::Duplicate))
    }

    pub fn unconfirmed_count(&self) -> usize {
        self.count(|r| matches!(r, SkipReason::Unconfirmed { .. }))
    }

    pub fn outside_window_count(&self) -> usize {
        self.count(|r| matches!(r, SkipReason::OutsideWindow { .. }))
    }

    pub fn capped_count(&self) -> usize {
        self.count(|r| matches!(r, SkipReason::CapReached))
    }

    fn count(&self, pred: impl Fn(&SkipReason) -> bool) -> usize {
        self.skipped.iter().filter(|s| pred(&s.reason)).count()
    }
}

/// Applies a [`Policy`] against a [`HistoryStore`].
#[derive(Debug, Clone)]
pub struct ArticleFilter<'a> {
    policy: &'a Policy,
}

impl<'a> ArticleFilter<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self { policy }
    }

    /// Earliest publish date still inside the window.
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.policy.look_back_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Filter one cycle's articles and mark the accepted ones in `history`.
    pub fn apply(
        &self,
        articles: Vec<ResolvedArticle>,
        history: &mut HistoryStore,
        today: NaiveDate,
    ) -> FilterOutcome {
        let cutoff = self.cutoff(today);
        let cap = self.policy.cap();
        let mut outcome = FilterOutcome::default();

        for article in articles {
            let id = article.id();

            let rejection = self
                .check(&article, history, cutoff)
                .or_else(|| match cap {
                    Some(cap) if outcome.dispatch.len() >= cap => Some(SkipReason::CapReached),
                    _ => None,
                });

            match rejection {
                Some(reason) => {
                    log::debug!("Skipping {} ({:?})", id, reason);
                    outcome.skipped.push(SkippedArticle {
                        id,
                        title: article.candidate.title,
                        reason,
                    });
                }
                None => {
                    history.add(id, HistoryEntry::for_article(&article));
                    outcome.dispatch.push(article);
                }
            }
        }

        outcome
    }

    /// Dedup and date gates; the cap is checked separately, last.
    fn check(
        &self,
        article: &ResolvedArticle,
        history: &HistoryStore,
        cutoff: NaiveDate,
    ) -> Option<SkipReason> {
        if history.contains(&article.id()) {
            return Some(SkipReason::Duplicate);
        }

        if self.policy.requires_confirmed_date() && !article.confidence.is_confirmed() {
            return Some(SkipReason::Unconfirmed {
                confidence: article.confidence,
            });
        }

        if self.policy.current_date_only {
            if let Some(date) = article.date {
                if date < cutoff {
                    return Some(SkipReason::OutsideWindow { date, cutoff });
                }
            }
        }

        None
    }
}
