// src/pipeline/cycle.rs

//! One fetch → parse → resolve → filter → dispatch → persist cycle.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use url::Url;

use crate::error::Result;
use crate::models::{Config, ResolvedArticle};
use crate::pipeline::filter::{ArticleFilter, FilterOutcome};
use crate::services::{ArticleParser, ArticleSink, DateResolver};
use crate::storage::HistoryStore;
use crate::storage::dump::dump_html;
use crate::utils::http::PageSource;

/// Counters for one finished cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Candidates extracted from the page
    pub found: usize,
    pub delivered: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub unconfirmed: usize,
    pub outside_window: usize,
    pub capped: usize,
    /// Whether the history was written to disk
    pub persisted: bool,
}

impl CycleReport {
    fn new(start_time: DateTime<Utc>, found: usize, outcome: &FilterOutcome) -> Self {
        Self {
            start_time,
            end_time: start_time,
            found,
            delivered: 0,
            failed: 0,
            duplicates: outcome.duplicate_count(),
            unconfirmed: outcome.unconfirmed_count(),
            outside_window: outcome.outside_window_count(),
            capped: outcome.capped_count(),
            persisted: false,
        }
    }

    pub fn dispatched(&self) -> usize {
        self.delivered + self.failed
    }

    pub fn log_summary(&self) {
        log::info!(
            "Cycle done in {}ms: {} found, {} delivered, {} failed, {} seen, {} unconfirmed, {} out of window, {} capped",
            (self.end_time - self.start_time).num_milliseconds(),
            self.found,
            self.delivered,
            self.failed,
            self.duplicates,
            self.unconfirmed,
            self.outside_window,
            self.capped
        );
    }
}

/// Fetch the source page, optionally dumping it for inspection.
async fn fetch_page(config: &Config, source: &dyn PageSource) -> Result<String> {
    let html = source.fetch(&config.source.url).await?;
    log::debug!("Fetched {} bytes from {}", html.len(), config.source.url);

    if config.debug.dump_html {
        match dump_html(&config.debug.dump_dir, &html).await {
            Ok(path) => log::debug!("Dumped page to {}", path.display()),
            Err(e) => log::warn!("Failed to dump page: {}", e),
        }
    }
    Ok(html)
}

/// Fetch, parse and resolve the source page.
async fn collect(
    config: &Config,
    parser: &ArticleParser,
    source: &dyn PageSource,
    today: NaiveDate,
) -> Result<Vec<ResolvedArticle>> {
    let base_url = Url::parse(&config.source.url)?;
    let html = fetch_page(config, source).await?;
    let candidates = parser.parse(&html, &base_url);
    Ok(DateResolver::new(&config.policy).resolve_all(candidates, today))
}

/// Run one full cycle against `history`.
///
/// A failed fetch is returned as an error before the history is touched.
/// Delivery and persistence failures are logged and counted; they never
/// fail the cycle.
pub async fn run_cycle(
    config: &Config,
    parser: &ArticleParser,
    source: &dyn PageSource,
    sink: &dyn ArticleSink,
    history: &mut HistoryStore,
    today: NaiveDate,
) -> Result<CycleReport> {
    let start_time = Utc::now();
    let articles = collect(config, parser, source, today).await?;
    let found = articles.len();

    let mut session = history.session();
    let outcome = ArticleFilter::new(&config.policy).apply(articles, &mut session, today);
    let mut report = CycleReport::new(start_time, found, &outcome);

    if outcome.has_dispatch() {
        log::info!("{} new article(s) to post", outcome.dispatch.len());
    } else {
        log::info!("No new articles ({} on page)", found);
    }

    let delay = Duration::from_millis(config.delivery.delay_ms);
    for (i, article) in outcome.dispatch.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match sink.deliver(article).await {
            Ok(()) => {
                report.delivered += 1;
                log::info!("Posted: {} ({})", article.title(), article.confidence);
            }
            Err(e) => {
                report.failed += 1;
                log::error!("Failed to post {}: {}", article.url(), e);
            }
        }
    }

    match session.commit() {
        Ok(()) => report.persisted = true,
        Err(e) => log::warn!(
            "Failed to save history to {}: {}. Continuing in memory.",
            history.path().display(),
            e
        ),
    }

    report.end_time = Utc::now();
    Ok(report)
}

/// Fetch and resolve without posting or persisting anything.
///
/// With `all` set every resolved article is returned; otherwise the policy
/// is applied against a scratch copy of `history`.
pub async fn preview(
    config: &Config,
    parser: &ArticleParser,
    source: &dyn PageSource,
    history: &HistoryStore,
    today: NaiveDate,
    all: bool,
) -> Result<Vec<ResolvedArticle>> {
    let articles = collect(config, parser, source, today).await?;
    if all {
        return Ok(articles);
    }

    let mut scratch = history.clone();
    let outcome = ArticleFilter::new(&config.policy).apply(articles, &mut scratch, today);
    Ok(outcome.dispatch)
}
