// src/pipeline/poll.rs

//! The poll loop.

use std::future::Future;
use std::time::Duration;

use chrono::Local;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::cycle::run_cycle;
use crate::services::{ArticleParser, ArticleSink};
use crate::storage::HistoryStore;
use crate::utils::http::PageSource;

/// Poll until Ctrl-C.
pub async fn run(config: &Config, source: &dyn PageSource, sink: &dyn ArticleSink) -> Result<()> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_until(config, source, sink, shutdown).await
}

/// Poll until `shutdown` resolves.
///
/// Cycles run back to back separated by `poll.interval_secs`, or by
/// `poll.error_backoff_secs` after a failed cycle. Shutdown is honored
/// between cycles only: a started cycle always delivers everything it
/// reserved in the history before the loop stops. The history is flushed
/// before returning.
pub async fn run_until<F>(
    config: &Config,
    source: &dyn PageSource,
    sink: &dyn ArticleSink,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let parser = ArticleParser::new(&config.selectors)?;
    let mut history = HistoryStore::load(&config.history.path);
    log::info!(
        "Polling {} every {}s ({} article(s) in history)",
        config.source.url,
        config.poll.interval_secs,
        history.len()
    );

    tokio::pin!(shutdown);

    loop {
        // Poll `shutdown` once so a signal listener is registered before the
        // cycle starts; a request arriving mid-cycle is seen at the sleep.
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = std::future::ready(()) => {}
        }

        let today = Local::now().date_naive();
        let wait = match run_cycle(config, &parser, source, sink, &mut history, today).await {
            Ok(report) => {
                report.log_summary();
                config.poll.interval_secs
            }
            Err(e) => {
                log::error!("Cycle failed: {}", e);
                config.poll.error_backoff_secs
            }
        };

        log::debug!("Next cycle in {}s", wait);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(wait)) => {}
            _ = &mut shutdown => break,
        }
    }

    log::info!("Shutting down");
    if let Err(e) = history.save_if_dirty() {
        log::warn!(
            "Failed to save history to {}: {}",
            history.path().display(),
            e
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::cycle::tests::{PAGE, RecordingSink, StaticPage, test_config};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_runs_one_cycle_then_stops() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        config.poll.interval_secs = 3600;
        let source = StaticPage::ok(PAGE);
        let sink = RecordingSink::default();

        // Ask to stop as soon as the first article is out.
        let shutdown = async {
            while sink.urls().is_empty() {
                tokio::task::yield_now().await;
            }
        };

        run_until(&config, &source, &sink, shutdown).await.unwrap();

        assert_eq!(sink.urls().len(), 3);
        assert_eq!(HistoryStore::load(&config.history.path).len(), 3);
    }

    #[tokio::test]
    async fn test_shutdown_mid_delivery_finishes_the_cycle() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        config.poll.interval_secs = 3600;
        config.delivery.delay_ms = 300;
        let source = StaticPage::ok(PAGE);
        let sink = RecordingSink::default();

        // Fires while the cycle sleeps between the first and second post.
        let shutdown = async {
            while sink.urls().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };

        run_until(&config, &source, &sink, shutdown).await.unwrap();

        let delivered = sink.urls();
        assert_eq!(delivered.len(), 3);

        // Nothing is marked seen on disk without having been delivered.
        let history = HistoryStore::load(&config.history.path);
        assert_eq!(history.len(), delivered.len());
        for (id, _) in history.iter() {
            assert!(
                delivered.iter().any(|url| url.trim_end_matches('/') == id),
                "{id} marked but never delivered"
            );
        }
    }

    #[tokio::test]
    async fn test_immediate_shutdown_runs_no_cycle() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let sink = RecordingSink::default();

        run_until(
            &config,
            &StaticPage::ok(PAGE),
            &sink,
            std::future::ready(()),
        )
        .await
        .unwrap();

        assert!(sink.urls().is_empty());
        assert!(!config.history.path.exists());
    }
}
