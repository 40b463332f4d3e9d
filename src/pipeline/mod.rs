//! Pipeline entry points for the relay.
//!
//! - `run_cycle`: Fetch the page once and post what is new
//! - `preview`: Fetch and resolve without posting
//! - `poll::run`: Repeat cycles until Ctrl-C

pub mod cycle;
pub mod filter;
pub mod poll;

pub use cycle::{CycleReport, preview, run_cycle};
pub use filter::{ArticleFilter, FilterOutcome, SkipReason, SkippedArticle};
