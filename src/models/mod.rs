// src/models/mod.rs

//! Domain models for the relay.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod article;
mod config;

// Re-export all public types
pub use article::{ArticleCandidate, DateConfidence, ResolvedArticle};
pub use config::{
    Config, DebugConfig, DeliveryConfig, ENV_HISTORY_FILE, ENV_SOURCE_URL, ENV_WEBHOOK_URL,
    HistoryConfig, LoggingConfig, PollConfig, Policy, SelectorConfig, SourceConfig,
};
