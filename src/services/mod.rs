//! Service layer for the relay.
//!
//! This module contains the logic for:
//! - Page parsing (`ArticleParser`)
//! - Publish date resolution (`DateResolver`)
//! - Webhook delivery (`WebhookNotifier`)

pub mod dates;
mod parser;
pub mod webhook;

pub use dates::{DateResolver, DateStrategy};
pub use parser::ArticleParser;
pub use webhook::{ArticleSink, WebhookNotifier, WebhookPayload};
