// src/services/webhook.rs

//! Chat webhook delivery.
//!
//! One POST per article with a Discord-compatible embed payload. Failures
//! are reported to the caller; there is no retry.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{DeliveryConfig, ResolvedArticle};
use crate::utils::truncate_graphemes;

/// Maximum embed title length accepted by the chat service.
pub const EMBED_TITLE_LIMIT: usize = 256;

/// Anything that can publish one article.
#[async_trait]
pub trait ArticleSink: Send + Sync {
    async fn deliver(&self, article: &ResolvedArticle) -> Result<()>;
}

#[derive(Debug, Serialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub color: u32,
    pub footer: EmbedFooter,
    pub timestamp: String,
}

/// JSON body of one webhook call.
#[derive(Debug, Serialize, PartialEq)]
pub struct WebhookPayload {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub embeds: Vec<Embed>,
}

impl WebhookPayload {
    /// Build the payload for one article.
    pub fn for_article(article: &ResolvedArticle, config: &DeliveryConfig) -> Self {
        let footer = match article.candidate.category.as_deref() {
            Some(category) if !category.is_empty() => {
                format!("Category: {} \u{2022} {}", category, config.footer)
            }
            _ => config.footer.clone(),
        };

        // Midnight UTC of the publish date, or now when the date is unknown.
        let timestamp = article
            .date
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or_else(Utc::now)
            .to_rfc3339();

        Self {
            content: article.format(&config.content_template),
            username: config.username.clone(),
            embeds: vec![Embed {
                title: truncate_graphemes(article.title(), EMBED_TITLE_LIMIT),
                url: article.url().to_string(),
                color: config.color,
                footer: EmbedFooter { text: footer },
                timestamp,
            }],
        }
    }
}

/// [`ArticleSink`] posting to a chat webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    config: DeliveryConfig,
}

impl WebhookNotifier {
    pub fn new(config: &DeliveryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub async fn send(&self, payload: &WebhookPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::delivery(status.as_u16(), body.trim()));
        }
        Ok(())
    }
}

#[async_trait]
impl ArticleSink for WebhookNotifier {
    async fn deliver(&self, article: &ResolvedArticle) -> Result<()> {
        let payload = WebhookPayload::for_article(article, &self.config);
        self.send(&payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleCandidate, DateConfidence};
    use chrono::NaiveDate;
    use serde_json::json;

    fn article(title: &str, category: Option<&str>, date: Option<NaiveDate>) -> ResolvedArticle {
        ResolvedArticle {
            candidate: ArticleCandidate {
                title: title.to_string(),
                url: "https://example.com/articles/new-codex".to_string(),
                raw_date: None,
                url_date: None,
                category: category.map(str::to_string),
            },
            date,
            confidence: DateConfidence::ConfirmedElement,
        }
    }

    fn config() -> DeliveryConfig {
        DeliveryConfig {
            webhook_url: "https://chat.example.com/api/webhooks/1/abc".to_string(),
            content_template: "New: {title} ({date}, {confidence})".to_string(),
            username: Some("News Bot".to_string()),
            footer: "Community".to_string(),
            color: 0x9370DB,
            ..DeliveryConfig::default()
        }
    }

    #[test]
    fn test_payload_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        let payload = WebhookPayload::for_article(&article("New Codex", Some("Warhammer"), Some(date)), &config());

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "content": "New: New Codex (2024-06-05, confirmed-element)",
                "username": "News Bot",
                "embeds": [{
                    "title": "New Codex",
                    "url": "https://example.com/articles/new-codex",
                    "color": 0x9370DB,
                    "footer": { "text": "Category: Warhammer \u{2022} Community" },
                    "timestamp": "2024-06-05T00:00:00+00:00",
                }]
            })
        );
    }

    #[test]
    fn test_username_omitted_when_unset() {
        let mut config = config();
        config.username = None;
        let payload = WebhookPayload::for_article(&article("T", None, None), &config);

        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("username").is_none());
        assert_eq!(value["embeds"][0]["footer"]["text"], "Community");
        assert!(!payload.embeds[0].timestamp.is_empty());
    }

    #[test]
    fn test_long_title_truncated() {
        let title = "\u{e9}".repeat(400);
        let payload = WebhookPayload::for_article(&article(&title, None, None), &config());

        let embed_title = &payload.embeds[0].title;
        assert!(embed_title.chars().count() <= EMBED_TITLE_LIMIT);
        assert!(embed_title.starts_with("\u{e9}\u{e9}"));
    }

    #[test]
    fn test_notifier_builds() {
        assert!(WebhookNotifier::new(&config()).is_ok());
    }
}
