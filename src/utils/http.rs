// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::SourceConfig;

/// Anything that can hand back the raw HTML of a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch `url` and return the document text.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &SourceConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page asynchronously, failing on non-success status codes.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Fetch {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}

/// `PageSource` backed by reqwest.
#[derive(Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        fetch_text(&self.client, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_default_source() {
        assert!(create_async_client(&SourceConfig::default()).is_ok());
        assert!(HttpPageSource::new(&SourceConfig::default()).is_ok());
    }
}
