use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::{GatorError, Result};
use crate::domain::ParsedFeed;
use crate::fetcher::FeedSource;
use crate::normalizer::Normalizer;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpSource {
    client: Client,
    normalizer: Normalizer,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("gator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            normalizer: Normalizer::new(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        // Reading the body to the end hands the connection back to the pool.
        let body = response.bytes().await?;

        if !status.is_success() {
            tracing::debug!(url, status = status.as_u16(), len = body.len(), "discarded error body");
            return Err(GatorError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        self.normalizer.normalize(&body)
    }
}
