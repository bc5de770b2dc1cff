use crate::config::{ApiConfig, ScrapingConfig};
use crate::listing::Listing;
use crate::normalize::extract_next_data;
use crate::transport::DetailFetcher;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Fetches detail pages and returns their embedded JSON document
///
/// Each listing gets up to `retry_attempts` tries with a fixed pause between
/// them. A bare JSON body is returned as is.
pub struct HttpDetailFetcher {
    client: Client,
    retry_attempts: u32,
    retry_delay: Duration,
    pacing: Duration,
}

impl HttpDetailFetcher {
    pub fn new(client: Client, api: &ApiConfig, scraping: &ScrapingConfig) -> Self {
        Self {
            client,
            retry_attempts: scraping.retry_attempts.max(1),
            retry_delay: Duration::from_millis(scraping.retry_delay_ms),
            pacing: Duration::from_millis(api.delay_between_requests_ms),
        }
    }

    async fn attempt(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        if body.trim_start().starts_with('{') {
            return Ok(body);
        }
        extract_next_data(&body).ok_or_else(|| "no embedded __NEXT_DATA__ document".to_string())
    }
}

#[async_trait]
impl DetailFetcher for HttpDetailFetcher {
    async fn extract_detail(&self, listing: &Listing) -> Option<String> {
        for attempt in 1..=self.retry_attempts {
            let outcome = self.attempt(&listing.source_url).await;

            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            match outcome {
                Ok(payload) => {
                    debug!("Fetched detail for {}", listing.source_id);
                    return Some(payload);
                }
                Err(reason) => warn!(
                    "Detail fetch failed for {} (attempt {}/{}): {}",
                    listing.source_id, attempt, self.retry_attempts, reason
                ),
            }

            if attempt < self.retry_attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        None
    }
}
