use crate::config::{ApiConfig, ScrapingConfig};
use crate::listing::{Listing, SearchCriteria};
use crate::normalize::{extract_next_data, parse_search_response, parse_ssr_page};
use crate::transport::{SearchTransport, PAGE_SIZE};
use crate::{CrawlError, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Search over the site's server-rendered result pages
///
/// Page `N` lives at `{search_base_url}/{location-slug}?pagina=N`; the first
/// page carries no parameter. Criteria filters travel as further query
/// parameters. Responses are either a rendered page with an
/// embedded document or a bare JSON search response.
pub struct HttpSearchClient {
    client: Client,
    search_base_url: String,
    detail_base_url: String,
    delay: Duration,
}

impl HttpSearchClient {
    pub fn new(client: Client, api: &ApiConfig, scraping: &ScrapingConfig) -> Self {
        Self {
            client,
            search_base_url: api.search_base_url.clone(),
            detail_base_url: scraping.detail_base_url.clone(),
            delay: Duration::from_millis(api.delay_between_requests_ms),
        }
    }

    /// URL of the page that starts at `offset`
    ///
    /// # Arguments
    ///
    /// * `criteria` - Location and filters of the search
    /// * `offset` - Zero-based index of the first listing on the page
    ///
    /// # Returns
    ///
    /// * `Ok(Url)` - Page URL with the page number and filter parameters
    /// * `Err(CrawlError)` - If the configured base URL is not a valid URL
    pub fn page_url(&self, criteria: &SearchCriteria, offset: u32) -> Result<Url> {
        let page = offset / PAGE_SIZE + 1;
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.search_base_url.trim_end_matches('/'),
            criteria.location_slug()
        ))?;

        let filters = criteria.query_pairs();
        if page > 1 || !filters.is_empty() {
            let mut query = url.query_pairs_mut();
            if page > 1 {
                query.append_pair("pagina", &page.to_string());
            }
            for (key, value) in &filters {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn parse_body(&self, url: &Url, body: &str) -> Result<(Vec<Listing>, u64)> {
        if body.trim_start().starts_with('{') {
            let data: serde_json::Value = serde_json::from_str(body)?;
            return Ok(parse_search_response(&data, &self.detail_base_url));
        }

        let json = extract_next_data(body).ok_or_else(|| CrawlError::Markup {
            url: url.to_string(),
            message: "embedded __NEXT_DATA__ document not found".to_string(),
        })?;
        let document: serde_json::Value = serde_json::from_str(&json)?;
        Ok(parse_ssr_page(&document, &self.detail_base_url))
    }
}

#[async_trait]
impl SearchTransport for HttpSearchClient {
    async fn search(&self, criteria: &SearchCriteria, offset: u32) -> Result<(Vec<Listing>, u64)> {
        let url = self.page_url(criteria, offset)?;
        info!("Fetching search page {}", url);

        let result = self
            .client
            .get(url.clone())
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let response = result.map_err(|e| request_error(&url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await.map_err(|e| request_error(&url, e))?;
        let (listings, total) = self.parse_body(&url, &body)?;
        info!(
            "Search page returned {} listings (total available: {})",
            listings.len(),
            total
        );
        Ok((listings, total))
    }
}

pub(crate) fn request_error(url: &Url, error: reqwest::Error) -> CrawlError {
    if error.is_timeout() {
        CrawlError::Timeout {
            url: url.to_string(),
        }
    } else {
        CrawlError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
