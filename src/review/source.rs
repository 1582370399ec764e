//! Page-content seam for the orchestrator.
//!
//! The review pipeline pulls everything it needs about a page through this
//! trait; the production implementation delegates to the scraping ladders.

use std::sync::Arc;

use async_trait::async_trait;

use crate::scrape::{PageMetadata, ScrapeError, ScrapeOptions, Scraper};

/// Everything the review pipeline needs from a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Page HTML via the full fallback ladder.
    async fn html(&self, url: &str) -> Result<String, ScrapeError>;

    /// Up to `max` image URLs from the page.
    async fn images(&self, url: &str, max: usize) -> Result<Vec<String>, ScrapeError>;

    /// Up to `max` outbound links from the page.
    async fn links(&self, url: &str, max: usize) -> Result<Vec<String>, ScrapeError>;

    /// Full-page PNG screenshot.
    async fn screenshot(&self, url: &str) -> Result<Vec<u8>, ScrapeError>;

    /// Page head metadata.
    async fn metadata(&self, url: &str) -> Result<PageMetadata, ScrapeError>;
}

/// Production source backed by the scraping ladders.
pub struct WebPageSource {
    scraper: Arc<Scraper>,
}

impl WebPageSource {
    pub fn new(scraper: Arc<Scraper>) -> Self {
        Self { scraper }
    }
}

#[async_trait]
impl PageSource for WebPageSource {
    async fn html(&self, url: &str) -> Result<String, ScrapeError> {
        self.scraper
            .get_html_with_fallbacks(url, &ScrapeOptions::default())
            .await
    }

    async fn images(&self, url: &str, max: usize) -> Result<Vec<String>, ScrapeError> {
        let mut images = self.scraper.get_all_images(url).await?;
        images.truncate(max);
        Ok(images)
    }

    async fn links(&self, url: &str, max: usize) -> Result<Vec<String>, ScrapeError> {
        self.scraper.scrape_links(url, max).await
    }

    async fn screenshot(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        self.scraper.screenshot(url).await
    }

    async fn metadata(&self, url: &str) -> Result<PageMetadata, ScrapeError> {
        self.scraper.scrape_metadata(url).await
    }
}
