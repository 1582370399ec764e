//! Web scraping with tiered fallbacks.
//!
//! HTML retrieval tries five strategies in fixed priority order: direct
//! HTTP, a pooled headless browser, then three external rendering
//! providers. Screenshot, image, and full-HTML extraction run their own
//! independent engine/proxy ladder over the browser pool. First success
//! wins outright; an empty result counts as failure and falls through.

mod browser;
mod extract;
mod fallback;
mod http;
mod links;
mod metadata;
mod providers;

pub use browser::{BrowserFetchOptions, SelectorMode};
pub use fallback::{run_ladder, LadderValue, Rung, ScrapeAttempt};
pub use links::extract_links;
pub use metadata::{extract_metadata, PageMetadata};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::browser::{BrowserEngine, BrowserPool};

/// Errors raised by the scraping pipeline.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Bot protection interstitial detected at {url}")]
    BotProtection { url: String },

    #[error("{strategy} returned empty content")]
    EmptyContent { strategy: String },

    #[error("{provider} is not configured (missing credential)")]
    ProviderUnavailable { provider: &'static str },

    #[error("{provider} request failed: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("Selector '{selector}' matched nothing at {url}")]
    SelectorNotFound { selector: String, url: String },

    #[error("Failed to retrieve {operation} for {url} after trying all methods: {}",
        format_attempts(.attempts))]
    Exhausted {
        operation: String,
        url: String,
        attempts: Vec<fallback::ScrapeAttempt>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_attempts(attempts: &[fallback::ScrapeAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("[{}: {}]", a.rung, a.error))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scraping strategy configuration, including optional provider credentials.
/// Strategies whose credential is absent are silently skipped by the
/// fallback orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Direct HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay between fallback attempts in milliseconds.
    #[serde(default)]
    pub delay_between_retries_ms: u64,

    /// Delay after navigation to let async content settle, in milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Scrape.do access token (strategy 3).
    #[serde(default)]
    pub scrapedo_token: Option<String>,

    /// RapidAPI key for the Scrappey gateway (strategy 4).
    #[serde(default)]
    pub rapidapi_key: Option<String>,

    /// Firecrawl API key (strategy 5, last resort).
    #[serde(default)]
    pub firecrawl_key: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_settle_delay_ms() -> u64 {
    1000
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            delay_between_retries_ms: 0,
            settle_delay_ms: default_settle_delay_ms(),
            scrapedo_token: None,
            rapidapi_key: None,
            firecrawl_key: None,
        }
    }
}

/// Per-call scraping options.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// Scoped CSS selector extraction instead of full-page HTML.
    pub selector: Option<String>,

    /// Whether a selector should collect every match or just the first.
    pub select_all: bool,

    /// Override the configured settle delay.
    pub settle_delay_ms: Option<u64>,

    /// Override the configured inter-attempt delay.
    pub delay_between_retries_ms: Option<u64>,
}

/// Scraping front-end owning the HTTP client and the pooled browsers.
pub struct Scraper {
    config: ScrapeConfig,
    pool: Arc<BrowserPool>,
    http: reqwest::Client,
}

impl Scraper {
    /// Create a scraper over an existing browser pool.
    pub fn new(config: ScrapeConfig, pool: Arc<BrowserPool>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, pool, http }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<BrowserPool> {
        &self.pool
    }

    /// Retrieve HTML for a URL, trying every configured strategy in fixed
    /// priority order: direct HTTP, headless browser, Scrape.do, Scrappey,
    /// Firecrawl. Returns at the first non-empty result.
    pub async fn get_html_with_fallbacks(
        &self,
        url: &str,
        options: &ScrapeOptions,
    ) -> Result<String, ScrapeError> {
        let delay = Duration::from_millis(
            options
                .delay_between_retries_ms
                .unwrap_or(self.config.delay_between_retries_ms),
        );

        let browser_opts = BrowserFetchOptions {
            engine: BrowserEngine::Firefox,
            use_proxy: false,
            selector: options.selector.clone(),
            mode: if options.select_all {
                SelectorMode::All
            } else {
                SelectorMode::First
            },
            settle_delay_ms: options
                .settle_delay_ms
                .unwrap_or(self.config.settle_delay_ms),
        };

        let mut rungs: Vec<Rung<'_, String>> = Vec::new();
        for name in html_ladder_plan(&self.config) {
            match name {
                "direct-http" => rungs.push(Rung::new(
                    name,
                    Box::pin(http::fetch_direct(&self.http, url)),
                )),
                "headless-browser" => rungs.push(Rung::new(
                    name,
                    Box::pin(browser::fetch_page_html(&self.pool, url, browser_opts.clone())),
                )),
                "scrapedo" => {
                    if let Some(token) = self.config.scrapedo_token.as_deref() {
                        rungs.push(Rung::new(
                            name,
                            Box::pin(providers::fetch_scrapedo(&self.http, url, token)),
                        ));
                    }
                }
                "scrappey" => {
                    if let Some(key) = self.config.rapidapi_key.as_deref() {
                        rungs.push(Rung::new(
                            name,
                            Box::pin(providers::fetch_scrappey(&self.http, url, key)),
                        ));
                    }
                }
                "firecrawl" => {
                    if let Some(key) = self.config.firecrawl_key.as_deref() {
                        rungs.push(Rung::new(
                            name,
                            Box::pin(providers::fetch_firecrawl(&self.http, url, key)),
                        ));
                    }
                }
                _ => {}
            }
        }

        run_ladder("html", url, rungs, delay).await
    }

    /// Scrape a URL, optionally scoped to a CSS selector.
    /// Convenience alias over [`Scraper::get_html_with_fallbacks`].
    pub async fn scrape_web_url(
        &self,
        url: &str,
        options: &ScrapeOptions,
    ) -> Result<String, ScrapeError> {
        self.get_html_with_fallbacks(url, options).await
    }

    /// Retrieve full-page HTML through the engine/proxy browser ladder.
    pub async fn get_html_content(
        &self,
        url: &str,
        options: &ScrapeOptions,
    ) -> Result<String, ScrapeError> {
        extract::get_html_content(self, url, options).await
    }

    /// Collect image URLs from a page through the engine/proxy ladder.
    /// Only `<img>` sources starting with `http` or `data:image` are kept.
    pub async fn get_all_images(&self, url: &str) -> Result<Vec<String>, ScrapeError> {
        extract::get_all_images(self, url).await
    }

    /// Capture a full-page PNG screenshot through the engine/proxy ladder.
    pub async fn screenshot(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        extract::screenshot(self, url).await
    }

    /// Scrape page metadata (title, description, OpenGraph, favicon).
    pub async fn scrape_metadata(&self, url: &str) -> Result<PageMetadata, ScrapeError> {
        let html = self
            .get_html_with_fallbacks(url, &ScrapeOptions::default())
            .await?;
        Ok(extract_metadata(&html, url))
    }

    /// Extract outbound links from a page, capped at `max_links`.
    pub async fn scrape_links(
        &self,
        url: &str,
        max_links: usize,
    ) -> Result<Vec<String>, ScrapeError> {
        let html = self
            .get_html_with_fallbacks(url, &ScrapeOptions::default())
            .await?;
        Ok(extract_links(&html, url, max_links))
    }
}

/// Names of the HTML-ladder strategies enabled by `config`, in the fixed
/// order they will run. Provider rungs whose credential is absent are
/// skipped here, with a log per skip.
fn html_ladder_plan(config: &ScrapeConfig) -> Vec<&'static str> {
    let mut plan = vec!["direct-http", "headless-browser"];

    if config.scrapedo_token.is_some() {
        plan.push("scrapedo");
    } else {
        debug!("Skipping scrape.do: no access token configured");
    }
    if config.rapidapi_key.is_some() {
        plan.push("scrappey");
    } else {
        debug!("Skipping scrappey: no RapidAPI key configured");
    }
    if config.firecrawl_key.is_some() {
        plan.push("firecrawl");
    } else {
        debug!("Skipping firecrawl: no API key configured");
    }

    plan
}
