//! Direct HTTP fetch strategy.
//!
//! Fastest rung of the HTML ladder: a single GET with browser-like
//! headers and no JavaScript execution. Sites behind bot protection or
//! requiring rendering fall through to later rungs.

use reqwest::Client;
use tracing::debug;

use super::ScrapeError;

/// Fetch raw HTML with a plain GET and browser-like headers.
pub async fn fetch_direct(client: &Client, url: &str) -> Result<String, ScrapeError> {
    let response = client
        .get(url)
        .header(
            "User-Agent",
            "Mozilla/5.0 (X11; Linux x86_64; rv:122.0) Gecko/20100101 Firefox/122.0",
        )
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.5")
        .header("Upgrade-Insecure-Requests", "1")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Provider {
            provider: "direct-http",
            message: format!("HTTP {} for {}", status, url),
        });
    }

    let body = response.text().await?;
    debug!("direct-http fetched {} bytes from {}", body.len(), url);

    if body.trim().is_empty() {
        return Err(ScrapeError::EmptyContent {
            strategy: "direct-http".to_string(),
        });
    }

    Ok(body)
}
