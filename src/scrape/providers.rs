//! External rendering-provider strategies.
//!
//! Three paid fallbacks behind the direct and browser rungs, each with its
//! own auth scheme: Scrape.do (token in querystring, retried once through
//! its upstream-proxy route), Scrappey via the RapidAPI gateway, and
//! Firecrawl (Bearer token) as last resort.

use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::ScrapeError;

const SCRAPEDO_ENDPOINT: &str = "https://api.scrape.do/";
const SCRAPPEY_ENDPOINT: &str = "https://scrappey-com.p.rapidapi.com/api/v1";
const SCRAPPEY_HOST: &str = "scrappey-com.p.rapidapi.com";
const FIRECRAWL_ENDPOINT: &str = "https://api.firecrawl.dev/v1/scrape";

/// Scrape.do: token-based proxy rendering. On a failed first pass the
/// request is retried once through the `super` upstream-proxy route.
pub async fn fetch_scrapedo(client: &Client, url: &str, token: &str) -> Result<String, ScrapeError> {
    match scrapedo_request(client, url, token, false).await {
        Ok(html) => Ok(html),
        Err(e) => {
            debug!("scrape.do plain route failed for {}: {}, retrying with upstream proxy", url, e);
            scrapedo_request(client, url, token, true).await
        }
    }
}

async fn scrapedo_request(
    client: &Client,
    url: &str,
    token: &str,
    use_super_proxy: bool,
) -> Result<String, ScrapeError> {
    let mut request = client
        .get(SCRAPEDO_ENDPOINT)
        .query(&[("token", token), ("url", url)]);
    if use_super_proxy {
        request = request.query(&[("super", "true")]);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ScrapeError::Provider {
            provider: "scrape.do",
            message: format!("HTTP {}: {}", status, body),
        });
    }

    let html = response.text().await?;
    if html.trim().is_empty() {
        return Err(ScrapeError::EmptyContent {
            strategy: "scrape.do".to_string(),
        });
    }
    Ok(html)
}

/// Scrappey through the RapidAPI gateway.
pub async fn fetch_scrappey(client: &Client, url: &str, api_key: &str) -> Result<String, ScrapeError> {
    let response = client
        .post(SCRAPPEY_ENDPOINT)
        .header("x-rapidapi-key", api_key)
        .header("x-rapidapi-host", SCRAPPEY_HOST)
        .json(&json!({
            "cmd": "request.get",
            "url": url,
        }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ScrapeError::Provider {
            provider: "scrappey",
            message: format!("HTTP {}: {}", status, body),
        });
    }

    let payload: serde_json::Value = response.json().await?;
    let html = payload
        .pointer("/solution/response")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    if html.trim().is_empty() {
        return Err(ScrapeError::EmptyContent {
            strategy: "scrappey".to_string(),
        });
    }
    Ok(html.to_string())
}

/// Firecrawl headless-rendering-as-a-service. Last resort.
pub async fn fetch_firecrawl(
    client: &Client,
    url: &str,
    api_key: &str,
) -> Result<String, ScrapeError> {
    let response = client
        .post(FIRECRAWL_ENDPOINT)
        .bearer_auth(api_key)
        .json(&json!({
            "url": url,
            "formats": ["html"],
        }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ScrapeError::Provider {
            provider: "firecrawl",
            message: format!("HTTP {}: {}", status, body),
        });
    }

    let payload: serde_json::Value = response.json().await?;
    let html = payload
        .pointer("/data/html")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    if html.trim().is_empty() {
        return Err(ScrapeError::EmptyContent {
            strategy: "firecrawl".to_string(),
        });
    }
    Ok(html.to_string())
}
