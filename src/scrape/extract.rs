//! Browser-ladder extractors.
//!
//! `get_html_content`, `get_all_images`, and `screenshot` each run their
//! own four-rung ladder over the browser pool, varying only engine and
//! proxy usage: firefox-no-proxy, firefox-proxy, chromium-proxy,
//! chromium-no-proxy, with a fixed wait between rungs. This ladder is
//! independent of the five-strategy HTML ladder.

use std::time::Duration;

use tracing::debug;

use crate::browser::BrowserEngine;

use super::browser::{
    fetch_page_html, fetch_page_images, fetch_page_screenshot, BrowserFetchOptions, SelectorMode,
};
use super::fallback::{run_ladder, Rung};
use super::{ScrapeError, ScrapeOptions, Scraper};

/// Fixed rung order: engine and proxy combinations.
const LADDER: &[(BrowserEngine, bool, &str)] = &[
    (BrowserEngine::Firefox, false, "firefox-no-proxy"),
    (BrowserEngine::Firefox, true, "firefox-proxy"),
    (BrowserEngine::Chromium, true, "chromium-proxy"),
    (BrowserEngine::Chromium, false, "chromium-no-proxy"),
];

/// Wait between ladder rungs.
const RUNG_DELAY: Duration = Duration::from_secs(2);

fn rung_options(
    scraper: &Scraper,
    engine: BrowserEngine,
    use_proxy: bool,
    options: Option<&ScrapeOptions>,
) -> BrowserFetchOptions {
    BrowserFetchOptions {
        engine,
        use_proxy,
        selector: options.and_then(|o| o.selector.clone()),
        mode: match options {
            Some(o) if o.select_all => SelectorMode::All,
            _ => SelectorMode::First,
        },
        settle_delay_ms: options
            .and_then(|o| o.settle_delay_ms)
            .unwrap_or(scraper.config().settle_delay_ms),
    }
}

/// Build the engine/proxy rung list, skipping proxy rungs when no proxy
/// is configured (they would be identical to their no-proxy siblings).
fn ladder_plan(scraper: &Scraper) -> Vec<(BrowserEngine, bool, &'static str)> {
    let has_proxy = scraper.pool().config().proxy.is_some();
    LADDER
        .iter()
        .filter(|(_, use_proxy, name)| {
            if *use_proxy && !has_proxy {
                debug!("Skipping {} rung: no proxy configured", name);
                false
            } else {
                true
            }
        })
        .copied()
        .collect()
}

/// Full-page HTML through the engine/proxy ladder.
pub async fn get_html_content(
    scraper: &Scraper,
    url: &str,
    options: &ScrapeOptions,
) -> Result<String, ScrapeError> {
    let rungs = ladder_plan(scraper)
        .into_iter()
        .map(|(engine, use_proxy, name)| {
            let opts = rung_options(scraper, engine, use_proxy, Some(options));
            Rung::new(name, Box::pin(fetch_page_html(scraper.pool(), url, opts)))
        })
        .collect();
    run_ladder("HTML", url, rungs, RUNG_DELAY).await
}

/// Image URL list through the engine/proxy ladder.
pub async fn get_all_images(scraper: &Scraper, url: &str) -> Result<Vec<String>, ScrapeError> {
    let rungs = ladder_plan(scraper)
        .into_iter()
        .map(|(engine, use_proxy, name)| {
            let opts = rung_options(scraper, engine, use_proxy, None);
            Rung::new(name, Box::pin(fetch_page_images(scraper.pool(), url, opts)))
        })
        .collect();
    run_ladder("images", url, rungs, RUNG_DELAY).await
}

/// Full-page screenshot through the engine/proxy ladder.
pub async fn screenshot(scraper: &Scraper, url: &str) -> Result<Vec<u8>, ScrapeError> {
    let rungs = ladder_plan(scraper)
        .into_iter()
        .map(|(engine, use_proxy, name)| {
            let opts = rung_options(scraper, engine, use_proxy, None);
            Rung::new(
                name,
                Box::pin(fetch_page_screenshot(scraper.pool(), url, opts)),
            )
        })
        .collect();
    run_ladder("screenshot", url, rungs, RUNG_DELAY).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::browser::{BrowserPool, BrowserPoolConfig};
    use crate::scrape::ScrapeConfig;

    fn scraper_with_proxy(proxy: Option<&str>) -> Scraper {
        let pool_config = BrowserPoolConfig {
            proxy: proxy.map(String::from),
            ..Default::default()
        };
        Scraper::new(
            ScrapeConfig::default(),
            Arc::new(BrowserPool::new(pool_config)),
        )
    }

    #[test]
    fn test_proxy_rungs_skipped_without_proxy() {
        let scraper = scraper_with_proxy(None);
        let names: Vec<&str> = ladder_plan(&scraper)
            .into_iter()
            .map(|(_, _, name)| name)
            .collect();
        assert_eq!(names, vec!["firefox-no-proxy", "chromium-no-proxy"]);
    }

    #[test]
    fn test_full_ladder_with_proxy_configured() {
        let scraper = scraper_with_proxy(Some("socks5://127.0.0.1:1080"));
        let names: Vec<&str> = ladder_plan(&scraper)
            .into_iter()
            .map(|(_, _, name)| name)
            .collect();
        assert_eq!(
            names,
            vec![
                "firefox-no-proxy",
                "firefox-proxy",
                "chromium-proxy",
                "chromium-no-proxy"
            ]
        );
    }
}
