//! Headless-browser fetch strategy.
//!
//! Runs against the shared [`BrowserPool`]: every call opens a disposable
//! browser context (isolated cookies/storage, optionally routed through a
//! proxy) on a pooled engine, never a new browser process. Known intrusive
//! DOM elements are stripped before extraction, and bot-protection
//! interstitials fail explicitly so the ladder can move on.

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use tracing::{debug, warn};

use crate::browser::{BrowserEngine, BrowserHandle, BrowserPool};

use super::ScrapeError;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Intrusive elements stripped before extraction: cookie banners, consent
/// walls, login nags, chat widgets.
const INTRUSIVE_SELECTORS: &[&str] = &[
    "#onetrust-consent-sdk",
    "#cookie-banner",
    "#cookie-notice",
    ".cookie-consent",
    ".cookie-banner",
    ".cc-window",
    "#credential_picker_container",
    "#credentials-picker-container",
    ".login-modal",
    ".signup-modal",
    ".modal-backdrop",
    "#gdpr-consent-tool-wrapper",
    ".fb_dialog",
    "#intercom-container",
    ".intercom-lightweight-app",
];

/// Markers of bot-protection interstitials. A page containing one of these
/// is a block, not content.
const BOT_PROTECTION_MARKERS: &[&str] = &[
    "Just a moment...",
    "Checking your browser before accessing",
    "cf-browser-verification",
    "Attention Required! | Cloudflare",
    "Pardon Our Interruption",
    "Access to this page has been denied",
    "Please verify you are a human",
];

/// How a CSS selector scopes extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectorMode {
    /// Outer HTML of the first match.
    #[default]
    First,
    /// Outer HTML of every match, newline-joined.
    All,
}

/// Options for one browser fetch.
#[derive(Debug, Clone)]
pub struct BrowserFetchOptions {
    pub engine: BrowserEngine,
    pub use_proxy: bool,
    pub selector: Option<String>,
    pub mode: SelectorMode,
    pub settle_delay_ms: u64,
}

impl Default for BrowserFetchOptions {
    fn default() -> Self {
        Self {
            engine: BrowserEngine::Firefox,
            use_proxy: false,
            selector: None,
            mode: SelectorMode::First,
            settle_delay_ms: 1000,
        }
    }
}

/// A navigated page inside a disposable browser context.
struct PageSession {
    browser: BrowserHandle,
    page: Page,
    context_id: Option<BrowserContextId>,
    url: String,
}

impl PageSession {
    /// Open a fresh context on the pooled engine, navigate, wait for
    /// readiness, strip intrusive elements, and check for bot protection.
    async fn open(
        pool: &Arc<BrowserPool>,
        url: &str,
        options: &BrowserFetchOptions,
    ) -> Result<Self, ScrapeError> {
        let handle = pool
            .get(options.engine)
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        let proxy = pool.config().proxy.clone();
        let navigation_timeout = Duration::from_secs(pool.config().navigation_timeout_secs);

        let (page, context_id) = {
            let browser = handle.lock().await;

            // Proxy rungs route the whole context through the configured proxy
            let context_id = if options.use_proxy {
                let proxy = proxy.ok_or_else(|| {
                    ScrapeError::Browser("proxy rung requested but no proxy configured".to_string())
                })?;
                let params = CreateBrowserContextParams::builder()
                    .proxy_server(proxy)
                    .build();
                Some(
                    browser
                        .create_browser_context(params)
                        .await
                        .map_err(|e| ScrapeError::Browser(e.to_string()))?,
                )
            } else {
                None
            };

            let mut target = CreateTargetParams::builder().url("about:blank");
            if let Some(ref id) = context_id {
                target = target.browser_context_id(id.clone());
            }

            // Dispose the context on any failure past this point, or it
            // lingers in the long-lived pooled browser
            let page = match target.build() {
                Ok(params) => browser
                    .new_page(params)
                    .await
                    .map_err(|e| ScrapeError::Browser(e.to_string())),
                Err(e) => Err(ScrapeError::Browser(e)),
            };
            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    if let Some(id) = context_id {
                        if let Err(de) = browser.dispose_browser_context(id).await {
                            debug!("Failed to dispose browser context: {}", de);
                        }
                    }
                    return Err(e);
                }
            };

            (page, context_id)
        };

        let session = Self {
            browser: handle,
            page,
            context_id,
            url: url.to_string(),
        };

        if let Err(e) = session.navigate(navigation_timeout, options).await {
            session.close().await;
            return Err(e);
        }

        Ok(session)
    }

    async fn navigate(
        &self,
        timeout: Duration,
        options: &BrowserFetchOptions,
    ) -> Result<(), ScrapeError> {
        // Realistic fingerprint before any navigation
        self.page
            .execute(SetUserAgentOverrideParams::new(USER_AGENT.to_string()))
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(1920, 1080, 1.0, false))
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        debug!("{}: navigating to {}", options.engine, self.url);
        tokio::time::timeout(timeout, self.page.goto(self.url.clone()))
            .await
            .map_err(|_| {
                ScrapeError::Browser(format!("navigation timed out for {}", self.url))
            })?
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        // domcontentloaded-equivalent readiness wait
        let ready_script = r#"
            new Promise((resolve) => {
                if (document.readyState === 'complete' || document.readyState === 'interactive') {
                    resolve(document.readyState);
                } else {
                    document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
                    setTimeout(() => resolve('timeout'), 10000);
                }
            })
        "#;
        match tokio::time::timeout(timeout, self.page.evaluate(ready_script)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!("Could not check ready state for {}: {}", self.url, e),
            Err(_) => warn!("Timeout waiting for page ready state at {}", self.url),
        }

        // Let async content settle
        if options.settle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(options.settle_delay_ms)).await;
        }

        self.strip_intrusive_elements().await;
        self.check_bot_protection().await?;

        Ok(())
    }

    /// Remove known cookie banners, login modals, and chat widgets.
    async fn strip_intrusive_elements(&self) {
        let selectors = INTRUSIVE_SELECTORS.join(", ");
        let script = format!(
            r#"document.querySelectorAll({selectors:?}).forEach((el) => el.remove());"#
        );
        if let Err(e) = self.page.evaluate(script).await {
            debug!("Could not strip intrusive elements at {}: {}", self.url, e);
        }
    }

    /// Fail explicitly when the page is a bot-protection interstitial.
    async fn check_bot_protection(&self) -> Result<(), ScrapeError> {
        let content = self
            .page
            .content()
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        for marker in BOT_PROTECTION_MARKERS {
            if content.contains(marker) {
                return Err(ScrapeError::BotProtection {
                    url: self.url.clone(),
                });
            }
        }
        Ok(())
    }

    /// Full page HTML, or outer HTML scoped to a selector.
    async fn extract_html(
        &self,
        selector: Option<&str>,
        mode: SelectorMode,
    ) -> Result<String, ScrapeError> {
        match selector {
            None => self
                .page
                .content()
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string())),
            Some(sel) => {
                let script = match mode {
                    SelectorMode::First => format!(
                        r#"(() => {{
                            const el = document.querySelector({sel:?});
                            return el ? el.outerHTML : '';
                        }})()"#
                    ),
                    SelectorMode::All => format!(
                        r#"Array.from(document.querySelectorAll({sel:?}))
                            .map((el) => el.outerHTML)
                            .join('\n')"#
                    ),
                };
                let html: String = self
                    .page
                    .evaluate(script)
                    .await
                    .map_err(|e| ScrapeError::Browser(e.to_string()))?
                    .into_value()
                    .map_err(|e| ScrapeError::Browser(e.to_string()))?;

                if html.trim().is_empty() {
                    return Err(ScrapeError::SelectorNotFound {
                        selector: sel.to_string(),
                        url: self.url.clone(),
                    });
                }
                Ok(html)
            }
        }
    }

    /// Every `<img src>` on the page, unfiltered.
    async fn extract_image_urls(&self) -> Result<Vec<String>, ScrapeError> {
        let script = r#"Array.from(document.images).map((img) => img.src)"#;
        self.page
            .evaluate(script)
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?
            .into_value()
            .map_err(|e| ScrapeError::Browser(e.to_string()))
    }

    /// Full-page PNG screenshot.
    async fn capture_screenshot(&self) -> Result<Vec<u8>, ScrapeError> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))
    }

    /// Close the page and dispose the context; the pooled browser survives.
    async fn close(self) {
        let _ = self.page.close().await;
        if let Some(id) = self.context_id {
            let browser = self.browser.lock().await;
            if let Err(e) = browser.dispose_browser_context(id).await {
                debug!("Failed to dispose browser context: {}", e);
            }
        }
    }
}

/// Fetch page HTML via the pooled browser, optionally selector-scoped.
pub async fn fetch_page_html(
    pool: &Arc<BrowserPool>,
    url: &str,
    options: BrowserFetchOptions,
) -> Result<String, ScrapeError> {
    let session = PageSession::open(pool, url, &options).await?;
    let result = session
        .extract_html(options.selector.as_deref(), options.mode)
        .await;
    session.close().await;
    result
}

/// Collect image URLs via the pooled browser. Only sources starting with
/// `http` or `data:image` are kept; everything else is silently dropped.
pub async fn fetch_page_images(
    pool: &Arc<BrowserPool>,
    url: &str,
    options: BrowserFetchOptions,
) -> Result<Vec<String>, ScrapeError> {
    let session = PageSession::open(pool, url, &options).await?;
    let result = session.extract_image_urls().await;
    session.close().await;

    Ok(filter_image_urls(result?))
}

/// Capture a full-page screenshot via the pooled browser.
pub async fn fetch_page_screenshot(
    pool: &Arc<BrowserPool>,
    url: &str,
    options: BrowserFetchOptions,
) -> Result<Vec<u8>, ScrapeError> {
    let session = PageSession::open(pool, url, &options).await?;
    let result = session.capture_screenshot().await;
    session.close().await;
    result
}

pub(crate) fn filter_image_urls(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .filter(|src| src.starts_with("http") || src.starts_with("data:image"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_image_urls_keeps_http_and_data() {
        let urls = vec![
            "https://example.com/a.png".to_string(),
            "data:image/png;base64,AAAA".to_string(),
            "blob:https://example.com/xyz".to_string(),
            "file:///tmp/x.png".to_string(),
            "/relative/path.png".to_string(),
        ];
        let kept = filter_image_urls(urls);
        assert_eq!(
            kept,
            vec![
                "https://example.com/a.png".to_string(),
                "data:image/png;base64,AAAA".to_string(),
            ]
        );
    }

    #[test]
    fn test_bot_protection_markers_are_lowercase_free() {
        // Marker matching is exact substring match on raw HTML
        assert!(BOT_PROTECTION_MARKERS
            .iter()
            .all(|m| !m.trim().is_empty()));
    }
}
