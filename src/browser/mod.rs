//! Long-lived browser pool.
//!
//! Holds at most one headless Firefox and one headless Chromium instance
//! for the whole process, amortizing launch cost across every scrape and
//! screenshot call. Individual calls open disposable browser *contexts*
//! (pages) on a pooled instance; the underlying processes are only torn
//! down on shutdown.

mod pool;

pub use pool::{BrowserHandle, BrowserPool, EngineSlots};

use serde::{Deserialize, Serialize};

/// Browser engines the pool can hold, one live instance each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserEngine {
    Firefox,
    Chromium,
}

impl BrowserEngine {
    /// Well-known executable locations checked before falling back to $PATH.
    pub fn executable_candidates(self) -> &'static [&'static str] {
        match self {
            BrowserEngine::Firefox => &[
                "/usr/bin/firefox",
                "/usr/bin/firefox-esr",
                "/snap/bin/firefox",
                "/Applications/Firefox.app/Contents/MacOS/firefox",
            ],
            BrowserEngine::Chromium => &[
                "/usr/bin/google-chrome",
                "/usr/bin/google-chrome-stable",
                "/usr/bin/chromium",
                "/usr/bin/chromium-browser",
                "/snap/bin/chromium",
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                "/Applications/Chromium.app/Contents/MacOS/Chromium",
                "/opt/google/chrome/google-chrome",
            ],
        }
    }

    /// Command names to try in $PATH.
    pub fn path_commands(self) -> &'static [&'static str] {
        match self {
            BrowserEngine::Firefox => &["firefox", "firefox-esr"],
            BrowserEngine::Chromium => &[
                "google-chrome",
                "google-chrome-stable",
                "chromium",
                "chromium-browser",
            ],
        }
    }
}

impl std::fmt::Display for BrowserEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrowserEngine::Firefox => write!(f, "firefox"),
            BrowserEngine::Chromium => write!(f, "chromium"),
        }
    }
}

/// Browser pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserPoolConfig {
    /// Run browsers headless (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL used by proxy ladder rungs
    /// (e.g. "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Explicit Firefox executable, overriding discovery.
    #[serde(default)]
    pub firefox_executable: Option<String>,

    /// Explicit Chromium executable, overriding discovery.
    #[serde(default)]
    pub chromium_executable: Option<String>,

    /// Page navigation timeout in seconds.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Additional browser arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_headless() -> bool {
    true
}

fn default_navigation_timeout() -> u64 {
    60
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            proxy: None,
            firefox_executable: None,
            chromium_executable: None,
            navigation_timeout_secs: default_navigation_timeout(),
            extra_args: Vec::new(),
        }
    }
}

impl BrowserPoolConfig {
    /// Configured executable override for an engine, if any.
    pub fn executable_override(&self, engine: BrowserEngine) -> Option<&str> {
        match engine {
            BrowserEngine::Firefox => self.firefox_executable.as_deref(),
            BrowserEngine::Chromium => self.chromium_executable.as_deref(),
        }
    }
}
