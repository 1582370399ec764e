//! Configuration management for ReviewWeb.
//!
//! Configuration is loaded from an optional TOML file, with secrets
//! overridable through `REVIEWWEB_*` environment variables so API keys
//! never have to live on disk.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ai::AiConfig;
use crate::browser::BrowserPoolConfig;
use crate::scrape::ScrapeConfig;
use crate::review::ReviewDefaults;

/// Top-level configuration for the review engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewWebConfig {
    /// Scraping strategy configuration (timeouts, provider credentials).
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Browser pool configuration (executables, proxy, headless).
    #[serde(default)]
    pub browser: BrowserPoolConfig,

    /// AI gateway configuration (endpoint, key, model tiers).
    #[serde(default)]
    pub ai: AiConfig,

    /// Default review orchestration options.
    #[serde(default)]
    pub review: ReviewDefaults,
}

impl ReviewWebConfig {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from the given path if it exists, otherwise defaults.
    /// Environment overrides apply either way.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            _ => {
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// Override secrets and endpoints from environment variables.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("REVIEWWEB_AI_API_KEY") {
            self.ai.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("REVIEWWEB_AI_BASE_URL") {
            self.ai.base_url = v;
        }
        if let Ok(v) = std::env::var("REVIEWWEB_SCRAPEDO_TOKEN") {
            self.scrape.scrapedo_token = Some(v);
        }
        if let Ok(v) = std::env::var("REVIEWWEB_RAPIDAPI_KEY") {
            self.scrape.rapidapi_key = Some(v);
        }
        if let Ok(v) = std::env::var("REVIEWWEB_FIRECRAWL_KEY") {
            self.scrape.firecrawl_key = Some(v);
        }
        if let Ok(v) = std::env::var("REVIEWWEB_PROXY") {
            self.browser.proxy = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ReviewWebConfig::default();
        assert!(config.scrape.scrapedo_token.is_none());
        assert!(config.ai.api_key.is_none());
        assert_eq!(config.scrape.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[scrape]
timeout_secs = 10
scrapedo_token = "tok"

[ai]
base_url = "https://ai.example.com/v1"
"#
        )
        .unwrap();

        let config = ReviewWebConfig::load(file.path()).unwrap();
        assert_eq!(config.scrape.timeout_secs, 10);
        assert_eq!(config.scrape.scrapedo_token.as_deref(), Some("tok"));
        assert_eq!(config.ai.base_url, "https://ai.example.com/v1");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config =
            ReviewWebConfig::load_or_default(Some(Path::new("/nonexistent/reviewweb.toml")))
                .unwrap();
        assert_eq!(config.scrape.timeout_secs, 30);
    }
}
