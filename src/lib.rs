//! ReviewWeb - URL review and content-safety analysis engine.
//!
//! Scrapes submitted URLs through a tiered fallback pipeline (direct HTTP,
//! pooled headless browsers, external rendering providers), runs multi-modal
//! AI analysis over the results, and aggregates everything into a review
//! record with partial-failure tolerance.

pub mod ai;
pub mod browser;
pub mod cli;
pub mod config;
pub mod review;
pub mod scrape;
pub mod utils;

pub use ai::{AiClient, AiError, ChatBackend};
pub use browser::{BrowserEngine, BrowserPool};
pub use config::ReviewWebConfig;
pub use review::{ReviewInput, ReviewOptions, ReviewRecord, ReviewService, ReviewStatus};
pub use scrape::{ScrapeError, ScrapeOptions, Scraper};
