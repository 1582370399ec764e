//! Review orchestration.
//!
//! `ReviewService::start_review` sequences scraping, multi-modal AI
//! analysis, and aggregation into a single review record, with per-stage
//! failure policies: extraction stages degrade to empty lists, page and
//! screenshot analyses are required, and per-item analyses are isolated
//! behind continue-on-error flags.

mod analysis;
mod service;
mod source;
mod store;
mod types;

pub use analysis::{AiAnalyzer, Analyzer};
pub use service::ReviewService;
pub use source::{PageSource, WebPageSource};
pub use store::{MemoryReviewStore, ReviewStore};
pub use types::{
    AiAnalysis, ReviewDefaults, ReviewInput, ReviewOptions, ReviewPatch, ReviewRecord,
    ReviewStatus,
};

use thiserror::Error;

use crate::ai::{AiError, JsonRepairError};
use crate::scrape::ScrapeError;

/// Errors from the review pipeline.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Repair(#[from] JsonRepairError),

    #[error("Image analysis failed for {url}: {message}")]
    ImageAnalysis { url: String, message: String },

    #[error("Link analysis failed for {url}: {message}")]
    LinkAnalysis { url: String, message: String },

    #[error("Review store error: {0}")]
    Store(String),

    #[error("Review {0} not found")]
    NotFound(String),
}
