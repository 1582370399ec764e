//! Review records and orchestration options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::schema::{HtmlAnalysis, ImageAnalysis, LinkAnalysis, ScreenshotAnalysis};

/// Lifecycle of a review: PENDING transitions exactly once to a terminal
/// state, COMPLETED or FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    Completed,
    Failed,
}

/// A review submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewInput {
    pub url: String,
    pub user_id: String,
    /// Extra reviewer instructions folded into the page analysis prompt.
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Per-review orchestration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOptions {
    #[serde(default)]
    pub skip_image_extraction: bool,

    #[serde(default)]
    pub skip_link_extraction: bool,

    #[serde(default = "default_max_images")]
    pub max_extracted_images: usize,

    #[serde(default = "default_max_links")]
    pub max_extracted_links: usize,

    /// Record a failed image analysis as absent and keep going (default),
    /// or abort the whole review on the first failure.
    #[serde(default = "default_true")]
    pub continue_on_image_analysis_error: bool,

    /// Same policy for link analyses.
    #[serde(default = "default_true")]
    pub continue_on_link_analysis_error: bool,
}

fn default_max_images() -> usize {
    10
}

fn default_max_links() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self {
            skip_image_extraction: false,
            skip_link_extraction: false,
            max_extracted_images: default_max_images(),
            max_extracted_links: default_max_links(),
            continue_on_image_analysis_error: true,
            continue_on_link_analysis_error: true,
        }
    }
}

/// Configured defaults feeding [`ReviewOptions`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDefaults {
    #[serde(default = "default_max_images")]
    pub max_extracted_images: usize,
    #[serde(default = "default_max_links")]
    pub max_extracted_links: usize,
}

impl Default for ReviewDefaults {
    fn default() -> Self {
        Self {
            max_extracted_images: default_max_images(),
            max_extracted_links: default_max_links(),
        }
    }
}

impl ReviewDefaults {
    pub fn options(&self) -> ReviewOptions {
        ReviewOptions {
            max_extracted_images: self.max_extracted_images,
            max_extracted_links: self.max_extracted_links,
            ..ReviewOptions::default()
        }
    }
}

/// Aggregated AI analysis. On a COMPLETED review every field is present;
/// the arrays may be empty but never absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub html: HtmlAnalysis,
    pub screenshot: ScreenshotAnalysis,
    pub images: Vec<ImageAnalysis>,
    pub links: Vec<LinkAnalysis>,
}

/// A persisted review row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: String,
    pub url: String,
    pub user_id: String,
    pub status: ReviewStatus,
    #[serde(default)]
    pub ai_analysis: Option<AiAnalysis>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied on terminal transition.
#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub status: Option<ReviewStatus>,
    pub ai_analysis: Option<AiAnalysis>,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ReviewStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&ReviewStatus::Completed).unwrap(),
            "\"COMPLETED\""
        );
    }

    #[test]
    fn test_default_options() {
        let options = ReviewOptions::default();
        assert!(!options.skip_image_extraction);
        assert!(options.continue_on_image_analysis_error);
        assert_eq!(options.max_extracted_images, 10);
    }

    #[test]
    fn test_completed_analysis_always_has_all_fields() {
        let analysis = AiAnalysis::default();
        let json = serde_json::to_value(&analysis).unwrap();
        assert!(json.get("html").is_some());
        assert!(json.get("screenshot").is_some());
        assert!(json["images"].is_array());
        assert!(json["links"].is_array());
    }
}
