//! AI analysis seam and its gateway-backed implementation.
//!
//! Each analysis sends a prompt (plus screenshot bytes for the visual
//! ones) through the chat backend, repairs the reply into valid JSON, and
//! deserializes it into the typed shape for that analysis.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::ai::schema::{HtmlAnalysis, ImageAnalysis, LinkAnalysis, ScreenshotAnalysis};
use crate::ai::{
    repair_json, AiConfig, AiMessage, AiRequest, ChatBackend, JsonRepairOptions,
};
use crate::scrape::PageMetadata;
use crate::utils::truncate_utf8;

use super::ReviewError;

/// Maximum HTML bytes folded into an analysis prompt.
const MAX_HTML_PROMPT_BYTES: usize = 48_000;

const HTML_SYSTEM_PROMPT: &str = "You review web pages for content quality and safety. \
     Respond with ONLY a JSON object with keys: summary (string), category (string), \
     language (string or null), keywords (array of strings), safety (object with score \
     0-100 and flags array of strings). No markdown, no code fences.";

const SCREENSHOT_SYSTEM_PROMPT: &str = "You review website screenshots. Respond with ONLY a \
     JSON object with keys: description (string), design_quality (string or null), safety \
     (object with score 0-100 and flags array of strings). No markdown, no code fences.";

const IMAGE_SYSTEM_PROMPT: &str = "You review individual web images for safety. Respond with \
     ONLY a JSON object with keys: url (string), description (string), safety (object with \
     score 0-100 and flags array of strings). No markdown, no code fences.";

const LINK_SYSTEM_PROMPT: &str = "You assess outbound links for risk. Respond with ONLY a \
     JSON object with keys: url (string), risk (one of low, medium, high), reason (string). \
     No markdown, no code fences.";

/// AI analyses consumed by the review orchestrator.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Full-page content/safety analysis over HTML and metadata.
    async fn analyze_html(
        &self,
        url: &str,
        html: &str,
        metadata: &PageMetadata,
        instructions: Option<&str>,
    ) -> Result<HtmlAnalysis, ReviewError>;

    /// Visual analysis of a full-page screenshot.
    async fn analyze_screenshot(
        &self,
        url: &str,
        png: &[u8],
    ) -> Result<ScreenshotAnalysis, ReviewError>;

    /// Analysis of one extracted image by URL.
    async fn analyze_image(&self, image_url: &str) -> Result<ImageAnalysis, ReviewError>;

    /// Risk assessment of one outbound link.
    async fn analyze_link(&self, link_url: &str) -> Result<LinkAnalysis, ReviewError>;
}

/// Analyzer backed by the AI gateway with JSON repair.
pub struct AiAnalyzer {
    backend: Arc<dyn ChatBackend>,
    config: AiConfig,
    repair: JsonRepairOptions,
}

impl AiAnalyzer {
    pub fn new(backend: Arc<dyn ChatBackend>, config: AiConfig) -> Self {
        Self {
            backend,
            config,
            repair: JsonRepairOptions::default(),
        }
    }

    /// Run a request, repair the reply into JSON, and parse the target shape.
    async fn request_typed<T: DeserializeOwned>(
        &self,
        request: AiRequest,
    ) -> Result<T, ReviewError> {
        let response = self.backend.chat(request).await?;
        let content = response.first_content()?;
        let value = repair_json(
            self.backend.as_ref(),
            &self.config.tiers,
            content,
            &self.repair,
        )
        .await?;
        serde_json::from_value(value)
            .map_err(|e| ReviewError::Ai(crate::ai::AiError::InvalidResponse(e.to_string())))
    }
}

#[async_trait]
impl Analyzer for AiAnalyzer {
    async fn analyze_html(
        &self,
        url: &str,
        html: &str,
        metadata: &PageMetadata,
        instructions: Option<&str>,
    ) -> Result<HtmlAnalysis, ReviewError> {
        debug!("Analyzing page content for {}", url);

        let mut prompt = format!(
            "URL: {url}\nTitle: {}\nDescription: {}\n",
            metadata.title.as_deref().unwrap_or("(none)"),
            metadata.description.as_deref().unwrap_or("(none)"),
        );
        if let Some(extra) = instructions {
            prompt.push_str(&format!("Reviewer instructions: {extra}\n"));
        }
        prompt.push_str("\nPage HTML:\n");
        prompt.push_str(truncate_utf8(html, MAX_HTML_PROMPT_BYTES));

        let request = AiRequest::new(vec![
            AiMessage::system(HTML_SYSTEM_PROMPT),
            AiMessage::user(prompt),
        ]);

        let mut analysis: HtmlAnalysis = self.request_typed(request).await?;
        analysis.safety.normalize();
        Ok(analysis)
    }

    async fn analyze_screenshot(
        &self,
        url: &str,
        png: &[u8],
    ) -> Result<ScreenshotAnalysis, ReviewError> {
        debug!("Analyzing screenshot for {} ({} bytes)", url, png.len());

        let data_url = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        );
        let request = AiRequest::new(vec![
            AiMessage::system(SCREENSHOT_SYSTEM_PROMPT),
            AiMessage::user_with_image(format!("Screenshot of {url}"), data_url),
        ])
        .with_model(&self.config.vision_model);

        let mut analysis: ScreenshotAnalysis = self.request_typed(request).await?;
        analysis.safety.normalize();
        Ok(analysis)
    }

    async fn analyze_image(&self, image_url: &str) -> Result<ImageAnalysis, ReviewError> {
        debug!("Analyzing image {}", image_url);

        let request = AiRequest::new(vec![
            AiMessage::system(IMAGE_SYSTEM_PROMPT),
            AiMessage::user_with_image(format!("Image at {image_url}"), image_url),
        ])
        .with_model(&self.config.vision_model);

        let mut analysis: ImageAnalysis = self.request_typed(request).await?;
        if analysis.url.is_empty() {
            analysis.url = image_url.to_string();
        }
        analysis.safety.normalize();
        Ok(analysis)
    }

    async fn analyze_link(&self, link_url: &str) -> Result<LinkAnalysis, ReviewError> {
        debug!("Analyzing link {}", link_url);

        let request = AiRequest::new(vec![
            AiMessage::system(LINK_SYSTEM_PROMPT),
            AiMessage::user(format!("Assess this outbound link: {link_url}")),
        ]);

        let mut analysis: LinkAnalysis = self.request_typed(request).await?;
        if analysis.url.is_empty() {
            analysis.url = link_url.to_string();
        }
        Ok(analysis)
    }
}
