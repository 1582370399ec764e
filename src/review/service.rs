//! Review orchestrator.
//!
//! One multi-stage pipeline per submitted URL: extraction, required page
//! and screenshot analyses, parallel per-item analyses, aggregation. The
//! review row moves PENDING to COMPLETED or FAILED exactly once; any error
//! escaping a required stage marks the row FAILED and is re-thrown to the
//! caller.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::analysis::Analyzer;
use super::source::PageSource;
use super::store::ReviewStore;
use super::types::{AiAnalysis, ReviewInput, ReviewOptions, ReviewPatch, ReviewRecord, ReviewStatus};
use super::ReviewError;

/// Orchestrates scraping, analysis, and persistence for one review.
pub struct ReviewService {
    source: Arc<dyn PageSource>,
    analyzer: Arc<dyn Analyzer>,
    store: Arc<dyn ReviewStore>,
}

impl ReviewService {
    pub fn new(
        source: Arc<dyn PageSource>,
        analyzer: Arc<dyn Analyzer>,
        store: Arc<dyn ReviewStore>,
    ) -> Self {
        Self {
            source,
            analyzer,
            store,
        }
    }

    /// Run the full review pipeline for a URL.
    ///
    /// On success the returned record is COMPLETED with every
    /// `ai_analysis` field populated (arrays possibly empty). On failure
    /// the record is marked FAILED with the error message and the error is
    /// returned to the caller.
    pub async fn start_review(
        &self,
        input: ReviewInput,
        options: ReviewOptions,
    ) -> Result<ReviewRecord, ReviewError> {
        let record = self.store.create_review(&input).await?;
        info!("Review {} started for {}", record.id, input.url);

        match self.run_pipeline(&input, &options).await {
            Ok(analysis) => {
                let updated = self
                    .store
                    .update_review(
                        &record.id,
                        ReviewPatch {
                            status: Some(ReviewStatus::Completed),
                            ai_analysis: Some(analysis),
                            error_message: None,
                        },
                    )
                    .await?;
                info!("Review {} completed", record.id);
                Ok(updated)
            }
            Err(e) => {
                warn!("Review {} failed: {}", record.id, e);
                // Best-effort terminal transition; the original error wins
                let _ = self
                    .store
                    .update_review(
                        &record.id,
                        ReviewPatch {
                            status: Some(ReviewStatus::Failed),
                            ai_analysis: None,
                            error_message: Some(e.to_string()),
                        },
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        input: &ReviewInput,
        options: &ReviewOptions,
    ) -> Result<AiAnalysis, ReviewError> {
        let url = input.url.as_str();

        // Extraction stages degrade to empty lists on failure
        let image_urls = if options.skip_image_extraction {
            debug!("Skipping image extraction for {}", url);
            Vec::new()
        } else {
            match self.source.images(url, options.max_extracted_images).await {
                Ok(images) => images,
                Err(e) => {
                    warn!("Image extraction failed for {}: {}", url, e);
                    Vec::new()
                }
            }
        };

        let link_urls = if options.skip_link_extraction {
            debug!("Skipping link extraction for {}", url);
            Vec::new()
        } else {
            match self.source.links(url, options.max_extracted_links).await {
                Ok(links) => links,
                Err(e) => {
                    warn!("Link extraction failed for {}: {}", url, e);
                    Vec::new()
                }
            }
        };

        // Metadata and the page/screenshot analyses are required: failures
        // propagate and fail the review
        let metadata = self.source.metadata(url).await?;

        let html = self.source.html(url).await?;
        let html_analysis = self
            .analyzer
            .analyze_html(url, &html, &metadata, input.instructions.as_deref())
            .await?;

        let png = self.source.screenshot(url).await?;
        let screenshot_analysis = self.analyzer.analyze_screenshot(url, &png).await?;

        // Per-item analyses fan out in parallel; result order follows
        // input order
        let image_results = join_all(
            image_urls
                .iter()
                .map(|image_url| self.analyzer.analyze_image(image_url)),
        )
        .await;
        let images = collect_item_results(
            image_results,
            &image_urls,
            options.continue_on_image_analysis_error,
            |url, message| ReviewError::ImageAnalysis { url, message },
        )?;

        let link_results = join_all(
            link_urls
                .iter()
                .map(|link_url| self.analyzer.analyze_link(link_url)),
        )
        .await;
        let links = collect_item_results(
            link_results,
            &link_urls,
            options.continue_on_link_analysis_error,
            |url, message| ReviewError::LinkAnalysis { url, message },
        )?;

        Ok(AiAnalysis {
            html: html_analysis,
            screenshot: screenshot_analysis,
            images,
            links,
        })
    }
}

/// Apply the per-item failure policy: keep successes in input order, drop
/// failures when continuing, or abort on the first failure otherwise.
fn collect_item_results<T>(
    results: Vec<Result<T, ReviewError>>,
    urls: &[String],
    continue_on_error: bool,
    make_error: impl Fn(String, String) -> ReviewError,
) -> Result<Vec<T>, ReviewError> {
    let mut kept = Vec::with_capacity(results.len());
    for (result, url) in results.into_iter().zip(urls) {
        match result {
            Ok(item) => kept.push(item),
            Err(e) if continue_on_error => {
                warn!("Analysis failed for {} (continuing): {}", url, e);
            }
            Err(e) => return Err(make_error(url.clone(), e.to_string())),
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;

    use crate::ai::schema::{HtmlAnalysis, ImageAnalysis, LinkAnalysis, ScreenshotAnalysis};
    use crate::ai::AiError;
    use crate::review::store::MemoryReviewStore;
    use crate::scrape::{PageMetadata, ScrapeError};

    /// Store wrapper remembering the last created review id, so tests can
    /// inspect the row after `start_review` returns an error.
    struct RecordingStore {
        inner: MemoryReviewStore,
        last_id: std::sync::Mutex<Option<String>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                inner: MemoryReviewStore::new(),
                last_id: std::sync::Mutex::new(None),
            }
        }

        fn last_id(&self) -> String {
            self.last_id.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl ReviewStore for RecordingStore {
        async fn create_review(&self, input: &ReviewInput) -> Result<ReviewRecord, ReviewError> {
            let record = self.inner.create_review(input).await?;
            *self.last_id.lock().unwrap() = Some(record.id.clone());
            Ok(record)
        }

        async fn update_review(
            &self,
            id: &str,
            patch: ReviewPatch,
        ) -> Result<ReviewRecord, ReviewError> {
            self.inner.update_review(id, patch).await
        }

        async fn get_review(&self, id: &str) -> Result<ReviewRecord, ReviewError> {
            self.inner.get_review(id).await
        }
    }

    struct FakeSource {
        images: Vec<String>,
        links: Vec<String>,
        fail_images: bool,
    }

    impl FakeSource {
        fn new(images: Vec<&str>, links: Vec<&str>) -> Self {
            Self {
                images: images.into_iter().map(String::from).collect(),
                links: links.into_iter().map(String::from).collect(),
                fail_images: false,
            }
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn html(&self, _url: &str) -> Result<String, ScrapeError> {
            Ok("<html><body>hello</body></html>".to_string())
        }

        async fn images(&self, _url: &str, max: usize) -> Result<Vec<String>, ScrapeError> {
            if self.fail_images {
                return Err(ScrapeError::EmptyContent {
                    strategy: "test".to_string(),
                });
            }
            Ok(self.images.iter().take(max).cloned().collect())
        }

        async fn links(&self, _url: &str, max: usize) -> Result<Vec<String>, ScrapeError> {
            Ok(self.links.iter().take(max).cloned().collect())
        }

        async fn screenshot(&self, _url: &str) -> Result<Vec<u8>, ScrapeError> {
            Ok(vec![0x89, 0x50, 0x4e, 0x47])
        }

        async fn metadata(&self, _url: &str) -> Result<PageMetadata, ScrapeError> {
            Ok(PageMetadata::default())
        }
    }

    /// Analyzer failing for a configured set of item URLs, and optionally
    /// for the whole-page analysis.
    struct FakeAnalyzer {
        failing_items: HashSet<String>,
        fail_html: bool,
    }

    impl FakeAnalyzer {
        fn new() -> Self {
            Self {
                failing_items: HashSet::new(),
                fail_html: false,
            }
        }

        fn failing(mut self, url: &str) -> Self {
            self.failing_items.insert(url.to_string());
            self
        }
    }

    #[async_trait]
    impl Analyzer for FakeAnalyzer {
        async fn analyze_html(
            &self,
            _url: &str,
            _html: &str,
            _metadata: &PageMetadata,
            _instructions: Option<&str>,
        ) -> Result<HtmlAnalysis, ReviewError> {
            if self.fail_html {
                return Err(ReviewError::Ai(AiError::MissingContent));
            }
            Ok(HtmlAnalysis {
                summary: "A test page.".to_string(),
                ..Default::default()
            })
        }

        async fn analyze_screenshot(
            &self,
            _url: &str,
            _png: &[u8],
        ) -> Result<ScreenshotAnalysis, ReviewError> {
            Ok(ScreenshotAnalysis {
                description: "A screenshot.".to_string(),
                ..Default::default()
            })
        }

        async fn analyze_image(&self, image_url: &str) -> Result<ImageAnalysis, ReviewError> {
            if self.failing_items.contains(image_url) {
                return Err(ReviewError::Ai(AiError::MissingContent));
            }
            Ok(ImageAnalysis {
                url: image_url.to_string(),
                ..Default::default()
            })
        }

        async fn analyze_link(&self, link_url: &str) -> Result<LinkAnalysis, ReviewError> {
            if self.failing_items.contains(link_url) {
                return Err(ReviewError::Ai(AiError::MissingContent));
            }
            Ok(LinkAnalysis {
                url: link_url.to_string(),
                risk: "low".to_string(),
                ..Default::default()
            })
        }
    }

    fn service(source: FakeSource, analyzer: FakeAnalyzer) -> (ReviewService, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::new());
        let service = ReviewService::new(
            Arc::new(source),
            Arc::new(analyzer),
            Arc::clone(&store) as Arc<dyn ReviewStore>,
        );
        (service, store)
    }

    fn input() -> ReviewInput {
        ReviewInput {
            url: "https://example.com".to_string(),
            user_id: "user-1".to_string(),
            instructions: None,
        }
    }

    #[tokio::test]
    async fn test_happy_path_completes_with_all_fields() {
        let (service, _) = service(
            FakeSource::new(vec!["https://example.com/a.png"], vec!["https://b.com/"]),
            FakeAnalyzer::new(),
        );

        let record = service
            .start_review(input(), ReviewOptions::default())
            .await
            .unwrap();

        assert_eq!(record.status, ReviewStatus::Completed);
        let analysis = record.ai_analysis.unwrap();
        assert_eq!(analysis.html.summary, "A test page.");
        assert_eq!(analysis.screenshot.description, "A screenshot.");
        assert_eq!(analysis.images.len(), 1);
        assert_eq!(analysis.links.len(), 1);
    }

    #[tokio::test]
    async fn test_skip_flags_yield_empty_arrays_with_populated_analyses() {
        let (service, _) = service(
            FakeSource::new(vec!["https://example.com/a.png"], vec!["https://b.com/"]),
            FakeAnalyzer::new(),
        );

        let record = service
            .start_review(
                input(),
                ReviewOptions {
                    skip_image_extraction: true,
                    skip_link_extraction: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let analysis = record.ai_analysis.unwrap();
        assert!(analysis.images.is_empty());
        assert!(analysis.links.is_empty());
        assert!(!analysis.html.summary.is_empty());
        assert!(!analysis.screenshot.description.is_empty());
    }

    #[tokio::test]
    async fn test_one_failed_image_is_dropped_when_continuing() {
        let (service, _) = service(
            FakeSource::new(
                vec![
                    "https://example.com/1.png",
                    "https://example.com/2.png",
                    "https://example.com/3.png",
                ],
                vec![],
            ),
            FakeAnalyzer::new().failing("https://example.com/2.png"),
        );

        let record = service
            .start_review(input(), ReviewOptions::default())
            .await
            .unwrap();

        assert_eq!(record.status, ReviewStatus::Completed);
        let analysis = record.ai_analysis.unwrap();
        assert_eq!(analysis.images.len(), 2);
        assert_eq!(analysis.images[0].url, "https://example.com/1.png");
        assert_eq!(analysis.images[1].url, "https://example.com/3.png");
    }

    #[tokio::test]
    async fn test_image_failure_aborts_when_not_continuing() {
        let (service, store) = service(
            FakeSource::new(
                vec!["https://example.com/1.png", "https://example.com/2.png"],
                vec![],
            ),
            FakeAnalyzer::new().failing("https://example.com/1.png"),
        );

        let err = service
            .start_review(
                input(),
                ReviewOptions {
                    continue_on_image_analysis_error: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ReviewError::ImageAnalysis { .. }));

        let failed = store.get_review(&store.last_id()).await.unwrap();
        assert_eq!(failed.status, ReviewStatus::Failed);
        assert!(failed.error_message.is_some());
        assert!(failed.ai_analysis.is_none());
    }

    #[tokio::test]
    async fn test_html_analysis_failure_fails_review() {
        let mut analyzer = FakeAnalyzer::new();
        analyzer.fail_html = true;
        let (service, store) = service(FakeSource::new(vec![], vec![]), analyzer);

        let err = service
            .start_review(input(), ReviewOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::Ai(_)));

        let failed = store.get_review(&store.last_id()).await.unwrap();
        assert_eq!(failed.status, ReviewStatus::Failed);
    }

    #[tokio::test]
    async fn test_extraction_failure_degrades_to_empty_list() {
        let mut source = FakeSource::new(vec!["https://example.com/a.png"], vec![]);
        source.fail_images = true;
        let (service, _) = service(source, FakeAnalyzer::new());

        let record = service
            .start_review(input(), ReviewOptions::default())
            .await
            .unwrap();

        assert_eq!(record.status, ReviewStatus::Completed);
        assert!(record.ai_analysis.unwrap().images.is_empty());
    }

    #[tokio::test]
    async fn test_extracted_images_are_capped() {
        let urls: Vec<String> = (0..20)
            .map(|i| format!("https://example.com/{i}.png"))
            .collect();
        let source = FakeSource {
            images: urls,
            links: Vec::new(),
            fail_images: false,
        };
        let (service, _) = service(source, FakeAnalyzer::new());

        let record = service
            .start_review(
                input(),
                ReviewOptions {
                    max_extracted_images: 5,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(record.ai_analysis.unwrap().images.len(), 5);
    }
}
