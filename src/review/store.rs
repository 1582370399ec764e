//! Review persistence seam.
//!
//! The orchestrator only needs create/update/get; the real storage engine
//! lives behind this trait. An in-memory store ships for tests and the
//! CLI's one-shot runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::types::{ReviewInput, ReviewPatch, ReviewRecord, ReviewStatus};
use super::ReviewError;

/// Persistence operations consumed by the review orchestrator.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Create a PENDING review row for the submission.
    async fn create_review(&self, input: &ReviewInput) -> Result<ReviewRecord, ReviewError>;

    /// Apply a partial update and return the updated row.
    async fn update_review(
        &self,
        id: &str,
        patch: ReviewPatch,
    ) -> Result<ReviewRecord, ReviewError>;

    /// Fetch a review by id.
    async fn get_review(&self, id: &str) -> Result<ReviewRecord, ReviewError>;
}

/// In-memory review store.
#[derive(Debug, Default)]
pub struct MemoryReviewStore {
    reviews: Mutex<HashMap<String, ReviewRecord>>,
}

impl MemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewStore for MemoryReviewStore {
    async fn create_review(&self, input: &ReviewInput) -> Result<ReviewRecord, ReviewError> {
        let now = Utc::now();
        let record = ReviewRecord {
            id: Uuid::new_v4().to_string(),
            url: input.url.clone(),
            user_id: input.user_id.clone(),
            status: ReviewStatus::Pending,
            ai_analysis: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.reviews
            .lock()
            .map_err(|e| ReviewError::Store(e.to_string()))?
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_review(
        &self,
        id: &str,
        patch: ReviewPatch,
    ) -> Result<ReviewRecord, ReviewError> {
        let mut reviews = self
            .reviews
            .lock()
            .map_err(|e| ReviewError::Store(e.to_string()))?;
        let record = reviews
            .get_mut(id)
            .ok_or_else(|| ReviewError::NotFound(id.to_string()))?;

        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(analysis) = patch.ai_analysis {
            record.ai_analysis = Some(analysis);
        }
        if let Some(message) = patch.error_message {
            record.error_message = Some(message);
        }
        record.updated_at = Utc::now();

        Ok(record.clone())
    }

    async fn get_review(&self, id: &str) -> Result<ReviewRecord, ReviewError> {
        self.reviews
            .lock()
            .map_err(|e| ReviewError::Store(e.to_string()))?
            .get(id)
            .cloned()
            .ok_or_else(|| ReviewError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ReviewInput {
        ReviewInput {
            url: "https://example.com".to_string(),
            user_id: "user-1".to_string(),
            instructions: None,
        }
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let store = MemoryReviewStore::new();
        let record = store.create_review(&input()).await.unwrap();
        assert_eq!(record.status, ReviewStatus::Pending);
        assert!(record.ai_analysis.is_none());
        assert!(record.error_message.is_none());
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let store = MemoryReviewStore::new();
        let record = store.create_review(&input()).await.unwrap();

        let updated = store
            .update_review(
                &record.id,
                ReviewPatch {
                    status: Some(ReviewStatus::Failed),
                    error_message: Some("boom".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, ReviewStatus::Failed);
        assert_eq!(updated.error_message.as_deref(), Some("boom"));

        let fetched = store.get_review(&record.id).await.unwrap();
        assert_eq!(fetched.status, ReviewStatus::Failed);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = MemoryReviewStore::new();
        assert!(matches!(
            store.get_review("missing").await,
            Err(ReviewError::NotFound(_))
        ));
    }
}
