use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::Error;
use crate::models::{BlacklistEntry, SentimentResult, normalize_handle};
use crate::services::blacklist_tracker::{BlacklistTracker, TrackOutcome};
use tweetwatch_common::traits::SentimentClassifier;

/// How the negative-count update went for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrackingStatus {
    Ignored,
    Recorded { entry: BlacklistEntry, escalated: bool },
    /// The store write failed; the sentiment result is still valid.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub author_handle: String,
    pub sentiment: SentimentResult,
    pub tracking: TrackingStatus,
}

/// Classifies a tweet, then feeds the label to the blacklist tracker.
pub struct SentimentService {
    classifier: Arc<dyn SentimentClassifier>,
    tracker: Arc<BlacklistTracker>,
}

impl SentimentService {
    pub fn new(classifier: Arc<dyn SentimentClassifier>, tracker: Arc<BlacklistTracker>) -> Self {
        Self { classifier, tracker }
    }

    pub fn tracker(&self) -> &Arc<BlacklistTracker> {
        &self.tracker
    }

    /// Classification alone, without touching any blacklist state.
    pub async fn classify(&self, text: &str) -> Result<SentimentResult, Error> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("tweet text is empty".into()));
        }
        self.classifier.classify(text).await.map_err(|e| match e {
            Error::Classification(_) => e,
            other => Error::Classification(other.to_string()),
        })
    }

    /// Classifies `text` and records it against `author_handle` for `owner_id`.
    ///
    /// A classifier failure is an error and leaves the store untouched. A store
    /// failure is reported inside the report so the sentiment still reaches the caller.
    pub async fn analyze(
        &self,
        owner_id: Uuid,
        author_handle: &str,
        text: &str,
    ) -> Result<AnalysisReport, Error> {
        let handle = normalize_handle(author_handle)?;
        let sentiment = self.classify(text).await?;
        info!(
            owner = %owner_id,
            author = %handle,
            label = %sentiment.label,
            score = sentiment.score,
            confidence = sentiment.confidence,
            "Tweet classified"
        );

        let tracking = match self
            .tracker
            .record_classification(owner_id, &handle, text, sentiment)
            .await
        {
            Ok(TrackOutcome::Ignored) => TrackingStatus::Ignored,
            Ok(TrackOutcome::Recorded { entry, escalated, .. }) => {
                TrackingStatus::Recorded { entry, escalated }
            }
            Err(e) => {
                warn!("Negative-count update failed for owner={} author={}: {}", owner_id, handle, e);
                TrackingStatus::Failed { reason: e.to_string() }
            }
        };

        Ok(AnalysisReport {
            author_handle: handle,
            sentiment,
            tracking,
        })
    }
}
