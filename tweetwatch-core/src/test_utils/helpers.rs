// File: tweetwatch-core/src/test_utils/helpers.rs

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;
use tracing::info;

use crate::Error;
use crate::db::Database;
use crate::eventbus::{EventBus, TrackerEvent};
use crate::models::{SentimentLabel, SentimentResult};
use crate::repositories::InMemoryBlacklistRepository;
use crate::services::{BlacklistTracker, TrackerConfig};
use tweetwatch_common::traits::SentimentClassifier;

/// Test DB URL from `TEST_DATABASE_URL`. Postgres-backed tests skip themselves when unset.
pub fn test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok().filter(|s| !s.trim().is_empty())
}

/// Create a connection pool to the test DB.
pub async fn create_test_db_pool(url: &str) -> Result<Pool<Postgres>, Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await?;

    Ok(pool)
}

/// Returns a migrated test DB handle, or `None` when no test database is configured.
///
/// Tables are not truncated here; tests scope their rows by using fresh owner ids.
pub async fn setup_test_database() -> Result<Option<Database>, Error> {
    let Some(url) = test_database_url() else {
        info!("TEST_DATABASE_URL not set; skipping Postgres-backed test");
        return Ok(None);
    };
    let pool = create_test_db_pool(&url).await?;
    let db = Database::from_pool(pool);
    db.migrate().await?;
    Ok(Some(db))
}

/// A tracker over a fresh in-memory store, plus the bus and store it uses.
pub fn memory_tracker(
    config: TrackerConfig,
) -> Result<(BlacklistTracker, Arc<EventBus>, InMemoryBlacklistRepository), Error> {
    let bus = Arc::new(EventBus::new());
    let repo = InMemoryBlacklistRepository::new();
    let tracker = BlacklistTracker::new(Arc::new(repo.clone()), bus.clone(), config)?;
    Ok((tracker, bus, repo))
}

/// Collects every event already queued on `rx` without waiting.
pub fn drain_events(rx: &mut mpsc::Receiver<TrackerEvent>) -> Vec<TrackerEvent> {
    let mut out = Vec::new();
    while let Ok(evt) = rx.try_recv() {
        out.push(evt);
    }
    out
}

/// Classifier that always answers with the same label.
#[derive(Debug, Clone, Copy)]
pub struct FixedClassifier {
    pub label: SentimentLabel,
}

impl FixedClassifier {
    pub fn new(label: SentimentLabel) -> Self {
        Self { label }
    }
}

#[async_trait]
impl SentimentClassifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> Result<SentimentResult, Error> {
        Ok(sentiment(self.label))
    }
}

/// A plausible classifier result for `label`: score ±0.8 (0 for neutral), confidence 0.84.
pub fn sentiment(label: SentimentLabel) -> SentimentResult {
    let score = match label {
        SentimentLabel::Positive => 0.8,
        SentimentLabel::Negative => -0.8,
        SentimentLabel::Neutral => 0.0,
    };
    SentimentResult { label, score, confidence: 0.84 }
}
