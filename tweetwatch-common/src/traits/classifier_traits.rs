use async_trait::async_trait;

use crate::error::Error;
use crate::models::SentimentResult;

/// Anything that can label a piece of text.
///
/// Implementations are free to be non-deterministic; callers must not assume
/// identical input yields identical scores.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<SentimentResult, Error>;
}
