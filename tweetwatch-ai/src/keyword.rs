use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use tweetwatch_common::error::Error;
use tweetwatch_common::models::{SentimentLabel, SentimentResult};
use tweetwatch_common::traits::SentimentClassifier;

use crate::models::KeywordLexicon;

/// Scores above this are positive, below its negation negative.
const LABEL_CUTOFF: f64 = 0.2;

/// Keyword-match classifier with a random score inside the matched band.
///
/// This is a stand-in for a real model: two calls with the same text will
/// usually produce different scores, but always the same label band.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    lexicon: KeywordLexicon,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lexicon(lexicon: KeywordLexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &KeywordLexicon {
        &self.lexicon
    }

    /// Scores `text` using the supplied RNG.
    pub fn score_with<R: Rng>(&self, text: &str, rng: &mut R) -> SentimentResult {
        let lower = text.to_lowercase();
        let hits = |words: &[String]| words.iter().any(|w| lower.contains(w.as_str()));

        let roll: f64 = rng.random();
        let score = if hits(&self.lexicon.negative) {
            -roll * 0.8 - 0.2
        } else if hits(&self.lexicon.positive) {
            roll * 0.8 + 0.2
        } else {
            roll * 0.4 - 0.2
        };

        label_score(score)
    }
}

/// Derives label and confidence from a raw score in `[-1, 1]`.
pub fn label_score(score: f64) -> SentimentResult {
    let score = score.clamp(-1.0, 1.0);
    let label = if score > LABEL_CUTOFF {
        SentimentLabel::Positive
    } else if score < -LABEL_CUTOFF {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };
    SentimentResult {
        label,
        score,
        confidence: score.abs() * 0.8 + 0.2,
    }
}

#[async_trait]
impl SentimentClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<SentimentResult, Error> {
        let result = self.score_with(text, &mut rand::rng());
        debug!(label = %result.label, score = result.score, "keyword classifier scored text");
        Ok(result)
    }
}
