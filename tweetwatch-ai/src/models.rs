use std::time::Duration;

use serde::{Deserialize, Serialize};
use tweetwatch_common::error::Error;
use tweetwatch_common::models::{SentimentLabel, SentimentResult};

/// Configuration for a sentiment classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// The type of classifier ("keyword" or "http")
    pub provider_type: String,

    /// Endpoint for the remote classifier; required for "http"
    pub api_base: Option<String>,

    /// Per-request timeout for remote calls
    #[serde(with = "millis")]
    pub timeout: Duration,

    /// Word lists used by the keyword classifier
    #[serde(default)]
    pub lexicon: KeywordLexicon,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider_type: "keyword".to_string(),
            api_base: None,
            timeout: Duration::from_secs(5),
            lexicon: KeywordLexicon::default(),
        }
    }
}

/// Substrings that push the keyword classifier towards a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordLexicon {
    pub negative: Vec<String>,
    pub positive: Vec<String>,
}

impl Default for KeywordLexicon {
    fn default() -> Self {
        let words = |ws: &[&str]| ws.iter().map(|w| w.to_string()).collect();
        Self {
            negative: words(&["hate", "stupid", "terrible", "awful", "bad"]),
            positive: words(&["great", "love", "excellent", "happy", "good"]),
        }
    }
}

/// Body sent to a remote classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
}

/// Body returned by a remote classifier: either a result or an error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassifyResponse {
    Result {
        label: String,
        score: f64,
        confidence: f64,
    },
    Error {
        error: String,
    },
}

impl ClassifyResponse {
    /// Validates the wire form into a `SentimentResult`.
    pub fn into_result(self) -> Result<SentimentResult, Error> {
        match self {
            ClassifyResponse::Result { label, score, confidence } => {
                let label: SentimentLabel = label
                    .parse()
                    .map_err(|e: Error| Error::Classification(e.to_string()))?;
                SentimentResult::checked(label, score, confidence)
            }
            ClassifyResponse::Error { error } => Err(Error::Classification(error)),
        }
    }
}

impl From<SentimentResult> for ClassifyResponse {
    fn from(r: SentimentResult) -> Self {
        ClassifyResponse::Result {
            label: r.label.to_string(),
            score: r.score,
            confidence: r.confidence,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
