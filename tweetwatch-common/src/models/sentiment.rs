// File: tweetwatch-common/src/models/sentiment.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Categorical output of a sentiment classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, SentimentLabel::Negative)
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            other => Err(Error::Parse(format!("unknown sentiment label '{}'", other))),
        }
    }
}

/// What a classifier returns for one piece of text.
///
/// `score` lives in `[-1, 1]` (negative to positive), `confidence` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub score: f64,
    pub confidence: f64,
}

impl SentimentResult {
    /// Builds a result, rejecting scores or confidences outside their ranges.
    pub fn checked(label: SentimentLabel, score: f64, confidence: f64) -> Result<Self, Error> {
        if !score.is_finite() || !(-1.0..=1.0).contains(&score) {
            return Err(Error::Classification(format!("score {} is outside [-1, 1]", score)));
        }
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(Error::Classification(format!(
                "confidence {} is outside [0, 1]",
                confidence
            )));
        }
        Ok(Self { label, score, confidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_parses_case_insensitively() {
        assert_eq!("Negative".parse::<SentimentLabel>().unwrap(), SentimentLabel::Negative);
        assert_eq!(" neutral ".parse::<SentimentLabel>().unwrap(), SentimentLabel::Neutral);
        assert!("angry".parse::<SentimentLabel>().is_err());
    }

    #[test]
    fn label_serializes_lowercase() {
        let json = serde_json::to_string(&SentimentLabel::Positive).unwrap();
        assert_eq!(json, "\"positive\"");
    }

    #[test]
    fn checked_rejects_out_of_range_values() {
        assert!(SentimentResult::checked(SentimentLabel::Negative, -0.5, 0.6).is_ok());
        assert!(SentimentResult::checked(SentimentLabel::Negative, -1.5, 0.6).is_err());
        assert!(SentimentResult::checked(SentimentLabel::Positive, 0.5, 1.2).is_err());
        assert!(SentimentResult::checked(SentimentLabel::Neutral, f64::NAN, 0.5).is_err());
    }
}
