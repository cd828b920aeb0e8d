pub mod blacklist_tracker;
pub mod sentiment_service;

pub use blacklist_tracker::{BlacklistTracker, TrackOutcome, TrackerConfig, DEFAULT_THRESHOLD};
pub use sentiment_service::{AnalysisReport, SentimentService, TrackingStatus};
