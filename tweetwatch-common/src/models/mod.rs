// File: tweetwatch-common/src/models/mod.rs
pub mod blacklist;
pub mod sentiment;

pub use blacklist::{BlacklistEntry, ClearPolicy, NegativeRecord, normalize_handle};
pub use sentiment::{SentimentLabel, SentimentResult};
