// File: tweetwatch-common/src/models/blacklist.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// One tracked tweet author, scoped to the owner who submitted the tweets.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct BlacklistEntry {
    pub entry_id: Uuid,
    pub owner_id: Uuid,
    pub author_handle: String,
    pub negative_count: i32,
    pub blacklisted: bool,
    /// Text of the most recent negative tweet, kept so a listing shows why the author is here.
    pub last_negative_text: String,
    pub last_negative_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlacklistEntry {
    /// A freshly seen author after its first negative classification.
    pub fn first_negative(
        owner_id: Uuid,
        author_handle: &str,
        text: &str,
        score: f64,
        threshold: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            entry_id: Uuid::new_v4(),
            owner_id,
            author_handle: author_handle.to_string(),
            negative_count: 1,
            blacklisted: 1 >= threshold,
            last_negative_text: text.to_string(),
            last_negative_score: score,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of one atomic negative-count increment at the storage layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NegativeRecord {
    /// Entry state after the increment.
    pub entry: BlacklistEntry,
    /// True if this increment inserted the entry.
    pub created: bool,
    /// Flag value immediately before the increment (false for new entries).
    pub previously_blacklisted: bool,
}

impl NegativeRecord {
    /// The increment moved the entry from `Normal` to `Blacklisted`.
    pub fn escalated(&self) -> bool {
        !self.previously_blacklisted && self.entry.blacklisted
    }
}

/// What unblacklisting does to the accumulated count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClearPolicy {
    /// Only the flag is reset; one more negative re-blacklists the author.
    #[default]
    KeepCount,
    /// The flag and the count are both reset to zero.
    ResetCount,
}

impl ClearPolicy {
    pub fn resets_count(&self) -> bool {
        matches!(self, ClearPolicy::ResetCount)
    }
}

impl fmt::Display for ClearPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearPolicy::KeepCount => f.write_str("keep-count"),
            ClearPolicy::ResetCount => f.write_str("reset-count"),
        }
    }
}

impl FromStr for ClearPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-count" | "keep" => Ok(ClearPolicy::KeepCount),
            "reset-count" | "reset" => Ok(ClearPolicy::ResetCount),
            other => Err(Error::Config(format!(
                "unknown clear policy '{}', expected keep-count or reset-count",
                other
            ))),
        }
    }
}

/// Canonical form of an author handle: trimmed, one leading `@` dropped, lower-cased.
pub fn normalize_handle(raw: &str) -> Result<String, Error> {
    let trimmed = raw.trim();
    let handle = trimmed.strip_prefix('@').unwrap_or(trimmed).trim();
    if handle.is_empty() {
        return Err(Error::InvalidInput("author handle is empty".into()));
    }
    Ok(handle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_at_and_case() {
        assert_eq!(normalize_handle("  @Alice ").unwrap(), "alice");
        assert_eq!(normalize_handle("bob").unwrap(), "bob");
        assert!(normalize_handle("   ").is_err());
        assert!(normalize_handle("@").is_err());
    }

    #[test]
    fn first_negative_respects_threshold() {
        let owner = Uuid::new_v4();
        let e = BlacklistEntry::first_negative(owner, "alice", "awful take", -0.7, 3);
        assert_eq!(e.negative_count, 1);
        assert!(!e.blacklisted);
        assert_eq!(e.last_negative_text, "awful take");
        assert_eq!(e.last_negative_score, -0.7);

        let e = BlacklistEntry::first_negative(owner, "alice", "awful take", -0.7, 1);
        assert!(e.blacklisted);
    }

    #[test]
    fn escalation_is_an_edge() {
        let mut entry = BlacklistEntry::first_negative(Uuid::new_v4(), "carol", "bad", -0.5, 3);
        entry.negative_count = 3;
        entry.blacklisted = true;

        let rec = NegativeRecord { entry: entry.clone(), created: false, previously_blacklisted: false };
        assert!(rec.escalated());

        let rec = NegativeRecord { entry, created: false, previously_blacklisted: true };
        assert!(!rec.escalated());
    }

    #[test]
    fn clear_policy_round_trips_through_str() {
        assert_eq!("reset-count".parse::<ClearPolicy>().unwrap(), ClearPolicy::ResetCount);
        assert_eq!(ClearPolicy::KeepCount.to_string(), "keep-count");
        assert!("forget".parse::<ClearPolicy>().is_err());
    }
}
