//! src/services/blacklist_tracker.rs
//!
//! Per-owner negative-tweet accounting. An author moves to `Blacklisted` only
//! when a negative classification pushes its count to the threshold, and back
//! to `Normal` only through an explicit unblacklist or clear-all.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::Error;
use crate::eventbus::{EventBus, TrackerEvent};
use crate::models::{BlacklistEntry, ClearPolicy, NegativeRecord, SentimentResult, normalize_handle};
use crate::repositories::BlacklistRepository;

pub const DEFAULT_THRESHOLD: i32 = 3;

/// Upper bound for a single retry delay, however many retries are configured.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Negative count at which an author becomes blacklisted.
    pub threshold: i32,
    pub clear_policy: ClearPolicy,
    /// Extra attempts for a failed store write. Zero means fail on first error.
    pub store_retries: u32,
    /// Delay before the first retry; doubled on each further attempt up to `MAX_RETRY_DELAY`.
    pub retry_backoff: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            clear_policy: ClearPolicy::KeepCount,
            store_retries: 0,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.threshold < 1 {
            return Err(Error::Config(format!(
                "blacklist threshold must be at least 1, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// What `record_classification` did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrackOutcome {
    /// The label was not negative; nothing was read or written.
    Ignored,
    Recorded {
        entry: BlacklistEntry,
        created: bool,
        /// This call flipped the author from `Normal` to `Blacklisted`.
        escalated: bool,
    },
}

pub struct BlacklistTracker {
    repo: Arc<dyn BlacklistRepository>,
    event_bus: Arc<EventBus>,
    config: TrackerConfig,
}

impl BlacklistTracker {
    pub fn new(
        repo: Arc<dyn BlacklistRepository>,
        event_bus: Arc<EventBus>,
        config: TrackerConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { repo, event_bus, config })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Feeds one classified tweet into the state machine. Only negative results
    /// touch the store; the tweet text and score are kept on the entry.
    pub async fn record_classification(
        &self,
        owner_id: Uuid,
        author_handle: &str,
        text: &str,
        sentiment: SentimentResult,
    ) -> Result<TrackOutcome, Error> {
        let handle = normalize_handle(author_handle)?;
        if !sentiment.label.is_negative() {
            debug!(owner = %owner_id, author = %handle, label = %sentiment.label, "Non-negative label, nothing to track");
            return Ok(TrackOutcome::Ignored);
        }

        let rec = self.record_with_retry(owner_id, &handle, text, sentiment.score).await?;
        let escalated = rec.escalated();
        if escalated {
            info!(
                owner = %owner_id,
                author = %handle,
                negative_count = rec.entry.negative_count,
                "Author reached the negative threshold"
            );
            self.event_bus
                .publish(TrackerEvent::AuthorBlacklisted {
                    owner_id,
                    entry: rec.entry.clone(),
                    timestamp: Utc::now(),
                })
                .await;
        } else {
            debug!(
                owner = %owner_id,
                author = %handle,
                negative_count = rec.entry.negative_count,
                "Recorded negative tweet"
            );
        }

        Ok(TrackOutcome::Recorded {
            entry: rec.entry,
            created: rec.created,
            escalated,
        })
    }

    async fn record_with_retry(
        &self,
        owner_id: Uuid,
        handle: &str,
        text: &str,
        score: f64,
    ) -> Result<NegativeRecord, Error> {
        let mut attempt = 0;
        loop {
            match self
                .repo
                .record_negative(owner_id, handle, text, score, self.config.threshold)
                .await
            {
                Ok(rec) => return Ok(rec),
                Err(e) if e.is_storage() && attempt < self.config.store_retries => {
                    let delay = retry_delay(self.config.retry_backoff, attempt);
                    warn!(
                        "Store write for owner={} author={} failed (attempt {}): {}; retrying in {:?}",
                        owner_id, handle, attempt + 1, e, delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Blacklisted authors of `owner_id`, most recently escalated first.
    pub async fn list_blacklist(&self, owner_id: Uuid) -> Result<Vec<BlacklistEntry>, Error> {
        self.repo.list_blacklisted(owner_id).await
    }

    /// Every tracked author of `owner_id`, blacklisted or not.
    pub async fn list_entries(&self, owner_id: Uuid) -> Result<Vec<BlacklistEntry>, Error> {
        self.repo.list_for_owner(owner_id).await
    }

    /// Returns `true` if the entry changed, `false` if it was already cleared.
    pub async fn unblacklist(&self, owner_id: Uuid, entry_id: Uuid) -> Result<bool, Error> {
        if let Some(entry) = self
            .repo
            .unblacklist(owner_id, entry_id, self.config.clear_policy)
            .await?
        {
            info!(owner = %owner_id, author = %entry.author_handle, "Author unblacklisted");
            self.event_bus
                .publish(TrackerEvent::AuthorUnblacklisted {
                    owner_id,
                    entry_id,
                    timestamp: Utc::now(),
                })
                .await;
            return Ok(true);
        }

        match self.repo.get_entry_by_id(entry_id).await? {
            None => Err(Error::NotFound(format!("blacklist entry {}", entry_id))),
            Some(entry) if entry.owner_id != owner_id => {
                warn!(owner = %owner_id, entry = %entry_id, "Refusing to unblacklist another owner's entry");
                Err(Error::Forbidden(format!("blacklist entry {} belongs to another account", entry_id)))
            }
            Some(_) => Ok(false),
        }
    }

    /// Returns how many entries were cleared.
    pub async fn clear_all(&self, owner_id: Uuid) -> Result<u64, Error> {
        let cleared = self.repo.clear_all(owner_id, self.config.clear_policy).await?;
        if cleared > 0 {
            info!(owner = %owner_id, cleared, "Blacklist cleared");
            self.event_bus
                .publish(TrackerEvent::BlacklistCleared {
                    owner_id,
                    cleared,
                    timestamp: Utc::now(),
                })
                .await;
        }
        Ok(cleared)
    }
}

/// `base * 2^attempt`, capped at `MAX_RETRY_DELAY`.
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(2u32.saturating_pow(attempt))
        .unwrap_or(MAX_RETRY_DELAY)
        .min(MAX_RETRY_DELAY)
}
