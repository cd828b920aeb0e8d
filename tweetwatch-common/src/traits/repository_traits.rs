use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{BlacklistEntry, ClearPolicy, NegativeRecord};

/// Persistence for per-owner author entries.
///
/// Every method is scoped by `owner_id`, except `get_entry_by_id` which the
/// tracker uses to tell "unknown id" apart from "owned by someone else".
#[async_trait]
pub trait BlacklistRepository: Send + Sync {
    /// Adds one negative classification for `(owner_id, author_handle)` as a single
    /// atomic step: insert with count 1 if absent, else `negative_count + 1`, and
    /// `blacklisted = negative_count >= threshold` in both cases. The same step
    /// stores `text` and `score` as the entry's latest negative tweet.
    async fn record_negative(
        &self,
        owner_id: Uuid,
        author_handle: &str,
        text: &str,
        score: f64,
        threshold: i32,
    ) -> Result<NegativeRecord, Error>;

    async fn get_entry(
        &self,
        owner_id: Uuid,
        author_handle: &str,
    ) -> Result<Option<BlacklistEntry>, Error>;

    async fn get_entry_by_id(&self, entry_id: Uuid) -> Result<Option<BlacklistEntry>, Error>;

    /// Blacklisted entries of `owner_id`, most recently updated first.
    async fn list_blacklisted(&self, owner_id: Uuid) -> Result<Vec<BlacklistEntry>, Error>;

    /// Every entry of `owner_id`, most recently updated first.
    async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<BlacklistEntry>, Error>;

    /// Clears the flag of one currently blacklisted entry owned by `owner_id`.
    /// Returns `None` when nothing matched (unknown id, other owner, or not blacklisted).
    async fn unblacklist(
        &self,
        owner_id: Uuid,
        entry_id: Uuid,
        policy: ClearPolicy,
    ) -> Result<Option<BlacklistEntry>, Error>;

    /// Clears the flag of every blacklisted entry of `owner_id`; returns how many changed.
    async fn clear_all(&self, owner_id: Uuid, policy: ClearPolicy) -> Result<u64, Error>;
}
