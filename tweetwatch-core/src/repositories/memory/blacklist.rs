// src/repositories/memory/blacklist.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::Error;
use crate::models::{BlacklistEntry, ClearPolicy, NegativeRecord};
use tweetwatch_common::traits::repository_traits::BlacklistRepository;

/// Process-local blacklist store keyed by `(owner_id, author_handle)`.
///
/// Increments run under the DashMap shard lock of the entry, so they are atomic
/// with respect to each other. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct InMemoryBlacklistRepository {
    entries: Arc<DashMap<(Uuid, String), BlacklistEntry>>,
}

impl InMemoryBlacklistRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces an entry verbatim. Handy for seeding state.
    pub fn insert(&self, entry: BlacklistEntry) {
        self.entries
            .insert((entry.owner_id, entry.author_handle.clone()), entry);
    }

    fn collect_sorted<F>(&self, keep: F) -> Vec<BlacklistEntry>
    where
        F: Fn(&BlacklistEntry) -> bool,
    {
        let mut out: Vec<BlacklistEntry> = self
            .entries
            .iter()
            .filter(|e| keep(e.value()))
            .map(|e| e.value().clone())
            .collect();
        out.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.entry_id.cmp(&b.entry_id))
        });
        out
    }
}

fn clear(entry: &mut BlacklistEntry, policy: ClearPolicy) {
    entry.blacklisted = false;
    if policy.resets_count() {
        entry.negative_count = 0;
    }
    entry.updated_at = Utc::now();
}

#[async_trait]
impl BlacklistRepository for InMemoryBlacklistRepository {
    async fn record_negative(
        &self,
        owner_id: Uuid,
        author_handle: &str,
        text: &str,
        score: f64,
        threshold: i32,
    ) -> Result<NegativeRecord, Error> {
        match self.entries.entry((owner_id, author_handle.to_string())) {
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                let previously_blacklisted = entry.blacklisted;
                entry.negative_count += 1;
                entry.blacklisted = entry.negative_count >= threshold;
                entry.last_negative_text = text.to_string();
                entry.last_negative_score = score;
                entry.updated_at = Utc::now();
                Ok(NegativeRecord {
                    entry: entry.clone(),
                    created: false,
                    previously_blacklisted,
                })
            }
            Entry::Vacant(slot) => {
                let entry = BlacklistEntry::first_negative(owner_id, author_handle, text, score, threshold);
                slot.insert(entry.clone());
                Ok(NegativeRecord {
                    entry,
                    created: true,
                    previously_blacklisted: false,
                })
            }
        }
    }

    async fn get_entry(
        &self,
        owner_id: Uuid,
        author_handle: &str,
    ) -> Result<Option<BlacklistEntry>, Error> {
        Ok(self
            .entries
            .get(&(owner_id, author_handle.to_string()))
            .map(|e| e.value().clone()))
    }

    async fn get_entry_by_id(&self, entry_id: Uuid) -> Result<Option<BlacklistEntry>, Error> {
        Ok(self
            .entries
            .iter()
            .find(|e| e.value().entry_id == entry_id)
            .map(|e| e.value().clone()))
    }

    async fn list_blacklisted(&self, owner_id: Uuid) -> Result<Vec<BlacklistEntry>, Error> {
        Ok(self.collect_sorted(|e| e.owner_id == owner_id && e.blacklisted))
    }

    async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<BlacklistEntry>, Error> {
        Ok(self.collect_sorted(|e| e.owner_id == owner_id))
    }

    async fn unblacklist(
        &self,
        owner_id: Uuid,
        entry_id: Uuid,
        policy: ClearPolicy,
    ) -> Result<Option<BlacklistEntry>, Error> {
        for mut item in self.entries.iter_mut() {
            let entry = item.value_mut();
            if entry.entry_id == entry_id && entry.owner_id == owner_id && entry.blacklisted {
                clear(entry, policy);
                return Ok(Some(entry.clone()));
            }
        }
        Ok(None)
    }

    async fn clear_all(&self, owner_id: Uuid, policy: ClearPolicy) -> Result<u64, Error> {
        let mut changed = 0;
        for mut item in self.entries.iter_mut() {
            let entry = item.value_mut();
            if entry.owner_id == owner_id && entry.blacklisted {
                clear(entry, policy);
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_negative_creates_entry() {
        let repo = InMemoryBlacklistRepository::new();
        let owner = Uuid::new_v4();

        let rec = repo.record_negative(owner, "alice", "bad", -0.6, 3).await.unwrap();
        assert!(rec.created);
        assert_eq!(rec.entry.negative_count, 1);
        assert!(!rec.entry.blacklisted);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn increment_keeps_the_latest_negative_tweet() {
        let repo = InMemoryBlacklistRepository::new();
        let owner = Uuid::new_v4();
        repo.record_negative(owner, "fay", "bad call", -0.4, 3).await.unwrap();
        let rec = repo.record_negative(owner, "fay", "awful service", -0.9, 3).await.unwrap();
        assert_eq!(rec.entry.last_negative_text, "awful service");
        assert_eq!(rec.entry.last_negative_score, -0.9);
    }

    #[tokio::test]
    async fn owners_do_not_share_entries() {
        let repo = InMemoryBlacklistRepository::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        repo.record_negative(a, "dave", "bad", -0.6, 3).await.unwrap();
        let rec = repo.record_negative(b, "dave", "bad", -0.6, 3).await.unwrap();
        assert!(rec.created);
        assert_eq!(rec.entry.negative_count, 1);
        assert_eq!(repo.list_for_owner(a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unblacklist_only_matches_owner_and_flag() {
        let repo = InMemoryBlacklistRepository::new();
        let owner = Uuid::new_v4();
        let rec = repo.record_negative(owner, "erin", "bad", -0.6, 1).await.unwrap();
        let id = rec.entry.entry_id;

        assert!(repo.unblacklist(Uuid::new_v4(), id, ClearPolicy::KeepCount).await.unwrap().is_none());
        let cleared = repo.unblacklist(owner, id, ClearPolicy::KeepCount).await.unwrap().unwrap();
        assert!(!cleared.blacklisted);
        assert_eq!(cleared.negative_count, 1);
        assert!(repo.unblacklist(owner, id, ClearPolicy::KeepCount).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_most_recent_first() {
        let repo = InMemoryBlacklistRepository::new();
        let owner = Uuid::new_v4();
        repo.record_negative(owner, "old", "bad", -0.6, 1).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.record_negative(owner, "new", "bad", -0.6, 1).await.unwrap();

        let listed = repo.list_blacklisted(owner).await.unwrap();
        let handles: Vec<_> = listed.iter().map(|e| e.author_handle.as_str()).collect();
        assert_eq!(handles, vec!["new", "old"]);
    }
}
