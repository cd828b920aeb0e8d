// src/repositories/postgres/blacklist.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::Error;
use crate::models::{BlacklistEntry, ClearPolicy, NegativeRecord};
pub use tweetwatch_common::traits::repository_traits::BlacklistRepository;

const ENTRY_COLUMNS: &str = "entry_id, owner_id, author_handle, negative_count, blacklisted, \
     last_negative_text, last_negative_score, created_at, updated_at";

/// Postgres-backed blacklist store. All counter changes happen inside single
/// SQL statements so concurrent increments never overwrite each other.
#[derive(Clone)]
pub struct PostgresBlacklistRepository {
    pool: Pool<Postgres>,
}

impl PostgresBlacklistRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Increments an existing row. The `FOR UPDATE` subselect locks the row and
    /// hands back the flag as it was before this statement.
    async fn increment_existing(
        &self,
        owner_id: Uuid,
        author_handle: &str,
        text: &str,
        score: f64,
        threshold: i32,
    ) -> Result<Option<NegativeRecord>, Error> {
        let row = sqlx::query(
            r#"
            UPDATE blacklist_entries AS e
            SET negative_count = e.negative_count + 1,
                blacklisted    = e.negative_count + 1 >= $3,
                last_negative_text  = $5,
                last_negative_score = $6,
                updated_at     = $4
            FROM (
                SELECT entry_id, blacklisted
                FROM blacklist_entries
                WHERE owner_id = $1 AND author_handle = $2
                FOR UPDATE
            ) AS prev
            WHERE e.entry_id = prev.entry_id
            RETURNING e.entry_id,
                      e.owner_id,
                      e.author_handle,
                      e.negative_count,
                      e.blacklisted,
                      e.last_negative_text,
                      e.last_negative_score,
                      e.created_at,
                      e.updated_at,
                      prev.blacklisted AS previously_blacklisted
            "#,
        )
            .bind(owner_id)
            .bind(author_handle)
            .bind(threshold)
            .bind(Utc::now())
            .bind(text)
            .bind(score)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(NegativeRecord {
                entry: entry_from_row(&r)?,
                created: false,
                previously_blacklisted: r.try_get("previously_blacklisted")?,
            })),
            None => Ok(None),
        }
    }

    /// Inserts the first negative for a new author. Returns `None` when a
    /// concurrent writer created the row first.
    async fn insert_first(
        &self,
        owner_id: Uuid,
        author_handle: &str,
        text: &str,
        score: f64,
        threshold: i32,
    ) -> Result<Option<NegativeRecord>, Error> {
        let entry = BlacklistEntry::first_negative(owner_id, author_handle, text, score, threshold);
        let row = sqlx::query(
            r#"
            INSERT INTO blacklist_entries (
                entry_id,
                owner_id,
                author_handle,
                negative_count,
                blacklisted,
                last_negative_text,
                last_negative_score,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (owner_id, author_handle) DO NOTHING
            RETURNING entry_id
            "#,
        )
            .bind(entry.entry_id)
            .bind(entry.owner_id)
            .bind(&entry.author_handle)
            .bind(entry.negative_count)
            .bind(entry.blacklisted)
            .bind(&entry.last_negative_text)
            .bind(entry.last_negative_score)
            .bind(entry.created_at)
            .bind(entry.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|_| NegativeRecord {
            entry,
            created: true,
            previously_blacklisted: false,
        }))
    }
}

fn entry_from_row(r: &PgRow) -> Result<BlacklistEntry, Error> {
    Ok(BlacklistEntry {
        entry_id: r.try_get("entry_id")?,
        owner_id: r.try_get("owner_id")?,
        author_handle: r.try_get("author_handle")?,
        negative_count: r.try_get("negative_count")?,
        blacklisted: r.try_get("blacklisted")?,
        last_negative_text: r.try_get("last_negative_text")?,
        last_negative_score: r.try_get("last_negative_score")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl BlacklistRepository for PostgresBlacklistRepository {
    async fn record_negative(
        &self,
        owner_id: Uuid,
        author_handle: &str,
        text: &str,
        score: f64,
        threshold: i32,
    ) -> Result<NegativeRecord, Error> {
        if let Some(rec) = self.increment_existing(owner_id, author_handle, text, score, threshold).await? {
            return Ok(rec);
        }
        if let Some(rec) = self.insert_first(owner_id, author_handle, text, score, threshold).await? {
            return Ok(rec);
        }

        // Lost the insert race; the row exists now, so this update must hit it.
        debug!("Concurrent insert for owner={} author={}, retrying increment", owner_id, author_handle);
        match self.increment_existing(owner_id, author_handle, text, score, threshold).await? {
            Some(rec) => Ok(rec),
            None => {
                warn!("Entry for owner={} author={} vanished during increment", owner_id, author_handle);
                Err(Error::NotFound(format!("entry for author '{}'", author_handle)))
            }
        }
    }

    async fn get_entry(
        &self,
        owner_id: Uuid,
        author_handle: &str,
    ) -> Result<Option<BlacklistEntry>, Error> {
        let row = sqlx::query_as::<_, BlacklistEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM blacklist_entries WHERE owner_id = $1 AND author_handle = $2"
        ))
            .bind(owner_id)
            .bind(author_handle)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_entry_by_id(&self, entry_id: Uuid) -> Result<Option<BlacklistEntry>, Error> {
        let row = sqlx::query_as::<_, BlacklistEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM blacklist_entries WHERE entry_id = $1"
        ))
            .bind(entry_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_blacklisted(&self, owner_id: Uuid) -> Result<Vec<BlacklistEntry>, Error> {
        let rows = sqlx::query_as::<_, BlacklistEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM blacklist_entries
            WHERE owner_id = $1 AND blacklisted
            ORDER BY updated_at DESC, entry_id
            "#
        ))
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<BlacklistEntry>, Error> {
        let rows = sqlx::query_as::<_, BlacklistEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM blacklist_entries
            WHERE owner_id = $1
            ORDER BY updated_at DESC, entry_id
            "#
        ))
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn unblacklist(
        &self,
        owner_id: Uuid,
        entry_id: Uuid,
        policy: ClearPolicy,
    ) -> Result<Option<BlacklistEntry>, Error> {
        let row = sqlx::query_as::<_, BlacklistEntry>(&format!(
            r#"
            UPDATE blacklist_entries
            SET blacklisted    = FALSE,
                negative_count = CASE WHEN $3 THEN 0 ELSE negative_count END,
                updated_at     = $4
            WHERE entry_id = $1 AND owner_id = $2 AND blacklisted
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
            .bind(entry_id)
            .bind(owner_id)
            .bind(policy.resets_count())
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn clear_all(&self, owner_id: Uuid, policy: ClearPolicy) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE blacklist_entries
            SET blacklisted    = FALSE,
                negative_count = CASE WHEN $2 THEN 0 ELSE negative_count END,
                updated_at     = $3
            WHERE owner_id = $1 AND blacklisted
            "#,
        )
            .bind(owner_id)
            .bind(policy.resets_count())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
