//! # tb-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `tb-core` domain models.
//!
//! Votes live in one row per (tip, voter) keyed by both ids, so a voter holds
//! at most one direction per tip. Every write that can move an author's
//! tallies recomputes that author's reputation inside the same transaction.

use std::str::FromStr;

use async_trait::async_trait;
use log::debug;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tb_core::error::DuplicateUsername;
use tb_core::models::{Tip, TipSummary, TipTally, User, VoteChange};
use tb_core::reputation;
use tb_core::traits::TipRepo;
use tb_core::voting::{VoteDirection, VoteState};
use uuid::Uuid;

pub struct SqliteTipRepo {
    pool: SqlitePool,
}

// Helper for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> anyhow::Result<Uuid> {
    Ok(Uuid::from_slice(blob)?)
}

fn count(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn row_to_user(row: &SqliteRow) -> anyhow::Result<User> {
    Ok(User {
        id: blob_to_uuid(row.try_get::<Vec<u8>, _>("id")?.as_slice())?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        reputation: count(row.try_get("reputation")?),
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_tip(row: &SqliteRow) -> anyhow::Result<Tip> {
    Ok(Tip {
        id: blob_to_uuid(row.try_get::<Vec<u8>, _>("id")?.as_slice())?,
        author_id: blob_to_uuid(row.try_get::<Vec<u8>, _>("author_id")?.as_slice())?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

impl SqliteTipRepo {
    /// Connects and applies the embedded migrations.
    ///
    /// `sqlite::memory:` databases are private to one connection, so the pool
    /// is pinned to a single long-lived connection for them.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().max_connections(5).connect_with(options).await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Full rescan of `user_id`'s tips; stores and returns the new score.
    ///
    /// The caller must already hold the write lock on `tx`.
    async fn recompute_in(tx: &mut Transaction<'_, Sqlite>, user_id: Uuid) -> anyhow::Result<u32> {
        let tallies = sqlx::query(
            "SELECT \
                COALESCE(SUM(CASE WHEN v.direction = 1 THEN 1 ELSE 0 END), 0) AS upvotes, \
                COALESCE(SUM(CASE WHEN v.direction = -1 THEN 1 ELSE 0 END), 0) AS downvotes \
             FROM tips t LEFT JOIN votes v ON v.tip_id = t.id \
             WHERE t.author_id = ? \
             GROUP BY t.id",
        )
        .bind(uuid_to_blob(user_id))
        .fetch_all(&mut **tx)
        .await?
        .iter()
        .map(|row| -> anyhow::Result<TipTally> {
            Ok(TipTally {
                upvotes: count(row.try_get("upvotes")?),
                downvotes: count(row.try_get("downvotes")?),
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

        let score = reputation::score(tallies);
        sqlx::query("UPDATE users SET reputation = ? WHERE id = ?")
            .bind(i64::from(score))
            .bind(uuid_to_blob(user_id))
            .execute(&mut **tx)
            .await?;

        debug!("recomputed reputation of {user_id}: {score}");
        Ok(score)
    }
}

#[async_trait]
impl TipRepo for SqliteTipRepo {
    async fn create_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO users (id, username, password_hash, reputation, is_admin, created_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(user.id))
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(i64::from(user.reputation))
            .bind(user.is_admin)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    anyhow::Error::new(DuplicateUsername(user.username.clone()))
                }
                other => other.into(),
            })?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(row_to_user)
            .transpose()
    }

    async fn find_user_by_name(&self, username: &str) -> anyhow::Result<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(row_to_user)
            .transpose()
    }

    async fn recompute_reputation(&self, user_id: Uuid) -> anyhow::Result<u32> {
        let mut tx = self.pool.begin().await?;

        // Take the write lock before reading so a concurrent writer cannot
        // slip in between the scan and the update.
        let touched = sqlx::query("UPDATE users SET reputation = reputation WHERE id = ?")
            .bind(uuid_to_blob(user_id))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if touched == 0 {
            anyhow::bail!("user {user_id} does not exist");
        }

        let score = Self::recompute_in(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(score)
    }

    async fn create_tip(&self, tip: &Tip) -> anyhow::Result<u32> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO tips (id, author_id, content, created_at) VALUES (?, ?, ?, ?)")
            .bind(uuid_to_blob(tip.id))
            .bind(uuid_to_blob(tip.author_id))
            .bind(&tip.content)
            .bind(tip.created_at)
            .execute(&mut *tx)
            .await?;

        let score = Self::recompute_in(&mut tx, tip.author_id).await?;
        tx.commit().await?;
        Ok(score)
    }

    async fn get_tip(&self, id: Uuid) -> anyhow::Result<Option<Tip>> {
        sqlx::query("SELECT * FROM tips WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(row_to_tip)
            .transpose()
    }

    async fn list_tips(&self, viewer: Option<Uuid>) -> anyhow::Result<Vec<TipSummary>> {
        let rows = sqlx::query(
            "SELECT t.id, t.author_id, t.content, t.created_at, u.username AS author_name, \
                COALESCE(SUM(CASE WHEN v.direction = 1 THEN 1 ELSE 0 END), 0) AS upvotes, \
                COALESCE(SUM(CASE WHEN v.direction = -1 THEN 1 ELSE 0 END), 0) AS downvotes, \
                MAX(CASE WHEN v.user_id = ? THEN v.direction END) AS viewer_vote \
             FROM tips t \
             JOIN users u ON u.id = t.author_id \
             LEFT JOIN votes v ON v.tip_id = t.id \
             GROUP BY t.id \
             ORDER BY t.created_at DESC, t.id DESC",
        )
        .bind(viewer.map(uuid_to_blob))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> anyhow::Result<TipSummary> {
                Ok(TipSummary {
                    tip: row_to_tip(row)?,
                    author_name: row.try_get("author_name")?,
                    tally: TipTally {
                        upvotes: count(row.try_get("upvotes")?),
                        downvotes: count(row.try_get("downvotes")?),
                    },
                    viewer_vote: VoteState::from_sign(row.try_get("viewer_vote")?),
                })
            })
            .collect()
    }

    async fn delete_tip(&self, id: Uuid) -> anyhow::Result<Option<u32>> {
        let mut tx = self.pool.begin().await?;

        // Votes go with the tip through ON DELETE CASCADE.
        let author = sqlx::query("DELETE FROM tips WHERE id = ? RETURNING author_id")
            .bind(uuid_to_blob(id))
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = author else {
            return Ok(None);
        };
        let author_id = blob_to_uuid(row.try_get::<Vec<u8>, _>("author_id")?.as_slice())?;

        let score = Self::recompute_in(&mut tx, author_id).await?;
        tx.commit().await?;
        Ok(Some(score))
    }

    /// Atomic read-toggle-write of one voter's standing on one tip.
    ///
    /// # Developer Note
    /// The first statement is a `DELETE ... RETURNING`, which both reads the
    /// current vote and takes SQLite's write lock, so two clicks racing on
    /// the same pair serialize instead of both seeing the old state.
    async fn toggle_vote(
        &self,
        tip_id: Uuid,
        voter_id: Uuid,
        direction: VoteDirection,
    ) -> anyhow::Result<Option<VoteChange>> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query("DELETE FROM votes WHERE tip_id = ? AND user_id = ? RETURNING direction")
            .bind(uuid_to_blob(tip_id))
            .bind(uuid_to_blob(voter_id))
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row.try_get::<i64, _>("direction"))
            .transpose()?;

        let author = sqlx::query("SELECT author_id FROM tips WHERE id = ?")
            .bind(uuid_to_blob(tip_id))
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = author else {
            return Ok(None);
        };
        let author_id = blob_to_uuid(row.try_get::<Vec<u8>, _>("author_id")?.as_slice())?;

        let next = VoteState::from_sign(previous).toggled(direction);
        if let Some(sign) = next.as_sign() {
            sqlx::query("INSERT INTO votes (tip_id, user_id, direction) VALUES (?, ?, ?)")
                .bind(uuid_to_blob(tip_id))
                .bind(uuid_to_blob(voter_id))
                .bind(sign)
                .execute(&mut *tx)
                .await?;
        }

        let author_reputation = Self::recompute_in(&mut tx, author_id).await?;
        tx.commit().await?;
        Ok(Some(VoteChange { state: next, author_reputation }))
    }
}
