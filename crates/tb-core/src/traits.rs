//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use crate::models::{Tip, TipSummary, User, VoteChange};
use crate::voting::VoteDirection;
use uuid::Uuid;

/// Data persistence contract for users, tips, and votes.
///
/// Every mutation that changes an author's tallies must recompute and store
/// that author's reputation (see `reputation::score`) in the same transaction.
#[async_trait]
pub trait TipRepo: Send + Sync {
    // User Operations
    /// Fails with `DuplicateUsername` if the name is taken.
    async fn create_user(&self, user: &User) -> anyhow::Result<()>;
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_name(&self, username: &str) -> anyhow::Result<Option<User>>;
    /// Full rescan of the user's authored tips. Returns the stored score.
    async fn recompute_reputation(&self, user_id: Uuid) -> anyhow::Result<u32>;

    // Tip Operations
    /// Inserts the tip and returns the author's recomputed reputation.
    async fn create_tip(&self, tip: &Tip) -> anyhow::Result<u32>;
    async fn get_tip(&self, id: Uuid) -> anyhow::Result<Option<Tip>>;
    /// All tips, newest first, with the viewer's own vote filled in.
    async fn list_tips(&self, viewer: Option<Uuid>) -> anyhow::Result<Vec<TipSummary>>;
    /// Removes the tip and its votes. `None` if the tip was already gone.
    async fn delete_tip(&self, id: Uuid) -> anyhow::Result<Option<u32>>;

    // Vote Operations
    /// Reads the voter's current state, applies `VoteState::toggled` and
    /// recomputes the author's reputation, atomically. `None` if the tip is gone.
    async fn toggle_vote(
        &self,
        tip_id: Uuid,
        voter_id: Uuid,
        direction: VoteDirection,
    ) -> anyhow::Result<Option<VoteChange>>;
}

/// Identity contract.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Produces a self-describing hash (salt included) for storage.
    fn hash_password(&self, password: &str) -> anyhow::Result<String>;

    /// Verifies a password against a stored hash.
    async fn verify_password(&self, password: &str, hash: &str) -> bool;

    /// Picks a display name for an anonymous visitor.
    fn guest_name(&self, names: &[String]) -> String;
}
