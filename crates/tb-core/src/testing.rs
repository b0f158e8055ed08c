//! In-memory port implementations for tests.
//!
//! Compiled for this crate's tests and, through the `testing` feature, for
//! other crates' tests. They follow the same contracts as the real plugins,
//! including the recompute-on-write rule of `TipRepo`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DuplicateUsername;
use crate::models::{Tip, TipSummary, TipTally, User, VoteChange};
use crate::reputation;
use crate::traits::{AuthProvider, TipRepo};
use crate::voting::{VoteDirection, VoteState};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    tips: HashMap<Uuid, Tip>,
    /// Keyed by (tip, voter); `VoteState::None` is never stored
    votes: HashMap<(Uuid, Uuid), VoteState>,
}

impl State {
    fn tally(&self, tip_id: Uuid) -> TipTally {
        let mut tally = TipTally::default();
        for ((tip, _), state) in &self.votes {
            if *tip != tip_id {
                continue;
            }
            match state {
                VoteState::Upvoted => tally.upvotes += 1,
                VoteState::Downvoted => tally.downvotes += 1,
                VoteState::None => {}
            }
        }
        tally
    }

    fn recompute(&mut self, user_id: Uuid) -> anyhow::Result<u32> {
        let tallies: Vec<TipTally> = self
            .tips
            .values()
            .filter(|t| t.author_id == user_id)
            .map(|t| self.tally(t.id))
            .collect();
        let score = reputation::score(tallies);
        let user = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow::anyhow!("user {user_id} does not exist"))?;
        user.reputation = score;
        Ok(score)
    }
}

/// `TipRepo` backed by a mutex-guarded map.
#[derive(Default)]
pub struct InMemoryTipRepo {
    state: Mutex<State>,
}

impl InMemoryTipRepo {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tip_count(&self) -> usize {
        self.state().tips.len()
    }
}

#[async_trait]
impl TipRepo for InMemoryTipRepo {
    async fn create_user(&self, user: &User) -> anyhow::Result<()> {
        let mut state = self.state();
        if state.users.values().any(|u| u.username == user.username) {
            return Err(DuplicateUsername(user.username.clone()).into());
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.state().users.get(&id).cloned())
    }

    async fn find_user_by_name(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self.state().users.values().find(|u| u.username == username).cloned())
    }

    async fn recompute_reputation(&self, user_id: Uuid) -> anyhow::Result<u32> {
        self.state().recompute(user_id)
    }

    async fn create_tip(&self, tip: &Tip) -> anyhow::Result<u32> {
        let mut state = self.state();
        if !state.users.contains_key(&tip.author_id) {
            anyhow::bail!("author {} does not exist", tip.author_id);
        }
        state.tips.insert(tip.id, tip.clone());
        state.recompute(tip.author_id)
    }

    async fn get_tip(&self, id: Uuid) -> anyhow::Result<Option<Tip>> {
        Ok(self.state().tips.get(&id).cloned())
    }

    async fn list_tips(&self, viewer: Option<Uuid>) -> anyhow::Result<Vec<TipSummary>> {
        let state = self.state();
        let mut summaries: Vec<TipSummary> = state
            .tips
            .values()
            .map(|tip| TipSummary {
                tip: tip.clone(),
                author_name: state
                    .users
                    .get(&tip.author_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
                tally: state.tally(tip.id),
                viewer_vote: viewer
                    .and_then(|v| state.votes.get(&(tip.id, v)).copied())
                    .unwrap_or_default(),
            })
            .collect();
        summaries.sort_by(|a, b| (b.tip.created_at, b.tip.id).cmp(&(a.tip.created_at, a.tip.id)));
        Ok(summaries)
    }

    async fn delete_tip(&self, id: Uuid) -> anyhow::Result<Option<u32>> {
        let mut state = self.state();
        let Some(tip) = state.tips.remove(&id) else {
            return Ok(None);
        };
        state.votes.retain(|(tip_id, _), _| *tip_id != id);
        state.recompute(tip.author_id).map(Some)
    }

    async fn toggle_vote(
        &self,
        tip_id: Uuid,
        voter_id: Uuid,
        direction: VoteDirection,
    ) -> anyhow::Result<Option<VoteChange>> {
        let mut state = self.state();
        let Some(author_id) = state.tips.get(&tip_id).map(|t| t.author_id) else {
            return Ok(None);
        };

        let key = (tip_id, voter_id);
        let next = state.votes.get(&key).copied().unwrap_or_default().toggled(direction);
        match next {
            VoteState::None => {
                state.votes.remove(&key);
            }
            held => {
                state.votes.insert(key, held);
            }
        }

        let author_reputation = state.recompute(author_id)?;
        Ok(Some(VoteChange { state: next, author_reputation }))
    }
}

/// Stores passwords with a marker prefix instead of hashing them.
pub struct PlainAuthProvider;

#[async_trait]
impl AuthProvider for PlainAuthProvider {
    fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        Ok(format!("plain${password}"))
    }

    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        hash.strip_prefix("plain$") == Some(password)
    }

    fn guest_name(&self, names: &[String]) -> String {
        names.first().cloned().unwrap_or_else(|| "defaultName".to_string())
    }
}
