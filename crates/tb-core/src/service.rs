//! # TipService
//!
//! Orchestrates accounts, tips and votes over the `TipRepo` and
//! `AuthProvider` ports. The acting user is always an explicit `Actor`
//! argument; nothing here reads ambient request state.

use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, DuplicateUsername, Result};
use crate::models::{Actor, Tip, TipSummary, User, VoteChange};
use crate::permissions;
use crate::traits::{AuthProvider, TipRepo};
use crate::voting::VoteDirection;

pub const DOWNVOTE_DENIED: &str = "You don't have permission to downvote this tip.";
pub const DELETE_DENIED: &str = "You don't have permission to delete this tip.";
pub const PASSWORDS_DIFFER: &str = "Passwords do not match";
pub const EMPTY_USERNAME: &str = "Empty username field";
pub const USERNAME_TAKEN: &str = "Username already taken";
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Clone)]
pub struct TipService {
    repo: Arc<dyn TipRepo>,
    auth: Arc<dyn AuthProvider>,
}

fn tip_not_found(id: Uuid) -> AppError {
    AppError::NotFound("Tip".to_string(), id.to_string())
}

impl TipService {
    pub fn new(repo: Arc<dyn TipRepo>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { repo, auth }
    }

    pub fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    /// Turns a session's user id into an `Actor`, reloading the user so
    /// permission checks see the current reputation.
    ///
    /// A stale id (user deleted since login) resolves to `Actor::Guest`.
    pub async fn resolve_actor(&self, user_id: Option<Uuid>) -> Result<Actor> {
        let Some(id) = user_id else {
            return Ok(Actor::Guest);
        };
        match self.repo.get_user(id).await? {
            Some(user) => Ok(Actor::Member(user)),
            None => {
                warn!("session refers to unknown user {id}");
                Ok(Actor::Guest)
            }
        }
    }

    // ── Accounts ─────────────────────────────────────────────────────────────

    /// Creates an account without the form-level checks of `register`.
    pub async fn create_account(&self, username: &str, password: &str, is_admin: bool) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::ValidationError(EMPTY_USERNAME.to_string()));
        }
        if self.repo.find_user_by_name(username).await?.is_some() {
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let hash = self.auth.hash_password(password)?;
        let mut user = User::new(username, hash);
        user.is_admin = is_admin;
        // The lookup above can race with another registration; the store's
        // uniqueness check is authoritative.
        if let Err(err) = self.repo.create_user(&user).await {
            if err.is::<DuplicateUsername>() {
                return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
            }
            return Err(err.into());
        }

        info!("registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Registration form: confirmation is checked first, then the username.
    pub async fn register(&self, username: &str, password: &str, password_confirm: &str) -> Result<User> {
        if password != password_confirm {
            return Err(AppError::ValidationError(PASSWORDS_DIFFER.to_string()));
        }
        self.create_account(username, password, false).await
    }

    pub async fn find_user_by_name(&self, username: &str) -> Result<Option<User>> {
        Ok(self.repo.find_user_by_name(username.trim()).await?)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let user = self
            .repo
            .find_user_by_name(username.trim())
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !self.auth.verify_password(password, &user.password_hash).await {
            warn!("failed login for {}", user.username);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        info!("user {} logged in", user.username);
        Ok(user)
    }

    // ── Tips ─────────────────────────────────────────────────────────────────

    pub async fn list_tips(&self, actor: &Actor) -> Result<Vec<TipSummary>> {
        Ok(self.repo.list_tips(actor.user().map(|u| u.id)).await?)
    }

    pub async fn post_tip(&self, actor: &Actor, content: &str) -> Result<Tip> {
        let author = actor.require()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::ValidationError("tip content is required".to_string()));
        }

        let tip = Tip::new(author.id, content);
        let reputation = self.repo.create_tip(&tip).await?;
        info!("{} posted tip {} (reputation {reputation})", author.username, tip.id);
        Ok(tip)
    }

    /// Deletes a tip as its author or as a moderator.
    ///
    /// Returns the author's reputation after the recompute.
    pub async fn delete_tip(&self, actor: &Actor, tip_id: Uuid) -> Result<u32> {
        let user = actor.require()?;
        let tip = self.repo.get_tip(tip_id).await?.ok_or_else(|| tip_not_found(tip_id))?;

        if !permissions::may_delete(user, &tip) {
            warn!("{} (reputation {}) refused delete of tip {tip_id}", user.username, user.reputation);
            return Err(AppError::Forbidden(DELETE_DENIED.to_string()));
        }

        let reputation = self.repo.delete_tip(tip_id).await?.ok_or_else(|| tip_not_found(tip_id))?;
        info!("{} deleted tip {tip_id}; author reputation now {reputation}", user.username);
        Ok(reputation)
    }

    // ── Votes ────────────────────────────────────────────────────────────────

    /// Toggles `actor`'s vote on a tip.
    ///
    /// Checks run in order: authentication, tip existence, downvote gate.
    /// Voting on one's own tip is allowed in both directions.
    pub async fn toggle_vote(&self, actor: &Actor, tip_id: Uuid, direction: VoteDirection) -> Result<VoteChange> {
        let user = actor.require()?;
        let tip = self.repo.get_tip(tip_id).await?.ok_or_else(|| tip_not_found(tip_id))?;

        if direction == VoteDirection::Down && !permissions::may_downvote(user, &tip) {
            warn!("{} (reputation {}) refused downvote on tip {tip_id}", user.username, user.reputation);
            return Err(AppError::Forbidden(DOWNVOTE_DENIED.to_string()));
        }

        let change = self
            .repo
            .toggle_vote(tip_id, user.id, direction)
            .await?
            .ok_or_else(|| tip_not_found(tip_id))?;

        info!(
            "{} voted {direction:?} on tip {tip_id}: now {:?}, author reputation {}",
            user.username, change.state, change.author_reputation
        );
        Ok(change)
    }

    pub async fn recompute_reputation(&self, user_id: Uuid) -> Result<u32> {
        Ok(self.repo.recompute_reputation(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryTipRepo, PlainAuthProvider};
    use crate::voting::VoteState;

    struct Fixture {
        service: TipService,
        repo: Arc<InMemoryTipRepo>,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryTipRepo::default());
        let service = TipService::new(repo.clone(), Arc::new(PlainAuthProvider));
        Fixture { service, repo }
    }

    impl Fixture {
        async fn member(&self, name: &str) -> Actor {
            let user = self.service.create_account(name, "pw", false).await.unwrap();
            Actor::Member(user)
        }

        /// Reloads the actor so reputation reflects committed votes.
        async fn reload(&self, actor: &Actor) -> Actor {
            let id = actor.user().unwrap().id;
            self.service.resolve_actor(Some(id)).await.unwrap()
        }

        async fn reputation_of(&self, actor: &Actor) -> u32 {
            self.reload(actor).await.user().unwrap().reputation
        }

        /// Registers `n` fresh voters who each upvote `tip`.
        async fn upvote_n(&self, tip: &Tip, n: usize, prefix: &str) {
            for i in 0..n {
                let voter = self.member(&format!("{prefix}{i}")).await;
                self.service.toggle_vote(&voter, tip.id, VoteDirection::Up).await.unwrap();
            }
        }
    }

    #[tokio::test]
    async fn upvote_toggles_on_and_off() {
        let f = fixture();
        let author = f.member("author").await;
        let voter = f.member("voter").await;
        let tip = f.service.post_tip(&author, "Prefer iterators").await.unwrap();

        let first = f.service.toggle_vote(&voter, tip.id, VoteDirection::Up).await.unwrap();
        assert_eq!(first.state, VoteState::Upvoted);
        assert_eq!(first.author_reputation, 5);

        let second = f.service.toggle_vote(&voter, tip.id, VoteDirection::Up).await.unwrap();
        assert_eq!(second.state, VoteState::None);
        assert_eq!(second.author_reputation, 0);
    }

    #[tokio::test]
    async fn upvote_replaces_existing_downvote() {
        let f = fixture();
        let author = f.member("author").await;
        let tip = f.service.post_tip(&author, "Clippy is your friend").await.unwrap();

        // Author may downvote their own tip with zero reputation.
        let down = f.service.toggle_vote(&author, tip.id, VoteDirection::Down).await.unwrap();
        assert_eq!(down.state, VoteState::Downvoted);

        let up = f.service.toggle_vote(&author, tip.id, VoteDirection::Up).await.unwrap();
        assert_eq!(up.state, VoteState::Upvoted);

        let listed = f.service.list_tips(&author).await.unwrap();
        assert_eq!(listed[0].tally.upvotes, 1);
        assert_eq!(listed[0].tally.downvotes, 0);
        assert_eq!(listed[0].viewer_vote, VoteState::Upvoted);
    }

    #[tokio::test]
    async fn low_reputation_downvote_is_forbidden_without_mutation() {
        let f = fixture();
        let author = f.member("author").await;
        let voter = f.member("voter").await;
        let tip = f.service.post_tip(&author, "Write tests").await.unwrap();
        f.service.toggle_vote(&voter, tip.id, VoteDirection::Up).await.unwrap();

        let err = f.service.toggle_vote(&voter, tip.id, VoteDirection::Down).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m == DOWNVOTE_DENIED));

        // The existing upvote survives the refused request.
        let listed = f.service.list_tips(&voter).await.unwrap();
        assert_eq!(listed[0].viewer_vote, VoteState::Upvoted);
        assert_eq!(f.reputation_of(&author).await, 5);
    }

    #[tokio::test]
    async fn downvote_unlocks_at_fifteen_reputation() {
        let f = fixture();
        let author = f.member("author").await;
        let earner = f.member("earner").await;
        let target = f.service.post_tip(&author, "Borrow, don't clone").await.unwrap();
        let earned = f.service.post_tip(&earner, "Read the book").await.unwrap();

        f.upvote_n(&earned, 2, "fan").await;
        let earner = f.reload(&earner).await;
        assert_eq!(earner.user().unwrap().reputation, 10);
        assert!(f.service.toggle_vote(&earner, target.id, VoteDirection::Down).await.is_err());

        f.upvote_n(&earned, 1, "late-fan").await;
        let earner = f.reload(&earner).await;
        assert_eq!(earner.user().unwrap().reputation, 15);
        let change = f.service.toggle_vote(&earner, target.id, VoteDirection::Down).await.unwrap();
        assert_eq!(change.state, VoteState::Downvoted);
        assert_eq!(change.author_reputation, 0);
    }

    #[tokio::test]
    async fn administrators_downvote_regardless_of_reputation() {
        let f = fixture();
        let author = f.member("author").await;
        let admin = Actor::Member(f.service.create_account("root", "pw", true).await.unwrap());
        let tip = f.service.post_tip(&author, "unsafe everywhere").await.unwrap();

        let change = f.service.toggle_vote(&admin, tip.id, VoteDirection::Down).await.unwrap();
        assert_eq!(change.state, VoteState::Downvoted);
    }

    #[tokio::test]
    async fn guests_are_refused_before_lookup() {
        let f = fixture();
        let err = f
            .service
            .toggle_vote(&Actor::Guest, Uuid::now_v7(), VoteDirection::Down)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let err = f.service.post_tip(&Actor::Guest, "hello").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn unknown_tip_is_not_found() {
        let f = fixture();
        let voter = f.member("voter").await;
        let err = f.service.toggle_vote(&voter, Uuid::now_v7(), VoteDirection::Up).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));

        let err = f.service.delete_tip(&voter, Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn deleting_upvoted_tip_drops_reputation_by_twenty() {
        let f = fixture();
        let author = f.member("author").await;
        let popular = f.service.post_tip(&author, "cargo doc --open").await.unwrap();
        f.service.post_tip(&author, "quiet tip").await.unwrap();
        f.upvote_n(&popular, 4, "fan").await;
        assert_eq!(f.reputation_of(&author).await, 20);

        let after = f.service.delete_tip(&author, popular.id).await.unwrap();
        assert_eq!(after, 0);
        assert_eq!(f.reputation_of(&author).await, 0);
        assert_eq!(f.service.list_tips(&author).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn moderation_delete_requires_thirty_reputation() {
        let f = fixture();
        let author = f.member("author").await;
        let moderator = f.member("moderator").await;
        let tip = f.service.post_tip(&author, "spam").await.unwrap();
        let earned = f.service.post_tip(&moderator, "real advice").await.unwrap();

        f.upvote_n(&earned, 5, "fan").await;
        let moderator = f.reload(&moderator).await;
        let err = f.service.delete_tip(&moderator, tip.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m == DELETE_DENIED));

        f.upvote_n(&earned, 1, "late-fan").await;
        let moderator = f.reload(&moderator).await;
        f.service.delete_tip(&moderator, tip.id).await.unwrap();
        assert!(f.repo.tip_count() == 1);
    }

    #[tokio::test]
    async fn author_deletes_own_tip_with_zero_reputation() {
        let f = fixture();
        let author = f.member("author").await;
        let tip = f.service.post_tip(&author, "temporary").await.unwrap();
        assert_eq!(f.service.delete_tip(&author, tip.id).await.unwrap(), 0);
        assert_eq!(f.repo.tip_count(), 0);
    }

    #[tokio::test]
    async fn registration_errors_follow_form_order() {
        let f = fixture();
        let err = f.service.register("", "a", "b").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m == PASSWORDS_DIFFER));

        let err = f.service.register("  ", "a", "a").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m == EMPTY_USERNAME));

        f.service.register("alice", "a", "a").await.unwrap();
        let err = f.service.register("alice", "b", "b").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == USERNAME_TAKEN));
    }

    #[tokio::test]
    async fn login_checks_password() {
        let f = fixture();
        f.service.register("alice", "secret", "secret").await.unwrap();

        let user = f.service.login("alice", "secret").await.unwrap();
        assert_eq!(user.username, "alice");

        let err = f.service.login("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == INVALID_CREDENTIALS));
        let err = f.service.login("bob", "secret").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn empty_tip_is_rejected() {
        let f = fixture();
        let author = f.member("author").await;
        let err = f.service.post_tip(&author, "   \n").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(f.repo.tip_count(), 0);
    }

    #[tokio::test]
    async fn stale_session_resolves_to_guest() {
        let f = fixture();
        let actor = f.service.resolve_actor(Some(Uuid::now_v7())).await.unwrap();
        assert!(!actor.is_authenticated());
    }

    #[tokio::test]
    async fn admin_accounts_are_found_by_trimmed_name() {
        let f = fixture();
        let admin = f.service.create_account(" root ", "pw", true).await.unwrap();
        assert!(admin.is_admin);

        let found = f.service.find_user_by_name("root").await.unwrap().unwrap();
        assert_eq!(found.id, admin.id);
        assert!(f.service.find_user_by_name("nobody").await.unwrap().is_none());
    }

    /// Hides existing users from the lookup, as if a concurrent registration
    /// committed between `find_user_by_name` and `create_user`.
    struct LateCommitRepo(InMemoryTipRepo);

    #[async_trait::async_trait]
    impl TipRepo for LateCommitRepo {
        async fn create_user(&self, user: &User) -> anyhow::Result<()> {
            self.0.create_user(user).await
        }
        async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
            self.0.get_user(id).await
        }
        async fn find_user_by_name(&self, _username: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn recompute_reputation(&self, user_id: Uuid) -> anyhow::Result<u32> {
            self.0.recompute_reputation(user_id).await
        }
        async fn create_tip(&self, tip: &Tip) -> anyhow::Result<u32> {
            self.0.create_tip(tip).await
        }
        async fn get_tip(&self, id: Uuid) -> anyhow::Result<Option<Tip>> {
            self.0.get_tip(id).await
        }
        async fn list_tips(&self, viewer: Option<Uuid>) -> anyhow::Result<Vec<TipSummary>> {
            self.0.list_tips(viewer).await
        }
        async fn delete_tip(&self, id: Uuid) -> anyhow::Result<Option<u32>> {
            self.0.delete_tip(id).await
        }
        async fn toggle_vote(
            &self,
            tip_id: Uuid,
            voter_id: Uuid,
            direction: VoteDirection,
        ) -> anyhow::Result<Option<VoteChange>> {
            self.0.toggle_vote(tip_id, voter_id, direction).await
        }
    }

    #[tokio::test]
    async fn racing_registration_reports_conflict() {
        let service = TipService::new(
            Arc::new(LateCommitRepo(InMemoryTipRepo::default())),
            Arc::new(PlainAuthProvider),
        );
        service.register("alice", "pw", "pw").await.unwrap();

        let err = service.register("alice", "pw", "pw").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == USERNAME_TAKEN));
    }
}
