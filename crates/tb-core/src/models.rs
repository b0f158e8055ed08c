//! # Domain Models
//!
//! These structs represent the core entities of Tipboard.
//! We use UUID v7 for time-ordered, globally unique identification.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::voting::VoteState;

/// A registered member of the community.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique login name, immutable once set
    pub username: String,
    /// Argon2 PHC string, never rendered
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Derived from votes on authored tips; only written by reputation recompute
    pub reputation: u32,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: username.into(),
            password_hash: password_hash.into(),
            reputation: 0,
            is_admin: false,
            created_at: Utc::now(),
        }
    }
}

/// A single user-submitted text entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tip {
    pub id: Uuid,
    pub content: String,
    /// Fixed at creation
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Tip {
    pub fn new(author_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            content: content.into(),
            author_id,
            created_at: Utc::now(),
        }
    }
}

/// Vote counts on one tip, the only input reputation depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipTally {
    pub upvotes: u32,
    pub downvotes: u32,
}

/// A tip joined with its author's name, its tally and the viewer's own vote.
///
/// This is the read model behind the home page listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TipSummary {
    pub tip: Tip,
    pub author_name: String,
    pub tally: TipTally,
    /// `VoteState::None` for guests
    pub viewer_vote: VoteState,
}

/// Result of a committed vote toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteChange {
    pub state: VoteState,
    /// Author's reputation after the recompute that ran in the same transaction
    pub author_reputation: u32,
}

/// The party performing an operation, passed explicitly to every call.
#[derive(Debug, Clone)]
pub enum Actor {
    Guest,
    Member(User),
}

impl Actor {
    /// Returns the logged-in user or refuses with `Unauthorized`.
    pub fn require(&self) -> crate::Result<&User> {
        match self {
            Actor::Member(user) => Ok(user),
            Actor::Guest => Err(crate::AppError::Unauthorized("login required".to_string())),
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Actor::Member(user) => Some(user),
            Actor::Guest => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::Member(_))
    }
}
