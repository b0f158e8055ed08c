//! # Vote membership
//!
//! Each (user, tip) pair holds exactly one `VoteState`. Holding an upvote and a
//! downvote at once is unrepresentable.

use serde::{Deserialize, Serialize};

/// The action a user takes on a tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

/// A user's standing vote on one tip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteState {
    #[default]
    None,
    Upvoted,
    Downvoted,
}

impl VoteState {
    /// Applies a click in `direction`.
    ///
    /// Clicking the direction already held retracts it; anything else moves
    /// the user into the requested state, dropping the opposite vote.
    pub fn toggled(self, direction: VoteDirection) -> VoteState {
        match (self, direction) {
            (VoteState::Upvoted, VoteDirection::Up) | (VoteState::Downvoted, VoteDirection::Down) => {
                VoteState::None
            }
            (_, VoteDirection::Up) => VoteState::Upvoted,
            (_, VoteDirection::Down) => VoteState::Downvoted,
        }
    }

    /// Storage encoding: `1` for an upvote, `-1` for a downvote, `None` for no row.
    pub fn as_sign(self) -> Option<i64> {
        match self {
            VoteState::None => None,
            VoteState::Upvoted => Some(1),
            VoteState::Downvoted => Some(-1),
        }
    }

    pub fn from_sign(sign: Option<i64>) -> VoteState {
        match sign {
            Some(s) if s > 0 => VoteState::Upvoted,
            Some(s) if s < 0 => VoteState::Downvoted,
            _ => VoteState::None,
        }
    }

    pub fn is_upvoted(self) -> bool {
        self == VoteState::Upvoted
    }

    pub fn is_downvoted(self) -> bool {
        self == VoteState::Downvoted
    }
}
