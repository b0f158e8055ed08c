//! Reputation gates for downvoting and moderation.
//!
//! Predicates take the freshly loaded `User`, never a cached reputation.

use crate::models::{Tip, User};

/// Reputation needed to downvote other people's tips.
pub const DOWNVOTE_THRESHOLD: u32 = 15;
/// Reputation needed to delete other people's tips.
pub const MODERATE_DELETE_THRESHOLD: u32 = 30;

pub fn can_downvote(user: &User) -> bool {
    user.reputation >= DOWNVOTE_THRESHOLD || user.is_admin
}

pub fn can_moderate_delete(user: &User) -> bool {
    user.reputation >= MODERATE_DELETE_THRESHOLD || user.is_admin
}

pub fn is_author(user: &User, tip: &Tip) -> bool {
    user.id == tip.author_id
}

/// Authors may always downvote their own tip.
pub fn may_downvote(user: &User, tip: &Tip) -> bool {
    is_author(user, tip) || can_downvote(user)
}

/// Authors may always delete their own tip.
pub fn may_delete(user: &User, tip: &Tip) -> bool {
    is_author(user, tip) || can_moderate_delete(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn user_with(reputation: u32, is_admin: bool) -> User {
        let mut user = User::new("alice", "hash");
        user.reputation = reputation;
        user.is_admin = is_admin;
        user
    }

    #[rstest]
    #[case(0, false)]
    #[case(14, false)]
    #[case(15, true)]
    #[case(200, true)]
    fn downvote_threshold(#[case] reputation: u32, #[case] allowed: bool) {
        assert_eq!(can_downvote(&user_with(reputation, false)), allowed);
    }

    #[rstest]
    #[case(15, false)]
    #[case(29, false)]
    #[case(30, true)]
    fn moderation_threshold(#[case] reputation: u32, #[case] allowed: bool) {
        assert_eq!(can_moderate_delete(&user_with(reputation, false)), allowed);
    }

    #[test]
    fn administrators_bypass_thresholds() {
        let admin = user_with(0, true);
        assert!(can_downvote(&admin));
        assert!(can_moderate_delete(&admin));
    }

    #[test]
    fn author_is_exempt_on_own_tip() {
        let author = user_with(0, false);
        let stranger = user_with(0, false);
        let tip = Tip::new(author.id, "Use rustfmt");

        assert!(may_downvote(&author, &tip));
        assert!(may_delete(&author, &tip));
        assert!(!may_downvote(&stranger, &tip));
        assert!(!may_delete(&stranger, &tip));
    }
}
