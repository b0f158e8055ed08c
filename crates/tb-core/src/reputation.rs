//! Reputation scoring.

use crate::models::TipTally;

/// Points an author earns per upvote on one of their tips.
pub const UPVOTE_WEIGHT: i64 = 5;
/// Points an author loses per downvote on one of their tips.
pub const DOWNVOTE_WEIGHT: i64 = 2;

/// Scores a user from the tallies of every tip they authored.
///
/// Always a full rescan; the result is floored at zero.
pub fn score<I>(tallies: I) -> u32
where
    I: IntoIterator<Item = TipTally>,
{
    let raw: i64 = tallies
        .into_iter()
        .map(|t| UPVOTE_WEIGHT * i64::from(t.upvotes) - DOWNVOTE_WEIGHT * i64::from(t.downvotes))
        .sum();
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}
