//! Score rewards and leaderboard rank assignment.

use gacha_types::{api::RankingEntry, PlayerId, SCORE_PER_COIN};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingError {
    /// Start rank below 1.
    StartRankTooLow(i64),
    /// Page size of zero.
    EmptyPage,
}

impl std::fmt::Display for RankingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StartRankTooLow(start) => {
                write!(f, "start rank must be at least 1 (got {start})")
            }
            Self::EmptyPage => write!(f, "page size must be at least 1"),
        }
    }
}

impl std::error::Error for RankingError {}

/// A score record joined with its player's name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreRow {
    pub record_id: i64,
    pub player_id: PlayerId,
    pub player_name: String,
    pub score: u64,
    pub created_at_ms: u64,
}

/// Coins credited for a finished game.
pub const fn score_reward(score: u64) -> u64 {
    score / SCORE_PER_COIN
}

/// Zero-based offset for a one-based start rank.
pub fn rank_offset(start_rank: i64) -> Result<u64, RankingError> {
    if start_rank < 1 {
        return Err(RankingError::StartRankTooLow(start_rank));
    }
    Ok((start_rank - 1) as u64)
}

/// Leaderboard order: score descending, player id ascending, newest submission first.
pub fn compare_rows(a: &ScoreRow, b: &ScoreRow) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.player_id.cmp(&b.player_id))
        .then_with(|| b.created_at_ms.cmp(&a.created_at_ms))
        .then_with(|| b.record_id.cmp(&a.record_id))
}

/// Number rows positionally starting at `offset + 1`. Tied scores still get distinct ranks.
pub fn assign_ranks(offset: u64, rows: Vec<ScoreRow>) -> Vec<RankingEntry> {
    rows.into_iter()
        .zip(offset + 1..)
        .map(|(row, rank)| RankingEntry {
            player_id: row.player_id,
            player_name: row.player_name,
            rank,
            score: row.score,
        })
        .collect()
}
