use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::Rarity;

/// Store-assigned game settings identifier.
pub type SettingsId = i64;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum SettingsInvariantError {
    #[error("max_draw_count must be at least 1")]
    ZeroMaxDrawCount,
    #[error("ranking_page_size must be at least 1")]
    ZeroRankingPageSize,
}

/// Per-tier lottery weights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RarityWeights {
    pub n: u32,
    pub r: u32,
    pub sr: u32,
}

impl RarityWeights {
    pub const fn new(n: u32, r: u32, sr: u32) -> Self {
        Self { n, r, sr }
    }

    pub const fn weight(&self, rarity: Rarity) -> u32 {
        match rarity {
            Rarity::N => self.n,
            Rarity::R => self.r,
            Rarity::SR => self.sr,
        }
    }
}

/// A game configuration row. Exactly one row is active at a time; the active row governs
/// draw cost, lottery weights, draw limits and leaderboard page size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub id: SettingsId,
    pub draw_cost: u64,
    pub ranking_page_size: u32,
    pub per_tier_weights: RarityWeights,
    pub max_draw_count: u32,
    pub created_at_ms: u64,
    pub active: bool,
}

/// Input for creating a configuration. New rows start inactive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameSettings {
    pub draw_cost: u64,
    pub ranking_page_size: u32,
    pub per_tier_weights: RarityWeights,
    pub max_draw_count: u32,
}

impl NewGameSettings {
    pub fn validate_invariants(&self) -> Result<(), SettingsInvariantError> {
        if self.max_draw_count == 0 {
            return Err(SettingsInvariantError::ZeroMaxDrawCount);
        }
        if self.ranking_page_size == 0 {
            return Err(SettingsInvariantError::ZeroRankingPageSize);
        }
        Ok(())
    }
}
