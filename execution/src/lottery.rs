//! Weighted lottery over the item catalog.
//!
//! Each item's weight comes from its rarity tier via the active configuration. A draw samples
//! `r` uniformly in `[0, total_weight)` and selects the first item (in ascending id order)
//! whose running weight sum exceeds `r`. Draws within one request are independent and with
//! replacement.

use gacha_types::{Item, ItemId, RarityWeights};
use rand::Rng;

/// Error building a lottery from a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotteryError {
    /// Empty catalog, or every item has zero weight.
    ZeroTotalWeight,
    /// Sum of weights does not fit in a `u64`.
    WeightOverflow,
}

impl std::fmt::Display for LotteryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroTotalWeight => write!(f, "total lottery weight is zero"),
            Self::WeightOverflow => write!(f, "total lottery weight overflows"),
        }
    }
}

impl std::error::Error for LotteryError {}

#[derive(Clone, Debug)]
pub struct Lottery {
    entries: Vec<(ItemId, u64)>,
    total_weight: u64,
}

impl Lottery {
    /// Build a lottery from a catalog snapshot and per-tier weights.
    ///
    /// Zero-weight items are kept (they can never be selected) so the scan order matches the
    /// catalog exactly.
    pub fn new(items: &[Item], weights: &RarityWeights) -> Result<Self, LotteryError> {
        let mut entries: Vec<(ItemId, u64)> = items
            .iter()
            .map(|item| (item.id, u64::from(weights.weight(item.rarity))))
            .collect();
        entries.sort_by_key(|(id, _)| *id);

        let total_weight = entries
            .iter()
            .try_fold(0u64, |acc, (_, weight)| acc.checked_add(*weight))
            .ok_or(LotteryError::WeightOverflow)?;
        if total_weight == 0 {
            return Err(LotteryError::ZeroTotalWeight);
        }

        Ok(Self {
            entries,
            total_weight,
        })
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Draw a single item.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> ItemId {
        let r = rng.gen_range(0..self.total_weight);
        self.select(r)
    }

    /// Draw `count` items with replacement, preserving draw order.
    pub fn draw_many<R: Rng + ?Sized>(&self, rng: &mut R, count: u32) -> Vec<ItemId> {
        (0..count).map(|_| self.draw(rng)).collect()
    }

    // `r < total_weight` guarantees a match; the fallback is the last positive-weight entry.
    fn select(&self, r: u64) -> ItemId {
        let mut running = 0u64;
        let mut last_positive = self.entries[0].0;
        for (id, weight) in &self.entries {
            if *weight == 0 {
                continue;
            }
            running += weight;
            last_positive = *id;
            if r < running {
                return *id;
            }
        }
        last_positive
    }
}
