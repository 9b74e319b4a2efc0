//! Draw planning: count validation, cost, and new/owned classification.
//!
//! Everything here runs before the store transaction opens, so the transaction itself only
//! performs the debit and the collection inserts.

use gacha_types::ItemId;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    /// Requested count below 1.
    CountTooLow(i64),
    /// Requested count above the configured maximum.
    CountTooHigh { requested: i64, max: u32 },
    /// `draw_cost * count` does not fit in a `u64`.
    CostOverflow { draw_cost: u64, count: u32 },
}

impl std::fmt::Display for DrawError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CountTooLow(requested) => {
                write!(f, "draw count must be at least 1 (got {requested})")
            }
            Self::CountTooHigh { requested, max } => {
                write!(f, "draw count must be at most {max} (got {requested})")
            }
            Self::CostOverflow { draw_cost, count } => {
                write!(f, "draw cost overflows ({draw_cost} x {count})")
            }
        }
    }
}

impl std::error::Error for DrawError {}

pub fn validate_draw_count(requested: i64, max: u32) -> Result<u32, DrawError> {
    if requested < 1 {
        return Err(DrawError::CountTooLow(requested));
    }
    if requested > i64::from(max) {
        return Err(DrawError::CountTooHigh { requested, max });
    }
    // bounded by `max` above
    Ok(requested as u32)
}

pub fn total_cost(draw_cost: u64, count: u32) -> Result<u64, DrawError> {
    draw_cost
        .checked_mul(u64::from(count))
        .ok_or(DrawError::CostOverflow { draw_cost, count })
}

/// Drawn items tagged new/owned, plus the deduplicated set to insert.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Classification {
    /// `(item, is_new)` in draw order.
    pub outcome: Vec<(ItemId, bool)>,
    /// Items not owned before this request, each once, in first-drawn order.
    pub new_items: Vec<ItemId>,
}

/// Classify a draw against the player's current collection.
///
/// Only the first occurrence of a not-yet-owned item is marked new; later copies in the same
/// request are already owned by the time they are revealed.
pub fn classify(drawn: &[ItemId], owned: &HashSet<ItemId>) -> Classification {
    let mut seen: HashSet<ItemId> = HashSet::with_capacity(drawn.len());
    let mut classification = Classification {
        outcome: Vec::with_capacity(drawn.len()),
        new_items: Vec::new(),
    };
    for id in drawn {
        let is_new = !owned.contains(id) && seen.insert(*id);
        if is_new {
            classification.new_items.push(*id);
        }
        classification.outcome.push((*id, is_new));
    }
    tracing::trace!(
        drawn = drawn.len(),
        new = classification.new_items.len(),
        "classified draw"
    );
    classification
}
