//! Gacha execution logic.
//!
//! This crate contains the I/O-free parts of the draw and score pipelines: the weighted
//! lottery, draw planning and classification, score rewards and rank assignment. The backend
//! crate wires these to the durable store and the master data cache.
//!
//! ## Determinism requirements
//! - Randomness only comes from the `Rng` handed to [`Lottery::draw`]; seeding the same RNG
//!   reproduces the same draws.
//! - Lottery entries are scanned in ascending item id order, never in hash order.
//!
//! ## Minimal draw pipeline (example)
//! ```rust
//! use gacha_execution::{classify, total_cost, validate_draw_count, Lottery};
//! use gacha_types::{Item, Rarity, RarityWeights};
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::collections::HashSet;
//!
//! let catalog = vec![
//!     Item { id: 1, name: "Pebble".into(), rarity: Rarity::N },
//!     Item { id: 2, name: "Crown".into(), rarity: Rarity::SR },
//! ];
//! let count = validate_draw_count(3, 10).unwrap();
//! let cost = total_cost(100, count).unwrap();
//! assert_eq!(cost, 300);
//!
//! let lottery = Lottery::new(&catalog, &RarityWeights::new(9, 3, 1)).unwrap();
//! let mut rng = StdRng::seed_from_u64(7);
//! let drawn = lottery.draw_many(&mut rng, count);
//! let plan = classify(&drawn, &HashSet::new());
//! assert_eq!(plan.outcome.len(), 3);
//! ```

pub mod economy;
pub mod lottery;
pub mod ranking;

pub use economy::{classify, total_cost, validate_draw_count, Classification, DrawError};
pub use lottery::{Lottery, LotteryError};
pub use ranking::{assign_ranks, compare_rows, rank_offset, score_reward, RankingError, ScoreRow};
