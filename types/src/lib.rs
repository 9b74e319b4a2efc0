//! Gacha domain types.
//!
//! Defines the catalog, game settings, player and response payload types shared by the
//! execution logic and the backend service.

pub mod api;
mod constants;
mod item;
mod player;
mod settings;

pub use constants::*;
pub use item::{Item, ItemId, Rarity, UnknownRarity};
pub use player::{AuthToken, Player, PlayerId, PlayerInvariantError};
pub use settings::{GameSettings, NewGameSettings, RarityWeights, SettingsId, SettingsInvariantError};
