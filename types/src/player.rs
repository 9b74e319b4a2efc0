use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use super::MAX_NAME_LENGTH;

/// Store-assigned player identifier.
pub type PlayerId = i64;

/// Opaque authentication credential, unique across players.
pub type AuthToken = String;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum PlayerInvariantError {
    #[error("player name is empty")]
    EmptyName,
    #[error("player name too long (len={len}, max={max})")]
    NameTooLong { len: usize, max: usize },
}

/// Player state. `coins` only changes through draws and score rewards; `high_score` never
/// decreases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub coins: u64,
    pub high_score: u64,
}

impl Player {
    pub fn validate_name(name: &str) -> Result<(), PlayerInvariantError> {
        if name.trim().is_empty() {
            return Err(PlayerInvariantError::EmptyName);
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(PlayerInvariantError::NameTooLong {
                len: name.len(),
                max: MAX_NAME_LENGTH,
            });
        }
        Ok(())
    }
}
