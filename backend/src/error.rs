use gacha_execution::LotteryError;
use gacha_types::{PlayerId, SettingsId};
use std::time::Duration;
use thiserror::Error as ThisError;

/// Failure talking to the durable store.
#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store connection poisoned")]
    Poisoned,
    #[error("store task failed: {0}")]
    Task(String),
    #[error("{label} out of range for the store")]
    OutOfRange { label: &'static str },
}

/// Failure reading or writing the master data cache.
#[derive(Debug, ThisError)]
pub enum CacheError {
    /// The cache was never populated (or was cleared).
    #[error("cache miss")]
    Miss,
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("redis operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("cached value is malformed: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),
    #[error("game settings {0} not found")]
    SettingsNotFound(SettingsId),
    #[error("no active game settings")]
    NoActiveSettings,
    #[error("insufficient funds (balance={balance}, cost={cost})")]
    InsufficientFunds { balance: u64, cost: u64 },
    #[error("lottery misconfigured: {0}")]
    LotteryConfiguration(#[from] LotteryError),
    /// A store failure inside an atomic sequence. The transaction was rolled back.
    #[error("transaction failed: {0}")]
    Transaction(#[source] StoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl Error {
    pub(crate) fn invalid(err: impl std::fmt::Display) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
