/// Maximum player name length in bytes.
pub const MAX_NAME_LENGTH: usize = 128;

/// Score points per credited coin; the payout rounds down.
pub const SCORE_PER_COIN: u64 = 10;

/// Coins granted on registration.
pub const INITIAL_COINS: u64 = 0;
