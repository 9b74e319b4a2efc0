use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Store-assigned item identifier.
pub type ItemId = i64;

/// Rarity tier of a catalog item. Tiers are ordered `N < R < SR`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rarity {
    N,
    R,
    SR,
}

#[derive(Debug, ThisError, PartialEq, Eq)]
#[error("unknown rarity tier {0} (expected 1, 2 or 3)")]
pub struct UnknownRarity(pub i64);

impl Rarity {
    pub const ALL: [Rarity; 3] = [Rarity::N, Rarity::R, Rarity::SR];

    /// Integer code used by the durable store.
    pub const fn code(self) -> i64 {
        match self {
            Self::N => 1,
            Self::R => 2,
            Self::SR => 3,
        }
    }
}

impl TryFrom<i64> for Rarity {
    type Error = UnknownRarity;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::N),
            2 => Ok(Self::R),
            3 => Ok(Self::SR),
            other => Err(UnknownRarity(other)),
        }
    }
}

impl std::str::FromStr for Rarity {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "N" | "1" => Ok(Self::N),
            "R" | "2" => Ok(Self::R),
            "SR" | "3" => Ok(Self::SR),
            _ => Err("valid values: N, R, SR"),
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::N => write!(f, "N"),
            Self::R => write!(f, "R"),
            Self::SR => write!(f, "SR"),
        }
    }
}

/// Catalog entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub rarity: Rarity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rarity_tiers_are_ordered() {
        assert!(Rarity::N < Rarity::R);
        assert!(Rarity::R < Rarity::SR);
    }

    #[test]
    fn rarity_codes_match_store_layout() {
        for rarity in Rarity::ALL {
            assert_eq!(Rarity::try_from(rarity.code()), Ok(rarity));
        }
        assert_eq!(Rarity::try_from(0), Err(UnknownRarity(0)));
        assert_eq!(Rarity::try_from(4), Err(UnknownRarity(4)));
    }

    #[test]
    fn rarity_parses_names_and_codes() {
        assert_eq!("sr".parse::<Rarity>(), Ok(Rarity::SR));
        assert_eq!("2".parse::<Rarity>(), Ok(Rarity::R));
        assert!("ssr".parse::<Rarity>().is_err());
    }

    #[test]
    fn item_serializes_tier_by_name() {
        let item = Item {
            id: 7,
            name: "Golden Cat".to_string(),
            rarity: Rarity::SR,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert_eq!(json, r#"{"id":7,"name":"Golden Cat","rarity":"SR"}"#);
        let back: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
