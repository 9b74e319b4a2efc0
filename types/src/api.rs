//! Response payloads exposed to the transport layer.
//!
//! Transport framing is handled elsewhere; these types only fix the payload shape.

use serde::{Deserialize, Serialize};

use crate::{AuthToken, ItemId, PlayerId, Rarity};

/// One drawn item, tagged with whether the draw added it to the collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawnItem {
    pub item_id: ItemId,
    pub item_name: String,
    pub rarity_tier: Rarity,
    pub is_new: bool,
}

/// Result of a draw request, in draw order.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrawResult {
    pub results: Vec<DrawnItem>,
}

impl DrawResult {
    pub fn new_count(&self) -> usize {
        self.results.iter().filter(|item| item.is_new).count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishResult {
    pub credited_coins: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub player_id: PlayerId,
    pub player_name: String,
    pub rank: u64,
    pub score: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RankingPage {
    pub ranks: Vec<RankingEntry>,
}

/// Catalog entry annotated with ownership for one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    pub item_id: ItemId,
    pub item_name: String,
    pub rarity_tier: Rarity,
    pub has_item: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollectionView {
    pub collections: Vec<CollectionItem>,
}

/// Returned once on registration; the token is never shown again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: PlayerId,
    pub token: AuthToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_result_shape() {
        let result = DrawResult {
            results: vec![
                DrawnItem {
                    item_id: 1,
                    item_name: "Pebble".to_string(),
                    rarity_tier: Rarity::N,
                    is_new: true,
                },
                DrawnItem {
                    item_id: 1,
                    item_name: "Pebble".to_string(),
                    rarity_tier: Rarity::N,
                    is_new: false,
                },
            ],
        };
        assert_eq!(result.new_count(), 1);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["results"][0]["itemId"], 1);
        assert_eq!(value["results"][0]["rarityTier"], "N");
        assert_eq!(value["results"][1]["isNew"], false);
    }

    #[test]
    fn finish_and_ranking_shape() {
        let finish = serde_json::to_value(FinishResult { credited_coins: 12 }).unwrap();
        assert_eq!(finish["creditedCoins"], 12);

        let page = RankingPage {
            ranks: vec![RankingEntry {
                player_id: 4,
                player_name: "bob".to_string(),
                rank: 1,
                score: 80,
            }],
        };
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["ranks"][0]["playerName"], "bob");
        assert_eq!(value["ranks"][0]["rank"], 1);
    }
}
