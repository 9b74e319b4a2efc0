use gacha_execution::{classify, total_cost, validate_draw_count, Lottery};
use gacha_types::{
    api::{DrawResult, DrawnItem},
    Item, ItemId, PlayerId,
};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::{Backend, DrawCommit, Error};

impl Backend {
    /// Spend coins on `requested_count` draws.
    ///
    /// Draws happen before the store transaction opens; the transaction only debits the cost
    /// and adds the newly owned items. Nothing is written unless both succeed.
    pub async fn draw(&self, player_id: PlayerId, requested_count: i64) -> Result<DrawResult, Error> {
        let settings = self.master.active_settings().await?;
        let count =
            validate_draw_count(requested_count, settings.max_draw_count).map_err(Error::invalid)?;
        let cost = total_cost(settings.draw_cost, count).map_err(Error::invalid)?;

        let player = self
            .store
            .player(player_id)
            .await?
            .ok_or(Error::PlayerNotFound(player_id))?;
        if player.coins < cost {
            self.metrics.inc_insufficient_funds();
            return Err(Error::InsufficientFunds {
                balance: player.coins,
                cost,
            });
        }

        let items = self.master.items().await?;
        let lottery = Lottery::new(&items, &settings.per_tier_weights)?;
        let drawn = lottery.draw_many(&mut *self.rng(), count);

        let owned = self.store.owned_items(player_id).await?;
        let plan = classify(&drawn, &owned);
        let catalog: HashMap<ItemId, &Item> = items.iter().map(|item| (item.id, item)).collect();
        let results = plan
            .outcome
            .iter()
            .filter_map(|(id, is_new)| {
                catalog.get(id).map(|item| DrawnItem {
                    item_id: item.id,
                    item_name: item.name.clone(),
                    rarity_tier: item.rarity,
                    is_new: *is_new,
                })
            })
            .collect::<Vec<_>>();
        let new_count = plan.new_items.len();

        let balance = match self
            .store
            .commit_draw(player_id, cost, plan.new_items, Self::now_ms())
            .await
        {
            Ok(DrawCommit::Committed { balance }) => balance,
            Ok(DrawCommit::InsufficientFunds { balance }) => {
                self.metrics.inc_insufficient_funds();
                return Err(Error::InsufficientFunds { balance, cost });
            }
            Ok(DrawCommit::PlayerMissing) => return Err(Error::PlayerNotFound(player_id)),
            Err(err) => {
                self.metrics.inc_transaction_failure();
                warn!(player = player_id, ?err, "draw transaction rolled back");
                return Err(Error::Transaction(err));
            }
        };

        self.metrics.record_draw(results.len(), new_count);
        info!(
            player = player_id,
            count,
            cost,
            new = new_count,
            balance,
            "draw committed"
        );
        Ok(DrawResult { results })
    }
}
