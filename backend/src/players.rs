use gacha_types::{
    api::{CollectionItem, CollectionView, Registration},
    Player, PlayerId,
};
use tracing::info;
use uuid::Uuid;

use crate::{Backend, Error};

impl Backend {
    /// Create a player with an empty balance. The returned token is the only credential.
    pub async fn register(&self, name: &str) -> Result<Registration, Error> {
        Player::validate_name(name).map_err(Error::invalid)?;
        let token = Uuid::new_v4().to_string();
        let id = self
            .store
            .insert_player(name.to_string(), token.clone(), Self::now_ms())
            .await?;
        info!(player = id, "registered player");
        Ok(Registration { id, token })
    }

    /// Resolve a token to its player.
    pub async fn authenticate(&self, token: &str) -> Result<PlayerId, Error> {
        if token.is_empty() {
            return Err(Error::Unauthenticated);
        }
        self.store
            .player_by_token(token.to_string())
            .await?
            .ok_or(Error::Unauthenticated)
    }

    pub async fn player(&self, id: PlayerId) -> Result<Player, Error> {
        self.store
            .player(id)
            .await?
            .ok_or(Error::PlayerNotFound(id))
    }

    /// The whole catalog, marking which items the player owns.
    pub async fn collection(&self, id: PlayerId) -> Result<CollectionView, Error> {
        self.player(id).await?;
        let items = self.master.items().await?;
        let owned = self.store.owned_items(id).await?;
        let collections = items
            .iter()
            .map(|item| CollectionItem {
                item_id: item.id,
                item_name: item.name.clone(),
                rarity_tier: item.rarity,
                has_item: owned.contains(&item.id),
            })
            .collect();
        Ok(CollectionView { collections })
    }

    /// Operator credit outside of gameplay.
    pub async fn grant_coins(&self, id: PlayerId, amount: u64) -> Result<Player, Error> {
        if amount == 0 {
            return Err(Error::InvalidArgument("grant amount must be positive".to_string()));
        }
        self.store
            .credit_coins(id, amount)
            .await?
            .ok_or(Error::PlayerNotFound(id))?;
        info!(player = id, amount, "granted coins");
        self.player(id).await
    }
}
