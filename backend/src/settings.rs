use gacha_types::{GameSettings, NewGameSettings, SettingsId};
use std::sync::Arc;
use tracing::info;

use crate::{Backend, Error};

impl Backend {
    /// Store a new, inactive configuration.
    pub async fn add_settings(&self, input: NewGameSettings) -> Result<GameSettings, Error> {
        input.validate_invariants().map_err(Error::invalid)?;
        let settings = self.store.insert_settings(input, Self::now_ms()).await?;
        info!(settings = settings.id, "added game settings");
        Ok(settings)
    }

    pub async fn settings_list(&self) -> Result<Vec<GameSettings>, Error> {
        Ok(self.store.settings_list().await?)
    }

    pub async fn settings(&self, id: SettingsId) -> Result<GameSettings, Error> {
        self.store
            .settings(id)
            .await?
            .ok_or(Error::SettingsNotFound(id))
    }

    /// The configuration currently governing gameplay.
    pub async fn active_settings(&self) -> Result<Arc<GameSettings>, Error> {
        self.master.active_settings().await
    }

    pub async fn activate_settings(&self, id: SettingsId) -> Result<GameSettings, Error> {
        let settings = self.master.activate(id).await?;
        Ok(settings.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{backend, settings_input};
    use crate::Error;
    use gacha_types::RarityWeights;

    #[tokio::test]
    async fn test_settings_admin_flow() {
        let backend = backend();
        let first = backend
            .add_settings(settings_input(10, RarityWeights::new(1, 1, 1)))
            .await
            .unwrap();
        let second = backend
            .add_settings(settings_input(20, RarityWeights::new(2, 2, 2)))
            .await
            .unwrap();
        assert!(!first.active && !second.active);
        assert!(matches!(
            backend.active_settings().await,
            Err(Error::NoActiveSettings)
        ));

        let active = backend.activate_settings(second.id).await.unwrap();
        assert!(active.active);
        assert_eq!(backend.active_settings().await.unwrap().draw_cost, 20);
        assert_eq!(backend.settings(first.id).await.unwrap().draw_cost, 10);
        assert_eq!(backend.settings_list().await.unwrap().len(), 2);
        assert!(matches!(
            backend.settings(99).await,
            Err(Error::SettingsNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_rejects_zero_limits() {
        let backend = backend();
        let mut input = settings_input(10, RarityWeights::new(1, 1, 1));
        input.max_draw_count = 0;
        assert!(matches!(
            backend.add_settings(input).await,
            Err(Error::InvalidArgument(_))
        ));
    }
}
