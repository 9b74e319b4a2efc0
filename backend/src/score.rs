use gacha_execution::{assign_ranks, rank_offset, score_reward, RankingError};
use gacha_types::{
    api::{FinishResult, RankingPage},
    PlayerId,
};
use tracing::{info, warn};

use crate::{Backend, Error, ScoreCommit};

impl Backend {
    /// Record a finished game and pay out `score / 10` coins.
    ///
    /// The score record and high score update commit together; the payout is a separate
    /// increment after the commit.
    pub async fn finish(&self, player_id: PlayerId, score: i64) -> Result<FinishResult, Error> {
        let score = u64::try_from(score)
            .map_err(|_| Error::InvalidArgument(format!("score must be non-negative (got {score})")))?;

        match self
            .store
            .record_score(player_id, score, Self::now_ms())
            .await
        {
            Ok(ScoreCommit::Recorded { raised_high_score }) => {
                info!(player = player_id, score, raised_high_score, "score recorded");
            }
            Ok(ScoreCommit::PlayerMissing) => return Err(Error::PlayerNotFound(player_id)),
            Err(err) => {
                self.metrics.inc_transaction_failure();
                warn!(player = player_id, ?err, "score transaction rolled back");
                return Err(Error::Transaction(err));
            }
        }

        let credited_coins = score_reward(score);
        if credited_coins > 0 {
            self.store
                .credit_coins(player_id, credited_coins)
                .await?
                .ok_or(Error::PlayerNotFound(player_id))?;
        }
        self.metrics.record_score(credited_coins);
        Ok(FinishResult { credited_coins })
    }

    /// Leaderboard page of `page_size` entries starting at the one-based `start_rank`.
    pub async fn rankings(&self, start_rank: i64, page_size: u32) -> Result<RankingPage, Error> {
        if page_size == 0 {
            return Err(Error::invalid(RankingError::EmptyPage));
        }
        let offset = rank_offset(start_rank).map_err(Error::invalid)?;
        let rows = self.store.score_rows(offset, page_size).await?;
        Ok(RankingPage {
            ranks: assign_ranks(offset, rows),
        })
    }

    /// Leaderboard page sized by the active configuration.
    pub async fn ranking_page(&self, start_rank: i64) -> Result<RankingPage, Error> {
        let settings = self.master.active_settings().await?;
        self.rankings(start_rank, settings.ranking_page_size).await
    }
}
