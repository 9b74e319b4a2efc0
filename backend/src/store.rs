//! Durable SQLite store.
//!
//! A single connection lives behind a mutex; every call runs on the blocking pool. Multi-step
//! mutations use `BEGIN IMMEDIATE` so the write lock is taken before any row is read, and an
//! early return drops the transaction, rolling it back.

use gacha_execution::ScoreRow;
use gacha_types::{
    GameSettings, Item, ItemId, NewGameSettings, Player, PlayerId, Rarity, RarityWeights,
    SettingsId, INITIAL_COINS,
};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::StoreError;

/// Outcome of the draw transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawCommit {
    Committed { balance: u64 },
    /// The conditional debit matched no row; nothing was written.
    InsufficientFunds { balance: u64 },
    PlayerMissing,
}

/// Outcome of the score transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreCommit {
    Recorded { raised_high_score: bool },
    PlayerMissing,
}

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?, busy_timeout)
    }

    pub fn open_in_memory(busy_timeout: Duration) -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, busy_timeout)
    }

    fn init(conn: Connection, busy_timeout: Duration) -> Result<Self, StoreError> {
        conn.busy_timeout(busy_timeout)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            op(&mut conn)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }

    pub async fn insert_player(
        &self,
        name: String,
        token: String,
        created_at_ms: u64,
    ) -> Result<PlayerId, StoreError> {
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO players (name, token, coins, high_score, created_at_ms)
                 VALUES (?, ?, ?, 0, ?)",
                params![name, token, INITIAL_COINS, created_at_ms],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn player_by_token(&self, token: String) -> Result<Option<PlayerId>, StoreError> {
        self.run(move |conn| {
            Ok(conn
                .query_row("SELECT id FROM players WHERE token = ?", [token], |row| {
                    row.get(0)
                })
                .optional()?)
        })
        .await
    }

    pub async fn player(&self, id: PlayerId) -> Result<Option<Player>, StoreError> {
        self.run(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, name, coins, high_score FROM players WHERE id = ?",
                    [id],
                    map_player,
                )
                .optional()?)
        })
        .await
    }

    /// Add `amount` coins. Returns the new balance, or `None` when the player does not exist.
    pub async fn credit_coins(
        &self,
        id: PlayerId,
        amount: u64,
    ) -> Result<Option<u64>, StoreError> {
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let credited = tx.execute(
                "UPDATE players SET coins = coins + ?1
                 WHERE id = ?2 AND coins <= 9223372036854775807 - ?1",
                params![amount, id],
            )?;
            let balance: Option<u64> = tx
                .query_row("SELECT coins FROM players WHERE id = ?", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            if credited == 0 && balance.is_some() {
                return Err(StoreError::OutOfRange { label: "coins" });
            }
            tx.commit()?;
            Ok(balance)
        })
        .await
    }

    /// Full catalog in ascending id order.
    pub async fn items(&self) -> Result<Vec<Item>, StoreError> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, rarity FROM items ORDER BY id ASC")?;
            let rows = stmt.query_map([], map_item)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    pub async fn insert_item(&self, name: String, rarity: Rarity) -> Result<Item, StoreError> {
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO items (name, rarity) VALUES (?, ?)",
                params![name, rarity.code()],
            )?;
            Ok(Item {
                id: conn.last_insert_rowid(),
                name,
                rarity,
            })
        })
        .await
    }

    /// Insert an inactive configuration.
    pub async fn insert_settings(
        &self,
        input: NewGameSettings,
        created_at_ms: u64,
    ) -> Result<GameSettings, StoreError> {
        self.run(move |conn| {
            let weights = input.per_tier_weights;
            conn.execute(
                "INSERT INTO game_settings
                    (draw_cost, ranking_page_size, weight_n, weight_r, weight_sr,
                     max_draw_count, created_at_ms, active)
                 VALUES (?, ?, ?, ?, ?, ?, ?, 0)",
                params![
                    input.draw_cost,
                    input.ranking_page_size,
                    weights.n,
                    weights.r,
                    weights.sr,
                    input.max_draw_count,
                    created_at_ms,
                ],
            )?;
            Ok(GameSettings {
                id: conn.last_insert_rowid(),
                draw_cost: input.draw_cost,
                ranking_page_size: input.ranking_page_size,
                per_tier_weights: weights,
                max_draw_count: input.max_draw_count,
                created_at_ms,
                active: false,
            })
        })
        .await
    }

    pub async fn settings(&self, id: SettingsId) -> Result<Option<GameSettings>, StoreError> {
        self.run(move |conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {SETTINGS_COLUMNS} FROM game_settings WHERE id = ?"),
                    [id],
                    map_settings,
                )
                .optional()?)
        })
        .await
    }

    pub async fn settings_list(&self) -> Result<Vec<GameSettings>, StoreError> {
        self.run(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SETTINGS_COLUMNS} FROM game_settings ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map([], map_settings)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    pub async fn active_settings(&self) -> Result<Option<GameSettings>, StoreError> {
        self.run(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {SETTINGS_COLUMNS} FROM game_settings WHERE active = 1"),
                    [],
                    map_settings,
                )
                .optional()?)
        })
        .await
    }

    /// Make `id` the single active configuration. Returns `false` (and changes nothing) when
    /// no such configuration exists.
    pub async fn activate_settings(&self, id: SettingsId) -> Result<bool, StoreError> {
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute("UPDATE game_settings SET active = 0 WHERE active = 1", [])?;
            let activated =
                tx.execute("UPDATE game_settings SET active = 1 WHERE id = ?", [id])?;
            if activated == 0 {
                return Ok(false);
            }
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    pub async fn owned_items(&self, player_id: PlayerId) -> Result<HashSet<ItemId>, StoreError> {
        self.run(move |conn| {
            let mut stmt =
                conn.prepare("SELECT item_id FROM collection_items WHERE player_id = ?")?;
            let rows = stmt.query_map([player_id], |row| row.get(0))?;
            Ok(rows.collect::<rusqlite::Result<HashSet<_>>>()?)
        })
        .await
    }

    /// Debit `cost` and add `new_items` to the collection atomically.
    ///
    /// The debit is conditional on the balance still covering the cost, so two racing draws
    /// cannot both spend the same coins.
    pub async fn commit_draw(
        &self,
        player_id: PlayerId,
        cost: u64,
        new_items: Vec<ItemId>,
        created_at_ms: u64,
    ) -> Result<DrawCommit, StoreError> {
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let debited = tx.execute(
                "UPDATE players SET coins = coins - ?1 WHERE id = ?2 AND coins >= ?1",
                params![cost, player_id],
            )?;
            if debited == 0 {
                let balance: Option<u64> = tx
                    .query_row("SELECT coins FROM players WHERE id = ?", [player_id], |row| {
                        row.get(0)
                    })
                    .optional()?;
                return Ok(match balance {
                    Some(balance) => DrawCommit::InsufficientFunds { balance },
                    None => DrawCommit::PlayerMissing,
                });
            }
            {
                let mut insert = tx.prepare_cached(
                    "INSERT INTO collection_items (player_id, item_id, created_at_ms)
                     VALUES (?, ?, ?)",
                )?;
                for item_id in &new_items {
                    insert.execute(params![player_id, item_id, created_at_ms])?;
                }
            }
            let balance: u64 =
                tx.query_row("SELECT coins FROM players WHERE id = ?", [player_id], |row| {
                    row.get(0)
                })?;
            tx.commit()?;
            Ok(DrawCommit::Committed { balance })
        })
        .await
    }

    /// Append a score record and raise the player's high score if it was beaten.
    pub async fn record_score(
        &self,
        player_id: PlayerId,
        score: u64,
        created_at_ms: u64,
    ) -> Result<ScoreCommit, StoreError> {
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let high_score: Option<u64> = tx
                .query_row(
                    "SELECT high_score FROM players WHERE id = ?",
                    [player_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(high_score) = high_score else {
                return Ok(ScoreCommit::PlayerMissing);
            };
            tx.execute(
                "INSERT INTO scores (player_id, score, created_at_ms) VALUES (?, ?, ?)",
                params![player_id, score, created_at_ms],
            )?;
            let raised_high_score = score > high_score;
            if raised_high_score {
                tx.execute(
                    "UPDATE players SET high_score = ?1 WHERE id = ?2 AND high_score < ?1",
                    params![score, player_id],
                )?;
            }
            tx.commit()?;
            Ok(ScoreCommit::Recorded { raised_high_score })
        })
        .await
    }

    /// One leaderboard page of score records in ranking order.
    pub async fn score_rows(&self, offset: u64, limit: u32) -> Result<Vec<ScoreRow>, StoreError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.player_id, p.name, s.score, s.created_at_ms
                 FROM scores s JOIN players p ON p.id = s.player_id
                 ORDER BY s.score DESC, s.player_id ASC, s.created_at_ms DESC, s.id DESC
                 LIMIT ? OFFSET ?",
            )?;
            let rows = stmt.query_map(params![limit, offset], |row| {
                Ok(ScoreRow {
                    record_id: row.get(0)?,
                    player_id: row.get(1)?,
                    player_name: row.get(2)?,
                    score: row.get(3)?,
                    created_at_ms: row.get(4)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }
}

const SETTINGS_COLUMNS: &str = "id, draw_cost, ranking_page_size, weight_n, weight_r, weight_sr, \
     max_draw_count, created_at_ms, active";

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA foreign_keys=ON;
         CREATE TABLE IF NOT EXISTS players (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             name TEXT NOT NULL,
             token TEXT NOT NULL UNIQUE,
             coins INTEGER NOT NULL DEFAULT 0 CHECK (coins >= 0),
             high_score INTEGER NOT NULL DEFAULT 0 CHECK (high_score >= 0),
             created_at_ms INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS items (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             name TEXT NOT NULL,
             rarity INTEGER NOT NULL CHECK (rarity IN (1, 2, 3))
         );
         CREATE TABLE IF NOT EXISTS game_settings (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             draw_cost INTEGER NOT NULL CHECK (draw_cost >= 0),
             ranking_page_size INTEGER NOT NULL CHECK (ranking_page_size > 0),
             weight_n INTEGER NOT NULL CHECK (weight_n >= 0),
             weight_r INTEGER NOT NULL CHECK (weight_r >= 0),
             weight_sr INTEGER NOT NULL CHECK (weight_sr >= 0),
             max_draw_count INTEGER NOT NULL CHECK (max_draw_count > 0),
             created_at_ms INTEGER NOT NULL,
             active INTEGER NOT NULL DEFAULT 0
         );
         CREATE UNIQUE INDEX IF NOT EXISTS game_settings_single_active
             ON game_settings(active) WHERE active = 1;
         CREATE TABLE IF NOT EXISTS collection_items (
             player_id INTEGER NOT NULL REFERENCES players(id),
             item_id INTEGER NOT NULL REFERENCES items(id),
             created_at_ms INTEGER NOT NULL,
             PRIMARY KEY (player_id, item_id)
         );
         CREATE TABLE IF NOT EXISTS scores (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             player_id INTEGER NOT NULL REFERENCES players(id),
             score INTEGER NOT NULL CHECK (score >= 0),
             created_at_ms INTEGER NOT NULL
         );
         CREATE INDEX IF NOT EXISTS scores_ranking
             ON scores(score DESC, player_id ASC, created_at_ms DESC);",
    )?;
    Ok(())
}

fn map_player(row: &Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        coins: row.get(2)?,
        high_score: row.get(3)?,
    })
}

fn map_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    let code: i64 = row.get(2)?;
    let rarity = Rarity::try_from(code)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(2, Type::Integer, Box::new(err)))?;
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        rarity,
    })
}

fn map_settings(row: &Row<'_>) -> rusqlite::Result<GameSettings> {
    Ok(GameSettings {
        id: row.get(0)?,
        draw_cost: row.get(1)?,
        ranking_page_size: row.get(2)?,
        per_tier_weights: RarityWeights::new(row.get(3)?, row.get(4)?, row.get(5)?),
        max_draw_count: row.get(6)?,
        created_at_ms: row.get(7)?,
        active: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUSY: Duration = Duration::from_millis(1_000);

    fn settings_input(draw_cost: u64) -> NewGameSettings {
        NewGameSettings {
            draw_cost,
            ranking_page_size: 10,
            per_tier_weights: RarityWeights::new(70, 25, 5),
            max_draw_count: 10,
        }
    }

    async fn player_with_coins(store: &Store, name: &str, coins: u64) -> PlayerId {
        let id = store
            .insert_player(name.to_string(), format!("token-{name}"), 1)
            .await
            .unwrap();
        if coins > 0 {
            store.credit_coins(id, coins).await.unwrap();
        }
        id
    }

    #[tokio::test]
    async fn test_items_come_back_in_id_order() {
        let store = Store::open_in_memory(BUSY).unwrap();
        let sword = store.insert_item("Sword".into(), Rarity::R).await.unwrap();
        let cat = store.insert_item("Golden Cat".into(), Rarity::SR).await.unwrap();
        let items = store.items().await.unwrap();
        assert_eq!(items, vec![sword, cat]);
        assert!(items[0].id < items[1].id);
    }

    #[tokio::test]
    async fn test_activation_swaps_single_active_row() {
        let store = Store::open_in_memory(BUSY).unwrap();
        let first = store.insert_settings(settings_input(10), 1).await.unwrap();
        let second = store.insert_settings(settings_input(20), 2).await.unwrap();
        assert!(!first.active);
        assert_eq!(store.active_settings().await.unwrap(), None);

        assert!(store.activate_settings(first.id).await.unwrap());
        assert!(store.activate_settings(second.id).await.unwrap());
        let active = store.active_settings().await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
        assert_eq!(active.draw_cost, 20);

        let active_count = store
            .settings_list()
            .await
            .unwrap()
            .into_iter()
            .filter(|settings| settings.active)
            .count();
        assert_eq!(active_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_activation_keeps_previous() {
        let store = Store::open_in_memory(BUSY).unwrap();
        let first = store.insert_settings(settings_input(10), 1).await.unwrap();
        assert!(store.activate_settings(first.id).await.unwrap());
        assert!(!store.activate_settings(999).await.unwrap());
        assert_eq!(store.active_settings().await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_commit_draw_debits_and_inserts() {
        let store = Store::open_in_memory(BUSY).unwrap();
        let item = store.insert_item("Pebble".into(), Rarity::N).await.unwrap();
        let player = player_with_coins(&store, "alice", 1_000).await;

        let outcome = store.commit_draw(player, 300, vec![item.id], 5).await.unwrap();
        assert_eq!(outcome, DrawCommit::Committed { balance: 700 });
        assert!(store.owned_items(player).await.unwrap().contains(&item.id));
    }

    #[tokio::test]
    async fn test_commit_draw_rejects_short_balance() {
        let store = Store::open_in_memory(BUSY).unwrap();
        let item = store.insert_item("Pebble".into(), Rarity::N).await.unwrap();
        let player = player_with_coins(&store, "bob", 50).await;

        let outcome = store.commit_draw(player, 100, vec![item.id], 5).await.unwrap();
        assert_eq!(outcome, DrawCommit::InsufficientFunds { balance: 50 });
        assert!(store.owned_items(player).await.unwrap().is_empty());
        assert_eq!(
            store.commit_draw(42, 0, vec![], 5).await.unwrap(),
            DrawCommit::PlayerMissing
        );
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back_debit() {
        let store = Store::open_in_memory(BUSY).unwrap();
        let item = store.insert_item("Pebble".into(), Rarity::N).await.unwrap();
        let player = player_with_coins(&store, "carol", 500).await;

        // second id is not in the catalog, so the foreign key rejects it
        let result = store.commit_draw(player, 100, vec![item.id, 9_999], 5).await;
        assert!(matches!(result, Err(StoreError::Sqlite(_))));
        assert_eq!(store.player(player).await.unwrap().unwrap().coins, 500);
        assert!(store.owned_items(player).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_high_score_only_rises() {
        let store = Store::open_in_memory(BUSY).unwrap();
        let player = player_with_coins(&store, "dave", 0).await;

        assert_eq!(
            store.record_score(player, 80, 1).await.unwrap(),
            ScoreCommit::Recorded {
                raised_high_score: true
            }
        );
        assert_eq!(
            store.record_score(player, 50, 2).await.unwrap(),
            ScoreCommit::Recorded {
                raised_high_score: false
            }
        );
        assert_eq!(store.player(player).await.unwrap().unwrap().high_score, 80);
        assert_eq!(
            store.record_score(77, 10, 3).await.unwrap(),
            ScoreCommit::PlayerMissing
        );
    }

    #[tokio::test]
    async fn test_score_rows_order_and_paging() {
        let store = Store::open_in_memory(BUSY).unwrap();
        let a = player_with_coins(&store, "a", 0).await;
        let b = player_with_coins(&store, "b", 0).await;
        let c = player_with_coins(&store, "c", 0).await;
        store.record_score(a, 50, 10).await.unwrap();
        store.record_score(b, 80, 20).await.unwrap();
        store.record_score(c, 80, 30).await.unwrap();

        let rows = store.score_rows(0, 10).await.unwrap();
        let order: Vec<PlayerId> = rows.iter().map(|row| row.player_id).collect();
        assert_eq!(order, vec![b, c, a]);
        assert_eq!(rows[0].player_name, "b");

        let second_page = store.score_rows(1, 1).await.unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].player_id, c);
    }

    #[tokio::test]
    async fn test_credit_and_token_lookup() {
        let store = Store::open_in_memory(BUSY).unwrap();
        let id = store
            .insert_player("erin".into(), "secret".into(), 1)
            .await
            .unwrap();
        assert_eq!(store.credit_coins(id, 12).await.unwrap(), Some(12));
        assert_eq!(store.credit_coins(id + 1, 12).await.unwrap(), None);
        assert_eq!(
            store.player_by_token("secret".into()).await.unwrap(),
            Some(id)
        );
        assert_eq!(store.player_by_token("nope".into()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gacha.db");
        let id = {
            let store = Store::open(&path, BUSY).unwrap();
            let settings = store.insert_settings(settings_input(30), 1).await.unwrap();
            store.activate_settings(settings.id).await.unwrap();
            settings.id
        };
        let store = Store::open(&path, BUSY).unwrap();
        let active = store.active_settings().await.unwrap().unwrap();
        assert_eq!(active.id, id);
        assert_eq!(active.draw_cost, 30);
        assert!(active.active);
    }
}
