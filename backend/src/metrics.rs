use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BackendMetricsSnapshot {
    pub draws_committed: u64,
    pub items_drawn: u64,
    pub new_items: u64,
    pub insufficient_funds: u64,
    pub transaction_failures: u64,
    pub cache_misses: u64,
    pub cache_refresh_failures: u64,
    pub scores_recorded: u64,
    pub coins_credited: u64,
}

#[derive(Default)]
pub struct BackendMetrics {
    draws_committed: AtomicU64,
    items_drawn: AtomicU64,
    new_items: AtomicU64,
    insufficient_funds: AtomicU64,
    transaction_failures: AtomicU64,
    cache_misses: AtomicU64,
    cache_refresh_failures: AtomicU64,
    scores_recorded: AtomicU64,
    coins_credited: AtomicU64,
}

impl BackendMetrics {
    pub fn record_draw(&self, drawn: usize, new: usize) {
        self.draws_committed.fetch_add(1, Ordering::Relaxed);
        self.items_drawn.fetch_add(drawn as u64, Ordering::Relaxed);
        self.new_items.fetch_add(new as u64, Ordering::Relaxed);
    }

    pub fn inc_insufficient_funds(&self) {
        self.insufficient_funds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_transaction_failure(&self) {
        self.transaction_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_refresh_failure(&self) {
        self.cache_refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_score(&self, credited: u64) {
        self.scores_recorded.fetch_add(1, Ordering::Relaxed);
        self.coins_credited.fetch_add(credited, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BackendMetricsSnapshot {
        BackendMetricsSnapshot {
            draws_committed: self.draws_committed.load(Ordering::Relaxed),
            items_drawn: self.items_drawn.load(Ordering::Relaxed),
            new_items: self.new_items.load(Ordering::Relaxed),
            insufficient_funds: self.insufficient_funds.load(Ordering::Relaxed),
            transaction_failures: self.transaction_failures.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_refresh_failures: self.cache_refresh_failures.load(Ordering::Relaxed),
            scores_recorded: self.scores_recorded.load(Ordering::Relaxed),
            coins_credited: self.coins_credited.load(Ordering::Relaxed),
        }
    }
}
