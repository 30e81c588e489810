//! Aggregate statistics for `/vspinfo`.
//!
//! The reconciler is the single writer; API handlers read the last
//! published snapshot without waiting on a recomputation.

use tokio::sync::watch;

use vsp_network::BestBlock;
use vsp_store::OutcomeCounts;
use vsp_types::Timestamp;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CachedStats {
    pub voting: u64,
    pub voted: u64,
    pub expired: u64,
    pub missed: u64,
    pub block_height: u32,
    /// Share of the live ticket pool voting through this service.
    pub network_proportion: f64,
    pub total_voting_wallets: usize,
    pub voting_wallets_online: usize,
    /// `None` until the first sweep completes.
    pub updated: Option<Timestamp>,
}

impl CachedStats {
    pub fn compute(
        counts: OutcomeCounts,
        best_block: BestBlock,
        wallets_online: usize,
        wallets_total: usize,
        now: Timestamp,
    ) -> Self {
        let network_proportion = if best_block.pool_size == 0 {
            0.0
        } else {
            counts.voting as f64 / best_block.pool_size as f64
        };
        Self {
            voting: counts.voting,
            voted: counts.voted,
            expired: counts.expired,
            missed: counts.missed,
            block_height: best_block.height,
            network_proportion,
            total_voting_wallets: wallets_total,
            voting_wallets_online: wallets_online,
            updated: Some(now),
        }
    }

    pub fn revoked(&self) -> u64 {
        self.expired + self.missed
    }
}

/// Write side, owned by the reconciler.
pub struct StatsCache {
    tx: watch::Sender<CachedStats>,
}

/// Read side, cloned into every handler.
#[derive(Clone)]
pub struct StatsReader {
    rx: watch::Receiver<CachedStats>,
}

impl StatsCache {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(CachedStats::default());
        Self { tx }
    }

    pub fn reader(&self) -> StatsReader {
        StatsReader {
            rx: self.tx.subscribe(),
        }
    }

    pub fn publish(&self, stats: CachedStats) {
        self.tx.send_replace(stats);
    }

    pub fn current(&self) -> CachedStats {
        self.tx.borrow().clone()
    }
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsReader {
    pub fn snapshot(&self) -> CachedStats {
        self.rx.borrow().clone()
    }
}
