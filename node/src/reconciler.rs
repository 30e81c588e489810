//! Periodic sweep that moves tickets through their life.
//!
//! One sweep runs at a time. A tick that arrives while a sweep is still
//! running is dropped, not queued. Every step handles tickets one by one and
//! a failure on one ticket is logged and counted without stopping the rest.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use vsp_network::{RpcError, TicketChainState};
use vsp_store::{update_ticket, StoreError, Ticket};
use vsp_types::{FeeStatus, TicketOutcome};

use crate::context::VspCore;
use crate::payfee::broadcast_fee;
use crate::stats::{CachedStats, StatsCache};

/// What one sweep did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub tickets_confirmed: usize,
    pub tickets_deleted: usize,
    pub fees_retried: usize,
    pub fees_broadcast: usize,
    pub fees_confirmed: usize,
    pub outcomes_resolved: usize,
    pub replicas_repaired: usize,
    pub errors: usize,
}

pub struct BackgroundReconciler {
    core: VspCore,
    stats: StatsCache,
    running: Mutex<()>,
}

impl BackgroundReconciler {
    pub fn new(core: VspCore, stats: StatsCache) -> Self {
        Self {
            core,
            stats,
            running: Mutex::new(()),
        }
    }

    /// Run one sweep, or return `None` if one is already running.
    pub async fn sweep(&self) -> Option<SweepReport> {
        let Ok(_guard) = self.running.try_lock() else {
            self.core.metrics.sweeps_skipped.inc();
            tracing::debug!("previous sweep still running, skipping");
            return None;
        };
        let started = Instant::now();
        let mut report = SweepReport::default();

        self.confirm_tickets(&mut report).await;
        self.retry_failed_fees(&mut report);
        self.broadcast_received_fees(&mut report).await;
        self.confirm_fees(&mut report).await;
        self.resolve_outcomes(&mut report).await;

        match self.core.coordinator.reconcile_all(self.core.ledger.as_ref()).await {
            Ok(r) => {
                report.replicas_repaired = r.pushed;
                report.errors += r.failed;
            }
            Err(e) => {
                tracing::error!(error = %e, "wallet reconciliation failed");
                report.errors += 1;
            }
        }

        self.refresh_stats(&mut report).await;

        let metrics = &self.core.metrics;
        metrics.sweeps.inc();
        metrics
            .sweep_duration_seconds
            .observe(started.elapsed().as_secs_f64());
        tracing::info!(?report, elapsed_ms = started.elapsed().as_millis() as u64, "sweep complete");
        Some(report)
    }

    /// Sweep every `period` until `shutdown` fires.
    pub fn spawn(self: Arc<Self>, period: Duration, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => {
                        tracing::debug!("reconciler shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.sweep().await;
                    }
                }
            }
        })
    }

    fn list(
        &self,
        what: &str,
        load: impl FnOnce() -> Result<Vec<Ticket>, StoreError>,
        report: &mut SweepReport,
    ) -> Vec<Ticket> {
        load().unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to list {what}");
            report.errors += 1;
            Vec::new()
        })
    }

    /// Mark mined tickets confirmed; forget abandoned ones.
    async fn confirm_tickets(&self, report: &mut SweepReport) {
        let store = self.core.ledger.tickets();
        let required = self.core.config.required_confirmations;
        let now = self.core.now();

        for ticket in self.list("unconfirmed tickets", || store.unconfirmed_tickets(), report) {
            match self.core.oracle.get_raw_transaction(&ticket.hash).await {
                Ok(raw) if raw.confirmations >= required => {
                    let result = update_ticket(store, &ticket.hash, |t| {
                        t.confirmed = true;
                        t.purchase_height = raw.block_height;
                        Ok::<(), std::convert::Infallible>(())
                    });
                    match result {
                        Ok(_) => {
                            tracing::info!(ticket = %ticket.hash, height = raw.block_height, "ticket confirmed");
                            report.tickets_confirmed += 1;
                        }
                        Err(e) => {
                            tracing::error!(ticket = %ticket.hash, error = %e, "failed to confirm ticket");
                            report.errors += 1;
                        }
                    }
                }
                Ok(_) => {}
                Err(RpcError::NotFound(_))
                    if ticket.fee_expired(now) && !ticket.fee_tx_status.is_received() =>
                {
                    self.forget(&ticket, report);
                }
                Err(RpcError::NotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(ticket = %ticket.hash, error = %e, "cannot check ticket confirmations");
                    report.errors += 1;
                }
            }
        }
    }

    fn forget(&self, ticket: &Ticket, report: &mut SweepReport) {
        let ledger = &self.core.ledger;
        let result = ledger
            .tickets()
            .delete_ticket(&ticket.hash)
            .and_then(|()| ledger.vote_changes().delete_vote_changes(&ticket.hash));
        match result {
            Ok(()) => {
                tracing::info!(ticket = %ticket.hash, "removed unknown ticket with expired fee");
                report.tickets_deleted += 1;
            }
            Err(e) => {
                tracing::error!(ticket = %ticket.hash, error = %e, "failed to remove ticket");
                report.errors += 1;
            }
        }
    }

    /// Put failed broadcasts back in line for another attempt.
    fn retry_failed_fees(&self, report: &mut SweepReport) {
        let store = self.core.ledger.tickets();
        let failed = self.list("failed fees", || store.tickets_with_fee_status(FeeStatus::Error), report);
        for ticket in failed {
            if ticket.fee_tx_hex.is_none() {
                continue;
            }
            match self.core.set_fee_status(&ticket.hash, FeeStatus::Received) {
                Ok(_) => report.fees_retried += 1,
                Err(e) => {
                    tracing::error!(ticket = %ticket.hash, error = %e, "failed to requeue fee");
                    report.errors += 1;
                }
            }
        }
    }

    async fn broadcast_received_fees(&self, report: &mut SweepReport) {
        let store = self.core.ledger.tickets();
        let pending = self.list("received fees", || store.tickets_with_fee_status(FeeStatus::Received), report);
        for ticket in pending.into_iter().filter(|t| t.confirmed) {
            match broadcast_fee(&self.core, &ticket).await {
                Ok(_) => report.fees_broadcast += 1,
                Err(_) => report.errors += 1,
            }
        }
    }

    /// Mined fees make the ticket a voting ticket and go to the wallets.
    async fn confirm_fees(&self, report: &mut SweepReport) {
        let store = self.core.ledger.tickets();
        let required = self.core.config.required_confirmations;

        let broadcast = self.list("broadcast fees", || store.tickets_with_fee_status(FeeStatus::Broadcast), report);
        for ticket in broadcast {
            let Some(fee_hash) = ticket.fee_tx_hash else {
                continue;
            };
            match self.core.oracle.get_raw_transaction(&fee_hash).await {
                Ok(raw) if raw.confirmations >= required => {
                    let result = update_ticket(store, &ticket.hash, |t| {
                        t.fee_tx_status = FeeStatus::Confirmed;
                        t.outcome = Some(TicketOutcome::Voting);
                        Ok::<(), std::convert::Infallible>(())
                    });
                    match result {
                        Ok(confirmed) => {
                            self.core.metrics.fees_confirmed.inc();
                            tracing::info!(ticket = %ticket.hash, fee_tx = %fee_hash, "fee confirmed");
                            report.fees_confirmed += 1;
                            let sync = self.core.coordinator.synchronize(&confirmed).await;
                            self.core.metrics.replica_pushes.inc_by(sync.updated as u64);
                        }
                        Err(e) => {
                            tracing::error!(ticket = %ticket.hash, error = %e, "failed to confirm fee");
                            report.errors += 1;
                        }
                    }
                }
                Ok(_) => {}
                // Dropped from the mempool: send it again.
                Err(RpcError::NotFound(_)) => {
                    tracing::warn!(ticket = %ticket.hash, fee_tx = %fee_hash, "fee tx unknown to daemon, rebroadcasting");
                    let resent = match ticket.fee_tx_hex.as_deref() {
                        Some(hex) => self.core.oracle.send_raw_transaction(hex).await,
                        None => Err(RpcError::NotFound(fee_hash.to_string())),
                    };
                    match resent {
                        Ok(_) => {}
                        // Spent or unknown inputs: this fee can never confirm
                        // and the client cannot pay again.
                        Err(e @ RpcError::UnknownOutputs(_)) => {
                            self.core.metrics.fee_rebroadcast_failures.inc();
                            tracing::error!(
                                ticket = %ticket.hash,
                                fee_tx = %fee_hash,
                                error = %e,
                                "vanished fee tx spends unknown outputs, ticket is stuck"
                            );
                            report.errors += 1;
                        }
                        Err(e) => {
                            self.core.metrics.fee_rebroadcast_failures.inc();
                            tracing::warn!(ticket = %ticket.hash, error = %e, "fee rebroadcast failed");
                            report.errors += 1;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(ticket = %ticket.hash, error = %e, "cannot check fee confirmations");
                    report.errors += 1;
                }
            }
        }
    }

    async fn resolve_outcomes(&self, report: &mut SweepReport) {
        let store = self.core.ledger.tickets();
        for ticket in self.list("voting tickets", || store.active_tickets(), report) {
            let outcome = match self.core.oracle.ticket_chain_state(&ticket.hash).await {
                Ok(TicketChainState::Live) => continue,
                Ok(TicketChainState::Voted) => TicketOutcome::Voted,
                Ok(TicketChainState::Missed) => TicketOutcome::Missed,
                Ok(TicketChainState::Expired) => TicketOutcome::Expired,
                Err(e) => {
                    tracing::warn!(ticket = %ticket.hash, error = %e, "cannot check ticket outcome");
                    report.errors += 1;
                    continue;
                }
            };
            let result = update_ticket(store, &ticket.hash, |t| {
                t.outcome = Some(outcome);
                Ok::<(), std::convert::Infallible>(())
            });
            match result {
                Ok(_) => {
                    tracing::info!(ticket = %ticket.hash, outcome = outcome.as_str(), "ticket outcome resolved");
                    report.outcomes_resolved += 1;
                }
                Err(e) => {
                    tracing::error!(ticket = %ticket.hash, error = %e, "failed to record outcome");
                    report.errors += 1;
                }
            }
        }
    }

    /// Publish fresh statistics. A daemon that cannot be reached keeps the
    /// last known chain tip.
    async fn refresh_stats(&self, report: &mut SweepReport) {
        let counts = match self.core.ledger.tickets().outcome_counts() {
            Ok(counts) => counts,
            Err(e) => {
                tracing::error!(error = %e, "failed to count tickets");
                report.errors += 1;
                return;
            }
        };
        let previous = self.stats.current();
        let best = match self.core.oracle.best_block().await {
            Ok(best) => best,
            Err(e) => {
                tracing::warn!(error = %e, "cannot fetch best block");
                report.errors += 1;
                vsp_network::BestBlock {
                    height: previous.block_height,
                    pool_size: 0,
                }
            }
        };
        let coordinator = &self.core.coordinator;
        let mut stats = CachedStats::compute(
            counts,
            best,
            coordinator.online_count(),
            coordinator.total(),
            self.core.now(),
        );
        if best.pool_size == 0 {
            stats.network_proportion = previous.network_proportion;
        }

        let metrics = &self.core.metrics;
        metrics.observe_outcomes(&counts);
        metrics.block_height.set(i64::from(stats.block_height));
        metrics.wallets_online.set(stats.voting_wallets_online as i64);
        metrics.wallets_total.set(stats.total_voting_wallets as i64);
        self.stats.publish(stats);
    }
}
