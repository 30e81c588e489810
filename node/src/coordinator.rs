//! Keeps every voting wallet's configuration equal to the ledger's.
//!
//! The ledger is authoritative. A push is a full-state overwrite: keys the
//! wallet holds but the ledger does not are reset to abstain. Wallets that
//! cannot be reached are skipped and marked offline; the next reconciliation
//! repairs them.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::join_all;

use vsp_network::{ReplicaClient, RpcError, VotingConfig, VotingUpdate};
use vsp_store::{StoreError, Ticket, TicketLedger};
use vsp_types::{Clock, Timestamp};

/// Last known state of one wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaHealth {
    pub name: String,
    /// Reachable and reporting daemon connected, unlocked and voting.
    pub online: bool,
    pub last_contact: Option<Timestamp>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub updated: usize,
    pub failed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub replicas_checked: usize,
    pub tickets_checked: usize,
    pub pushed: usize,
    pub failed: usize,
}

impl ReconcileReport {
    fn merge(mut self, other: ReconcileReport) -> Self {
        self.replicas_checked += other.replicas_checked;
        self.tickets_checked += other.tickets_checked;
        self.pushed += other.pushed;
        self.failed += other.failed;
        self
    }
}

/// The preferences a wallet must hold for `ticket`.
pub fn voting_config(ticket: &Ticket) -> VotingConfig {
    VotingConfig {
        vote_choices: ticket.vote_choices.clone(),
        treasury_policy: ticket.treasury_policy.clone(),
        tspend_policy: ticket.tspend_policy.clone(),
    }
}

fn voting_update(ticket: &Ticket) -> Option<VotingUpdate> {
    Some(VotingUpdate {
        ticket: ticket.hash,
        voting_wif: ticket.voting_wif.clone()?,
        import_key: true,
        rescan_from: ticket.purchase_height,
        config: voting_config(ticket),
    })
}

/// The push for a wallet holding `current`. The key is imported, with a
/// rescan, only when the wallet does not know the ticket.
fn overwriting(update: &VotingUpdate, current: Option<&VotingConfig>) -> VotingUpdate {
    let mut next = update.clone();
    next.import_key = current.is_none();
    if let Some(current) = current {
        next.config = update.config.overwrite_of(current);
    }
    next
}

pub struct ReplicaCoordinator {
    replicas: Vec<Arc<dyn ReplicaClient>>,
    health: Mutex<Vec<ReplicaHealth>>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl ReplicaCoordinator {
    pub fn new(replicas: Vec<Arc<dyn ReplicaClient>>, timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        let health = replicas
            .iter()
            .map(|r| ReplicaHealth {
                name: r.name().to_string(),
                online: false,
                last_contact: None,
            })
            .collect();
        Self {
            replicas,
            health: Mutex::new(health),
            timeout,
            clock,
        }
    }

    pub fn total(&self) -> usize {
        self.replicas.len()
    }

    pub fn online_count(&self) -> usize {
        self.lock_health().iter().filter(|h| h.online).count()
    }

    pub fn health(&self) -> Vec<ReplicaHealth> {
        self.lock_health().clone()
    }

    fn lock_health(&self) -> MutexGuard<'_, Vec<ReplicaHealth>> {
        self.health.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T, RpcError>>) -> Result<T, RpcError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or(Err(RpcError::Timeout))
    }

    fn contacted(&self, index: usize) {
        let now = self.clock.now();
        if let Some(h) = self.lock_health().get_mut(index) {
            h.last_contact = Some(now);
        }
    }

    fn failed(&self, index: usize, err: &RpcError) {
        let mut health = self.lock_health();
        if let Some(h) = health.get_mut(index) {
            if err.is_unreachable() {
                h.online = false;
            }
            tracing::warn!(replica = %h.name, error = %err, "voting wallet call failed");
        }
    }

    /// Push `ticket` to every wallet. Failures are logged, never returned.
    pub async fn synchronize(&self, ticket: &Ticket) -> SyncReport {
        let Some(update) = voting_update(ticket) else {
            tracing::warn!(ticket = %ticket.hash, "not synchronizing ticket without a voting key");
            return SyncReport::default();
        };

        let results = join_all(self.replicas.iter().map(|replica| {
            let update = &update;
            self.bounded(async move {
                let current = replica.voting_config(&update.ticket).await?;
                replica.push(&overwriting(update, current.as_ref())).await
            })
        }))
        .await;

        let mut report = SyncReport::default();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(()) => {
                    self.contacted(index);
                    report.updated += 1;
                }
                Err(e) => {
                    self.failed(index, &e);
                    report.failed += 1;
                }
            }
        }
        tracing::debug!(ticket = %ticket.hash, updated = report.updated, failed = report.failed, "synchronized ticket");
        report
    }

    /// Probe every wallet and record which are online.
    pub async fn check_health(&self) -> Vec<bool> {
        let results = join_all(self.replicas.iter().map(|r| self.bounded(r.status()))).await;
        let now = self.clock.now();
        let mut health = self.lock_health();
        results
            .into_iter()
            .zip(health.iter_mut())
            .map(|(result, h)| {
                h.online = match result {
                    Ok(status) => {
                        h.last_contact = Some(now);
                        if !status.daemon_connected {
                            tracing::warn!(replica = %h.name, "voting wallet has no daemon connection");
                        }
                        if !status.unlocked {
                            tracing::warn!(replica = %h.name, "voting wallet is locked");
                        }
                        if !status.voting {
                            tracing::warn!(replica = %h.name, "voting wallet is not voting");
                        }
                        status.is_healthy()
                    }
                    Err(e) => {
                        tracing::warn!(replica = %h.name, error = %e, "voting wallet unreachable");
                        false
                    }
                };
                h.online
            })
            .collect()
    }

    /// Make every healthy wallet hold the ledger's configuration for every
    /// active ticket.
    pub async fn reconcile_all(&self, ledger: &dyn TicketLedger) -> Result<ReconcileReport, StoreError> {
        let tickets = ledger.tickets().active_tickets()?;
        let healthy = self.check_health().await;

        let reports = join_all(
            self.replicas
                .iter()
                .enumerate()
                .filter(|(index, _)| healthy.get(*index).copied().unwrap_or(false))
                .map(|(index, replica)| self.reconcile_replica(index, replica.as_ref(), &tickets)),
        )
        .await;

        Ok(reports
            .into_iter()
            .fold(ReconcileReport::default(), ReconcileReport::merge))
    }

    async fn reconcile_replica(
        &self,
        index: usize,
        replica: &dyn ReplicaClient,
        tickets: &[Ticket],
    ) -> ReconcileReport {
        let mut report = ReconcileReport {
            replicas_checked: 1,
            ..ReconcileReport::default()
        };
        for update in tickets.iter().filter_map(voting_update) {
            report.tickets_checked += 1;
            let result = self
                .bounded(async {
                    match replica.voting_config(&update.ticket).await? {
                        Some(current) if update.config.equivalent(&current) => Ok(false),
                        current => {
                            replica.push(&overwriting(&update, current.as_ref())).await?;
                            Ok(true)
                        }
                    }
                })
                .await;
            match result {
                Ok(true) => {
                    tracing::info!(replica = replica.name(), ticket = %update.ticket, "repaired voting wallet");
                    report.pushed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    self.failed(index, &e);
                    if e.is_unreachable() {
                        break;
                    }
                }
            }
        }
        report
    }
}
