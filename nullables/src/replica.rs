//! Nullable voting wallet: keeps pushed configuration in memory.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use vsp_network::{ReplicaClient, RpcError, VotingConfig, VotingUpdate, WalletStatus};
use vsp_types::TicketHash;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct WalletState {
    status: WalletStatus,
    reachable: bool,
    tickets: HashMap<TicketHash, (String, VotingConfig)>,
    pushes: usize,
    imports: usize,
}

/// A wallet that stores what it is told and can be taken offline.
pub struct NullReplica {
    name: String,
    state: Mutex<WalletState>,
}

impl NullReplica {
    /// A reachable, healthy wallet with no tickets.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(WalletState {
                status: WalletStatus {
                    daemon_connected: true,
                    unlocked: true,
                    voting: true,
                },
                reachable: true,
                tickets: HashMap::new(),
                pushes: 0,
                imports: 0,
            }),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        lock(&self.state).reachable = reachable;
    }

    pub fn set_status(&self, status: WalletStatus) {
        lock(&self.state).status = status;
    }

    /// Configuration held for `ticket`, as the wallet would report it.
    pub fn config_of(&self, ticket: &TicketHash) -> Option<VotingConfig> {
        lock(&self.state).tickets.get(ticket).map(|(_, c)| c.clone())
    }

    pub fn voting_wif_of(&self, ticket: &TicketHash) -> Option<String> {
        lock(&self.state).tickets.get(ticket).map(|(w, _)| w.clone())
    }

    /// Change a ticket's configuration behind the service's back.
    pub fn tamper(&self, ticket: &TicketHash, config: VotingConfig) {
        if let Some(entry) = lock(&self.state).tickets.get_mut(ticket) {
            entry.1 = config;
        }
    }

    /// Number of successful pushes received.
    pub fn push_count(&self) -> usize {
        lock(&self.state).pushes
    }

    /// Number of voting key imports, each of which costs the real wallet a rescan.
    pub fn import_count(&self) -> usize {
        lock(&self.state).imports
    }

    fn reachable(&self) -> Result<MutexGuard<'_, WalletState>, RpcError> {
        let state = lock(&self.state);
        if !state.reachable {
            return Err(RpcError::Unreachable(format!("{} offline", self.name)));
        }
        Ok(state)
    }
}

#[async_trait]
impl ReplicaClient for NullReplica {
    fn name(&self) -> &str {
        &self.name
    }

    async fn status(&self) -> Result<WalletStatus, RpcError> {
        Ok(self.reachable()?.status)
    }

    async fn push(&self, update: &VotingUpdate) -> Result<(), RpcError> {
        let mut state = self.reachable()?;
        if update.import_key {
            state.imports += 1;
            state
                .tickets
                .entry(update.ticket)
                .or_insert_with(|| (update.voting_wif.clone(), VotingConfig::default()))
                .0 = update.voting_wif.clone();
        }
        // Preferences can only be set on a ticket the wallet knows.
        let Some(entry) = state.tickets.get_mut(&update.ticket) else {
            return Err(RpcError::NotFound(update.ticket.to_string()));
        };
        // Writes only touch the keys they name, like the real wallet.
        entry.1.vote_choices.extend(update.config.vote_choices.clone());
        entry.1.treasury_policy.extend(update.config.treasury_policy.clone());
        entry.1.tspend_policy.extend(update.config.tspend_policy.clone());
        state.pushes += 1;
        Ok(())
    }

    async fn voting_config(&self, ticket: &TicketHash) -> Result<Option<VotingConfig>, RpcError> {
        Ok(self
            .reachable()?
            .tickets
            .get(ticket)
            .map(|(_, c)| c.clone()))
    }
}
