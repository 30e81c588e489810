//! Nullable chain daemon: scripted answers, recorded broadcasts.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use vsp_network::{BestBlock, ChainOracle, RawTransaction, RpcError, TicketChainState};
use vsp_types::TxHash;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct ChainState {
    transactions: HashMap<TxHash, RawTransaction>,
    live: HashSet<TxHash>,
    outcomes: HashMap<TxHash, TicketChainState>,
    best_block: BestBlock,
    broadcasts: Vec<String>,
    broadcast_error: Option<RpcError>,
    unreachable: bool,
}

/// A chain daemon whose answers are set by the test.
#[derive(Default)]
pub struct NullChainOracle {
    state: Mutex<ChainState>,
}

impl NullChainOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `hash` known with the given confirmations.
    pub fn add_transaction(&self, hash: TxHash, hex: impl Into<String>, confirmations: u32) {
        let block_height = if confirmations == 0 { 0 } else { 100 };
        lock(&self.state).transactions.insert(
            hash,
            RawTransaction {
                hex: hex.into(),
                confirmations,
                block_height,
            },
        );
    }

    pub fn set_confirmations(&self, hash: &TxHash, confirmations: u32) {
        if let Some(tx) = lock(&self.state).transactions.get_mut(hash) {
            tx.confirmations = confirmations;
            if tx.block_height == 0 && confirmations > 0 {
                tx.block_height = 100;
            }
        }
    }

    pub fn set_live(&self, hash: TxHash, live: bool) {
        let mut state = lock(&self.state);
        if live {
            state.live.insert(hash);
        } else {
            state.live.remove(&hash);
        }
    }

    pub fn set_outcome(&self, hash: TxHash, outcome: TicketChainState) {
        lock(&self.state).outcomes.insert(hash, outcome);
    }

    pub fn set_best_block(&self, height: u32, pool_size: u32) {
        lock(&self.state).best_block = BestBlock { height, pool_size };
    }

    /// Fail every broadcast with `error` until cleared with `None`.
    pub fn fail_broadcasts(&self, error: Option<RpcError>) {
        lock(&self.state).broadcast_error = error;
    }

    /// Fail every call as if the daemon were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        lock(&self.state).unreachable = unreachable;
    }

    /// Transactions broadcast so far, in order.
    pub fn broadcasts(&self) -> Vec<String> {
        lock(&self.state).broadcasts.clone()
    }

    fn reachable(&self) -> Result<MutexGuard<'_, ChainState>, RpcError> {
        let state = lock(&self.state);
        if state.unreachable {
            return Err(RpcError::Unreachable("null daemon offline".into()));
        }
        Ok(state)
    }
}

#[async_trait]
impl ChainOracle for NullChainOracle {
    async fn get_raw_transaction(&self, hash: &TxHash) -> Result<RawTransaction, RpcError> {
        self.reachable()?
            .transactions
            .get(hash)
            .cloned()
            .ok_or_else(|| RpcError::NotFound(hash.to_string()))
    }

    async fn send_raw_transaction(&self, hex: &str) -> Result<(), RpcError> {
        let mut state = self.reachable()?;
        if let Some(err) = state.broadcast_error.clone() {
            return Err(err);
        }
        state.broadcasts.push(hex.to_string());
        Ok(())
    }

    async fn exists_live_ticket(&self, hash: &TxHash) -> Result<bool, RpcError> {
        Ok(self.reachable()?.live.contains(hash))
    }

    async fn ticket_chain_state(&self, hash: &TxHash) -> Result<TicketChainState, RpcError> {
        Ok(self
            .reachable()?
            .outcomes
            .get(hash)
            .copied()
            .unwrap_or(TicketChainState::Live))
    }

    async fn best_block(&self) -> Result<BestBlock, RpcError> {
        Ok(self.reachable()?.best_block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_broadcast_failure() {
        let oracle = NullChainOracle::new();
        oracle.send_raw_transaction("aa").await.unwrap();
        oracle.fail_broadcasts(Some(RpcError::UnknownOutputs("x".into())));
        assert!(oracle.send_raw_transaction("bb").await.is_err());
        assert_eq!(oracle.broadcasts(), ["aa"]);
    }

    #[tokio::test]
    async fn offline_daemon() {
        let oracle = NullChainOracle::new();
        oracle.add_transaction(TxHash::new([1; 32]), "00", 1);
        oracle.set_unreachable(true);
        assert!(oracle
            .get_raw_transaction(&TxHash::new([1; 32]))
            .await
            .unwrap_err()
            .is_unreachable());
    }
}
