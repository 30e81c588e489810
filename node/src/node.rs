//! Process-level wiring: database, RPC clients, background tasks.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;

use vsp_network::{ChainOracle, DaemonRpc, JsonRpcClient, ReplicaClient, WalletRpc};
use vsp_store::{StoreError, TicketLedger};
use vsp_store_lmdb::environment::DEFAULT_MAP_SIZE;
use vsp_store_lmdb::{check_integrity, LmdbEnvironment};
use vsp_types::{Clock, SystemClock};

use crate::context::VspCore;
use crate::info::public_key_base64;
use crate::reconciler::BackgroundReconciler;
use crate::shutdown::ShutdownController;
use crate::{NodeError, VspConfig};

/// Maximum time to wait for background tasks to drain during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct VspNode {
    pub core: VspCore,
    pub reconciler: Arc<BackgroundReconciler>,
    pub shutdown: Arc<ShutdownController>,
    task_handles: Vec<JoinHandle<()>>,
}

impl VspNode {
    /// Open the database under `config.home_dir` and connect to the daemon
    /// and the voting wallets.
    pub fn open(config: VspConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let params = config.chain_params();

        let env = LmdbEnvironment::open(&config.database_dir(), DEFAULT_MAP_SIZE)?;
        let integrity = check_integrity(&env)?;
        if !integrity.is_healthy() {
            for problem in &integrity.errors {
                tracing::error!(problem = %problem, "database integrity check failed");
            }
            return Err(NodeError::Store(StoreError::Corruption(format!(
                "{} integrity errors",
                integrity.errors.len()
            ))));
        }
        tracing::info!(
            tickets = integrity.tickets_checked,
            fee_xpubs = integrity.fee_xpubs_checked,
            "database opened"
        );

        let timeout = config.rpc_timeout();
        let daemon = DaemonRpc::new(JsonRpcClient::new(&config.daemon_endpoint()?, timeout)?, params);
        let wallets = config
            .wallet_endpoints()?
            .iter()
            .map(|endpoint| {
                let client = JsonRpcClient::new(endpoint, timeout)?;
                Ok(Arc::new(WalletRpc::new(client)) as Arc<dyn ReplicaClient>)
            })
            .collect::<Result<Vec<_>, NodeError>>()?;

        Self::from_parts(
            config,
            Arc::new(env),
            Arc::new(daemon),
            wallets,
            Arc::new(SystemClock),
        )
    }

    /// Build a node over the given backends.
    pub fn from_parts(
        config: VspConfig,
        ledger: Arc<dyn TicketLedger>,
        oracle: Arc<dyn ChainOracle>,
        replicas: Vec<Arc<dyn ReplicaClient>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        let (core, stats) = VspCore::new(config, ledger, oracle, replicas, clock)?;
        let reconciler = Arc::new(BackgroundReconciler::new(core.clone(), stats));
        Ok(Self {
            core,
            reconciler,
            shutdown: Arc::new(ShutdownController::new()),
            task_handles: Vec::new(),
        })
    }

    /// Start the background reconciler.
    pub fn start(&mut self) {
        let config = &self.core.config;
        tracing::info!(
            network = %config.network,
            pubkey = %public_key_base64(&self.core),
            wallets = self.core.coordinator.total(),
            sweep_interval_secs = config.sweep_interval_secs,
            "voting service starting"
        );
        let handle = self
            .reconciler
            .clone()
            .spawn(config.sweep_interval(), self.shutdown.subscribe());
        self.task_handles.push(handle);
    }

    /// Signal shutdown and wait for background tasks to finish.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("voting service stopping");
        self.shutdown.shutdown();

        let handles = std::mem::take(&mut self.task_handles);
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, join_all(handles))
            .await
            .is_err()
        {
            tracing::warn!(timeout = ?SHUTDOWN_TIMEOUT, "background tasks did not stop in time");
            return Err(NodeError::ShutdownTimeout);
        }
        tracing::info!("voting service stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use vsp_network::ReplicaClient;
    use vsp_nullables::{fee_xpub, NullChainOracle, NullClock, NullLedger, NullReplica, TEST_NETWORK};

    use super::*;

    fn config(home: &std::path::Path) -> VspConfig {
        VspConfig {
            network: TEST_NETWORK,
            home_dir: home.to_path_buf(),
            wallet_hosts: vec!["127.0.0.1:19110".into()],
            ..VspConfig::default()
        }
    }

    #[test]
    fn open_requires_a_created_database() {
        let home = tempfile::tempdir().unwrap();
        assert!(VspNode::open(config(home.path())).is_err());

        let xpub = fee_xpub(TEST_NETWORK).unwrap().encode();
        let dir = config(home.path()).database_dir();
        drop(LmdbEnvironment::create_new(&dir, DEFAULT_MAP_SIZE, &[5; 32], &xpub).unwrap());

        let node = VspNode::open(config(home.path())).unwrap();
        assert_eq!(node.core.coordinator.total(), 1);
    }

    #[test]
    fn invalid_config_is_refused_before_touching_disk() {
        let home = tempfile::tempdir().unwrap();
        let mut bad = config(home.path());
        bad.wallet_hosts.clear();
        assert!(matches!(VspNode::open(bad), Err(NodeError::Config(_))));
        assert!(!config(home.path()).database_dir().exists());
    }

    #[tokio::test]
    async fn background_tasks_stop_on_request() {
        let xpub = fee_xpub(TEST_NETWORK).unwrap().encode();
        let mut node = VspNode::from_parts(
            VspConfig {
                network: TEST_NETWORK,
                ..VspConfig::default()
            },
            Arc::new(NullLedger::initialized([5; 32], &xpub)),
            Arc::new(NullChainOracle::new()),
            vec![Arc::new(NullReplica::new("w")) as Arc<dyn ReplicaClient>],
            Arc::new(NullClock::new(1_700_000_000)),
        )
        .unwrap();
        node.start();
        node.stop().await.unwrap();
        assert!(node.task_handles.is_empty());
    }
}
