//! The chain daemon as seen by the service.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use vsp_types::{ChainParams, TxHash};

use crate::client::JsonRpcClient;
use crate::RpcError;

/// A transaction as reported by the daemon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTransaction {
    pub hex: String,
    /// Zero while in the mempool.
    pub confirmations: u32,
    /// Zero while in the mempool.
    pub block_height: u32,
}

/// Tip of the main chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BestBlock {
    pub height: u32,
    /// Number of live tickets in the network.
    pub pool_size: u32,
}

/// Where a ticket is in its on-chain life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TicketChainState {
    /// Still maturing or in the live pool.
    Live,
    Voted,
    Expired,
    Missed,
}

/// Read and broadcast access to the chain. Implementations do not retry.
#[async_trait]
pub trait ChainOracle: Send + Sync {
    /// `NotFound` when the daemon does not know the transaction.
    async fn get_raw_transaction(&self, hash: &TxHash) -> Result<RawTransaction, RpcError>;

    /// Broadcasting a transaction the daemon already has succeeds.
    async fn send_raw_transaction(&self, hex: &str) -> Result<(), RpcError>;

    async fn exists_live_ticket(&self, hash: &TxHash) -> Result<bool, RpcError>;

    async fn ticket_chain_state(&self, hash: &TxHash) -> Result<TicketChainState, RpcError>;

    async fn best_block(&self) -> Result<BestBlock, RpcError>;
}

/// Whether a ticket with `confirmations` can still vote at some point.
///
/// Immature tickets always can and tickets past their lifetime never can;
/// in between the live pool decides.
pub async fn can_ticket_vote<O: ChainOracle + ?Sized>(
    oracle: &O,
    hash: &TxHash,
    confirmations: u32,
    params: &ChainParams,
) -> Result<bool, RpcError> {
    if confirmations > params.ticket_lifetime() + 1 {
        return Ok(false);
    }
    if confirmations <= params.ticket_maturity {
        return Ok(true);
    }
    oracle.exists_live_ticket(hash).await
}

const ALREADY_HAVE_TX: &str = "already have transaction";

#[derive(Deserialize)]
struct VerboseTx {
    hex: String,
    #[serde(default)]
    confirmations: i64,
    #[serde(default)]
    blockheight: i64,
}

#[derive(Deserialize)]
struct BestBlockReply {
    hash: String,
}

#[derive(Deserialize)]
struct BlockHeaderReply {
    height: u32,
    poolsize: u32,
}

/// `ChainOracle` backed by the daemon's JSON-RPC interface.
pub struct DaemonRpc {
    client: JsonRpcClient,
    params: &'static ChainParams,
}

impl DaemonRpc {
    pub fn new(client: JsonRpcClient, params: &'static ChainParams) -> Self {
        Self { client, params }
    }

    /// Query one of the daemon's ticket bitset methods for a single ticket.
    async fn in_ticket_set(&self, method: &str, hash: &TxHash) -> Result<bool, RpcError> {
        let bitset: String = self
            .client
            .call(method, json!([[hash.to_string()]]))
            .await?;
        first_bit(&bitset)
    }
}

fn first_bit(bitset: &str) -> Result<bool, RpcError> {
    let bytes = hex::decode(bitset).map_err(|e| RpcError::Decode(e.to_string()))?;
    Ok(bytes.first().is_some_and(|b| b & 1 == 1))
}

fn clamp_u32(n: i64) -> u32 {
    n.clamp(0, u32::MAX as i64) as u32
}

#[async_trait]
impl ChainOracle for DaemonRpc {
    async fn get_raw_transaction(&self, hash: &TxHash) -> Result<RawTransaction, RpcError> {
        let tx: VerboseTx = self
            .client
            .call("getrawtransaction", json!([hash.to_string(), 1]))
            .await?;
        Ok(RawTransaction {
            hex: tx.hex,
            confirmations: clamp_u32(tx.confirmations),
            block_height: clamp_u32(tx.blockheight),
        })
    }

    async fn send_raw_transaction(&self, hex: &str) -> Result<(), RpcError> {
        let result: Result<String, RpcError> = self
            .client
            .call("sendrawtransaction", json!([hex, false]))
            .await;
        match result {
            Ok(hash) => {
                tracing::debug!(%hash, "transaction broadcast");
                Ok(())
            }
            Err(RpcError::Rpc { message, .. }) if message.contains(ALREADY_HAVE_TX) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn exists_live_ticket(&self, hash: &TxHash) -> Result<bool, RpcError> {
        self.client
            .call("existsliveticket", json!([hash.to_string()]))
            .await
    }

    async fn ticket_chain_state(&self, hash: &TxHash) -> Result<TicketChainState, RpcError> {
        let tx = self.get_raw_transaction(hash).await?;
        if tx.confirmations <= self.params.ticket_maturity || self.exists_live_ticket(hash).await?
        {
            return Ok(TicketChainState::Live);
        }
        if self.in_ticket_set("existsmissedtickets", hash).await? {
            return Ok(TicketChainState::Missed);
        }
        if self.in_ticket_set("existsexpiredtickets", hash).await? {
            return Ok(TicketChainState::Expired);
        }
        Ok(TicketChainState::Voted)
    }

    async fn best_block(&self) -> Result<BestBlock, RpcError> {
        let best: BestBlockReply = self.client.call("getbestblock", json!([])).await?;
        let header: BlockHeaderReply = self
            .client
            .call("getblockheader", json!([best.hash, true]))
            .await?;
        Ok(BestBlock {
            height: header.height,
            pool_size: header.poolsize,
        })
    }
}
