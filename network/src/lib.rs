//! RPC plumbing to the services the VSP depends on.
//!
//! The chain daemon answers questions about transactions and tickets; the
//! voting wallets hold voting keys and preferences. Both are reached over
//! JSON-RPC and hidden behind traits so the rest of the workspace can run
//! against in-memory doubles.

pub mod chain;
pub mod client;
pub mod error;
pub mod wallet;

pub use chain::{can_ticket_vote, BestBlock, ChainOracle, DaemonRpc, RawTransaction, TicketChainState};
pub use client::{JsonRpcClient, RpcEndpoint};
pub use error::RpcError;
pub use wallet::{ReplicaClient, VotingConfig, VotingUpdate, WalletRpc, WalletStatus, ABSTAIN};
