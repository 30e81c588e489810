//! Voting wallets: the replicas that hold voting keys and cast votes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use vsp_types::{PolicyMap, TicketHash, VoteChoices};

use crate::client::JsonRpcClient;
use crate::RpcError;

/// The value a wallet reports for a preference that was never set.
pub const ABSTAIN: &str = "abstain";

/// Preferences a wallet holds for one ticket.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VotingConfig {
    pub vote_choices: VoteChoices,
    pub treasury_policy: PolicyMap,
    pub tspend_policy: PolicyMap,
}

fn without_abstain(map: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    map.iter()
        .filter(|(_, v)| v.as_str() != ABSTAIN)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn abstain_missing(target: &mut BTreeMap<String, String>, current: &BTreeMap<String, String>) {
    for key in current.keys() {
        target
            .entry(key.clone())
            .or_insert_with(|| ABSTAIN.to_string());
    }
}

impl VotingConfig {
    /// Equal once unset and abstaining entries are treated alike.
    pub fn equivalent(&self, other: &VotingConfig) -> bool {
        without_abstain(&self.vote_choices) == without_abstain(&other.vote_choices)
            && without_abstain(&self.treasury_policy) == without_abstain(&other.treasury_policy)
            && without_abstain(&self.tspend_policy) == without_abstain(&other.tspend_policy)
    }

    /// The writes that make a wallet holding `current` hold `self`.
    ///
    /// Entries the wallet has and `self` lacks are reset to abstain.
    pub fn overwrite_of(&self, current: &VotingConfig) -> VotingConfig {
        let mut next = self.clone();
        abstain_missing(&mut next.vote_choices, &current.vote_choices);
        abstain_missing(&mut next.treasury_policy, &current.treasury_policy);
        abstain_missing(&mut next.tspend_policy, &current.tspend_policy);
        next
    }
}

/// Everything a wallet needs to vote with a ticket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VotingUpdate {
    pub ticket: TicketHash,
    pub voting_wif: String,
    /// The wallet does not hold the ticket yet: import the key and rescan
    /// before writing preferences.
    pub import_key: bool,
    /// Height the wallet rescans from after importing the key.
    pub rescan_from: u32,
    pub config: VotingConfig,
}

/// Health as reported by the wallet itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalletStatus {
    pub daemon_connected: bool,
    pub unlocked: bool,
    pub voting: bool,
}

impl WalletStatus {
    pub fn is_healthy(&self) -> bool {
        self.daemon_connected && self.unlocked && self.voting
    }
}

/// One voting wallet.
#[async_trait]
pub trait ReplicaClient: Send + Sync {
    /// Identifies the wallet in logs.
    fn name(&self) -> &str;

    async fn status(&self) -> Result<WalletStatus, RpcError>;

    /// Write every preference in `update`, importing the voting key first
    /// when `update.import_key` is set.
    async fn push(&self, update: &VotingUpdate) -> Result<(), RpcError>;

    /// `None` if the wallet does not know the ticket.
    async fn voting_config(&self, ticket: &TicketHash) -> Result<Option<VotingConfig>, RpcError>;
}

#[derive(Deserialize)]
struct WalletInfoReply {
    daemonconnected: bool,
    unlocked: bool,
    voting: bool,
}

#[derive(Deserialize)]
struct VoteChoice {
    agendaid: String,
    choiceid: String,
}

#[derive(Deserialize)]
struct VoteChoicesReply {
    choices: Vec<VoteChoice>,
}

#[derive(Deserialize)]
struct TreasuryPolicyEntry {
    key: String,
    policy: String,
}

#[derive(Deserialize)]
struct TSpendPolicyEntry {
    hash: String,
    policy: String,
}

const IMPORT_LABEL: &str = "imported";

/// `ReplicaClient` backed by a wallet's JSON-RPC interface.
pub struct WalletRpc {
    name: String,
    client: JsonRpcClient,
}

impl WalletRpc {
    pub fn new(client: JsonRpcClient) -> Self {
        Self {
            name: client.url().to_string(),
            client,
        }
    }
}

#[async_trait]
impl ReplicaClient for WalletRpc {
    fn name(&self) -> &str {
        &self.name
    }

    async fn status(&self) -> Result<WalletStatus, RpcError> {
        let info: WalletInfoReply = self.client.call("walletinfo", json!([])).await?;
        Ok(WalletStatus {
            daemon_connected: info.daemonconnected,
            unlocked: info.unlocked,
            voting: info.voting,
        })
    }

    async fn push(&self, update: &VotingUpdate) -> Result<(), RpcError> {
        let ticket = update.ticket.to_string();
        if update.import_key {
            let _: serde_json::Value = self
                .client
                .call(
                    "importprivkey",
                    json!([update.voting_wif, IMPORT_LABEL, true, update.rescan_from]),
                )
                .await?;
        }
        for (agenda, choice) in &update.config.vote_choices {
            let _: serde_json::Value = self
                .client
                .call("setvotechoice", json!([agenda, choice, ticket]))
                .await?;
        }
        for (key, policy) in &update.config.treasury_policy {
            let _: serde_json::Value = self
                .client
                .call("settreasurypolicy", json!([key, policy, ticket]))
                .await?;
        }
        for (hash, policy) in &update.config.tspend_policy {
            let _: serde_json::Value = self
                .client
                .call("settspendpolicy", json!([hash, policy, ticket]))
                .await?;
        }
        Ok(())
    }

    async fn voting_config(&self, ticket: &TicketHash) -> Result<Option<VotingConfig>, RpcError> {
        let ticket = ticket.to_string();
        match self
            .client
            .call::<serde_json::Value>("gettransaction", json!([ticket]))
            .await
        {
            Ok(_) => {}
            Err(RpcError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        }

        let choices: VoteChoicesReply = self
            .client
            .call("getvotechoices", json!([ticket]))
            .await?;
        let treasury: Vec<TreasuryPolicyEntry> = self
            .client
            .call("treasurypolicy", json!([null, ticket]))
            .await?;
        let tspend: Vec<TSpendPolicyEntry> = self
            .client
            .call("tspendpolicy", json!([null, ticket]))
            .await?;

        Ok(Some(VotingConfig {
            vote_choices: choices
                .choices
                .into_iter()
                .map(|c| (c.agendaid, c.choiceid))
                .collect(),
            treasury_policy: treasury.into_iter().map(|e| (e.key, e.policy)).collect(),
            tspend_policy: tspend.into_iter().map(|e| (e.hash, e.policy)).collect(),
        }))
    }
}
