//! JSON bodies of the public `/api/v3` interface.
//!
//! Field names are the lowercase wire names clients already use. Byte fields
//! are carried as standard base64 strings.

use serde::{Deserialize, Serialize};

use crate::{ErrorCode, PolicyMap, VoteChoices};

/// Request body of `POST /api/v3/payfee`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayFeeRequest {
    pub timestamp: i64,
    #[serde(rename = "tickethash")]
    pub ticket_hash: String,
    #[serde(rename = "feetx")]
    pub fee_tx: String,
    #[serde(rename = "votingkey")]
    pub voting_key: String,
    #[serde(rename = "votechoices", default)]
    pub vote_choices: VoteChoices,
    #[serde(rename = "tspendpolicy", default)]
    pub tspend_policy: PolicyMap,
    #[serde(rename = "treasurypolicy", default)]
    pub treasury_policy: PolicyMap,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayFeeResponse {
    pub timestamp: i64,
    #[serde(with = "base64_bytes")]
    pub request: Vec<u8>,
}

/// Request body of `POST /api/v3/feeaddress`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeAddressRequest {
    pub timestamp: i64,
    #[serde(rename = "tickethash")]
    pub ticket_hash: String,
    #[serde(rename = "tickethex")]
    pub ticket_hex: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeAddressResponse {
    pub timestamp: i64,
    #[serde(rename = "feeaddress")]
    pub fee_address: String,
    /// Minimum fee in atoms.
    #[serde(rename = "feeamount")]
    pub fee_amount: i64,
    /// Unix time after which the fee is no longer accepted.
    pub expiration: i64,
    #[serde(with = "base64_bytes")]
    pub request: Vec<u8>,
}

/// Request body of `POST /api/v3/setvotechoices`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetVoteChoicesRequest {
    pub timestamp: i64,
    #[serde(rename = "tickethash")]
    pub ticket_hash: String,
    #[serde(rename = "votechoices", default)]
    pub vote_choices: VoteChoices,
    #[serde(rename = "tspendpolicy", default)]
    pub tspend_policy: PolicyMap,
    #[serde(rename = "treasurypolicy", default)]
    pub treasury_policy: PolicyMap,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetVoteChoicesResponse {
    pub timestamp: i64,
    #[serde(with = "base64_bytes")]
    pub request: Vec<u8>,
}

/// Request body of `POST /api/v3/ticketstatus`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketStatusRequest {
    #[serde(rename = "tickethash")]
    pub ticket_hash: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketStatusResponse {
    pub timestamp: i64,
    #[serde(rename = "ticketconfirmed")]
    pub ticket_confirmed: bool,
    #[serde(rename = "feetxstatus")]
    pub fee_tx_status: String,
    #[serde(rename = "feetxhash")]
    pub fee_tx_hash: String,
    /// Empty until the fee is confirmed.
    pub outcome: String,
    #[serde(rename = "votechoices")]
    pub vote_choices: VoteChoices,
    #[serde(rename = "tspendpolicy")]
    pub tspend_policy: PolicyMap,
    #[serde(rename = "treasurypolicy")]
    pub treasury_policy: PolicyMap,
    #[serde(with = "base64_bytes")]
    pub request: Vec<u8>,
}

/// Response body of `GET /api/v3/vspinfo`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VspInfoResponse {
    #[serde(rename = "apiversions")]
    pub api_versions: Vec<i64>,
    pub timestamp: i64,
    /// The service's Ed25519 public key, base64.
    #[serde(with = "base64_bytes")]
    pub pubkey: Vec<u8>,
    #[serde(rename = "feepercentage")]
    pub fee_percentage: f64,
    #[serde(rename = "vspclosed")]
    pub vsp_closed: bool,
    #[serde(rename = "vspclosedmsg")]
    pub vsp_closed_msg: String,
    pub network: String,
    #[serde(rename = "vspdversion")]
    pub vspd_version: String,
    pub voting: i64,
    pub voted: i64,
    /// `expired + missed`.
    pub revoked: i64,
    pub expired: i64,
    pub missed: i64,
    #[serde(rename = "blockheight")]
    pub block_height: u32,
    #[serde(rename = "estimatednetworkproportion")]
    pub network_proportion: f64,
    #[serde(rename = "totalvotingwallets")]
    pub total_voting_wallets: i64,
    #[serde(rename = "votingwalletsonline")]
    pub voting_wallets_online: i64,
}

/// Body of every error response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// Serde adapter for `Vec<u8>` as a standard base64 string.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
