//! `GET /api/v3/vspinfo`

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use vsp_types::api::VspInfoResponse;

use crate::context::VspCore;
use crate::signing::SignedResponse;
use crate::ApiError;

pub const API_VERSIONS: &[i64] = &[3];

pub fn vsp_info(core: &VspCore) -> Result<SignedResponse, ApiError> {
    let stats = core.stats.snapshot();
    core.signer.sign_json(&VspInfoResponse {
        api_versions: API_VERSIONS.to_vec(),
        timestamp: core.now().as_secs() as i64,
        pubkey: core.signer.public_key().as_bytes().to_vec(),
        fee_percentage: core.config.fee_percentage,
        vsp_closed: core.config.vsp_closed,
        vsp_closed_msg: core.config.vsp_closed_msg.clone(),
        network: core.params.network.as_str().to_string(),
        vspd_version: env!("CARGO_PKG_VERSION").to_string(),
        voting: stats.voting as i64,
        voted: stats.voted as i64,
        revoked: stats.revoked() as i64,
        expired: stats.expired as i64,
        missed: stats.missed as i64,
        block_height: stats.block_height,
        network_proportion: stats.network_proportion,
        total_voting_wallets: stats.total_voting_wallets as i64,
        voting_wallets_online: stats.voting_wallets_online as i64,
    })
}

/// The service public key as clients see it in `/vspinfo`.
pub fn public_key_base64(core: &VspCore) -> String {
    STANDARD.encode(core.signer.public_key().as_bytes())
}
