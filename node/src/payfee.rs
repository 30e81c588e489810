//! `POST /api/v3/payfee`: validate a fee payment and record the voting key.
//!
//! Checks run in a fixed order and the first failure is returned. Nothing is
//! written until every check has passed; the write itself goes through the
//! ledger's update entry point, which re-reads the ticket and refuses to
//! accept a second fee if a concurrent request got there first.

use vsp_crypto::{Address, Wif};
use vsp_network::{can_ticket_vote, RpcError};
use vsp_store::{update_ticket, Ticket};
use vsp_transactions::{check_transaction_sanity, payment_script, voting_rights_script, MsgTx};
use vsp_types::api::{PayFeeRequest, PayFeeResponse};
use vsp_types::{ErrorCode, FeeStatus};

use crate::context::{parse_ticket_hash, update_failure, RequestContext, VspCore};
use crate::prefs::Preferences;
use crate::signing::SignedResponse;
use crate::ApiError;

pub async fn pay_fee(core: &VspCore, ctx: &RequestContext) -> Result<SignedResponse, ApiError> {
    let request: PayFeeRequest = ctx.parse()?;
    let hash = parse_ticket_hash(&request.ticket_hash)?;
    let ticket = core.known_ticket(&hash)?;
    core.authenticate(ctx, &ticket.commitment_address)?;

    if ticket.fee_tx_status.is_received() {
        return Err(ErrorCode::FeeAlreadyReceived.into());
    }

    let raw_ticket = core
        .oracle
        .get_raw_transaction(&hash)
        .await
        .map_err(|e| ApiError::internal("fetch ticket transaction", e))?;

    let can_vote = can_ticket_vote(core.oracle.as_ref(), &hash, raw_ticket.confirmations, core.params)
        .await
        .map_err(|e| ApiError::internal("check ticket can vote", e))?;
    if !can_vote {
        return Err(ErrorCode::TicketCannotVote.into());
    }

    if ticket.fee_expired(ctx.received_at) {
        return Err(ErrorCode::FeeExpired.into());
    }

    let voting_key = Wif::decode(&request.voting_key, core.params).map_err(|e| {
        tracing::debug!(ticket = %hash, error = %e, "undecodable voting key");
        ApiError::new(ErrorCode::InvalidPrivKey)
    })?;

    let prefs = Preferences {
        vote_choices: request.vote_choices.clone(),
        treasury_policy: request.treasury_policy.clone(),
        tspend_policy: request.tspend_policy.clone(),
    }
    .keep_valid(core.params);
    let rejected = prefs.rejected();
    if !rejected.is_empty() {
        tracing::warn!(ticket = %hash, ?rejected, "fee payment carries invalid preferences, keeping the rest");
    }

    let fee_tx = MsgTx::from_hex(&request.fee_tx).map_err(|e| {
        ApiError::with_message(ErrorCode::InvalidFeeTx, format!("cannot decode fee tx: {e}"))
    })?;
    check_transaction_sanity(&fee_tx, core.params)
        .map_err(|e| ApiError::with_message(ErrorCode::InvalidFeeTx, e.to_string()))?;

    let fee_address = Address::decode(&ticket.fee_address, core.params)
        .map_err(|e| ApiError::internal("decode stored fee address", e))?;
    let (version, script) = payment_script(&fee_address);
    let paid = fee_tx
        .outputs
        .iter()
        .find(|out| out.script_version == version && out.pk_script == script)
        .map(|out| out.amount())
        .ok_or_else(|| {
            ApiError::with_message(
                ErrorCode::InvalidFeeTx,
                format!(
                    "feetx did not include any payments for fee address {}",
                    ticket.fee_address
                ),
            )
        })?;

    if paid < ticket.fee_amount {
        tracing::info!(ticket = %hash, %paid, required = %ticket.fee_amount, "fee too small");
        return Err(ApiError::with_message(
            ErrorCode::FeeTooSmall,
            format!(
                "fee too small: received {paid}, required {}",
                ticket.fee_amount
            ),
        ));
    }

    let ticket_tx = MsgTx::from_hex(&raw_ticket.hex)
        .map_err(|e| ApiError::internal("decode ticket transaction", e))?;
    let voting_address = Address::from_public_key(core.params.network, &voting_key.public_key());
    let (vote_version, vote_script) = voting_rights_script(&voting_address);
    let key_matches = ticket_tx
        .outputs
        .first()
        .is_some_and(|out| out.script_version == vote_version && out.pk_script == vote_script);
    if !key_matches {
        return Err(ApiError::with_message(
            ErrorCode::InvalidPrivKey,
            "voting address does not match provided private key",
        ));
    }

    let fee_tx_hash = fee_tx.tx_hash();
    let voting_wif = voting_key.encode();
    let stored = update_ticket(core.ledger.tickets(), &hash, |t| {
        if t.fee_tx_status.is_received() {
            return Err(ApiError::new(ErrorCode::FeeAlreadyReceived));
        }
        t.fee_tx_hex = Some(request.fee_tx.clone());
        t.fee_tx_hash = Some(fee_tx_hash);
        t.fee_tx_status = FeeStatus::Received;
        t.voting_wif = Some(voting_wif.clone());
        prefs.apply_to(t);
        Ok(())
    })
    .map_err(update_failure)?;

    core.metrics.fees_received.inc();
    tracing::info!(ticket = %hash, fee_tx = %fee_tx_hash, %paid, "fee received");

    if stored.confirmed {
        broadcast_fee(core, &stored).await?;
    }

    let response = core.signer.sign_json(&PayFeeResponse {
        timestamp: core.now().as_secs() as i64,
        request: ctx.body.clone(),
    })?;
    core.record_vote_change(&hash, ctx, &response);
    Ok(response)
}

/// Broadcast a received fee and record the result: `Broadcast` on success,
/// `Error` on failure.
pub async fn broadcast_fee(core: &VspCore, ticket: &Ticket) -> Result<Ticket, ApiError> {
    let Some(fee_tx) = ticket.fee_tx_hex.as_deref() else {
        return Err(ApiError::internal(
            "broadcast fee",
            format!("ticket {} has no fee tx", ticket.hash),
        ));
    };

    match core.oracle.send_raw_transaction(fee_tx).await {
        Ok(()) => {
            core.metrics.fee_broadcasts.inc();
            tracing::info!(ticket = %ticket.hash, "fee broadcast");
            core.set_fee_status(&ticket.hash, FeeStatus::Broadcast)
                .map_err(|e| ApiError::internal("record fee broadcast", e))
        }
        Err(e) => {
            core.metrics.fee_broadcast_failures.inc();
            tracing::warn!(ticket = %ticket.hash, error = %e, "fee broadcast failed");
            if let Err(store) = core.set_fee_status(&ticket.hash, FeeStatus::Error) {
                tracing::error!(ticket = %ticket.hash, error = %store, "failed to record fee error");
            }
            Err(match e {
                RpcError::UnknownOutputs(_) => ErrorCode::CannotBroadcastFeeUnknownOutputs.into(),
                _ => ErrorCode::CannotBroadcastFee.into(),
            })
        }
    }
}
