//! Preference updates for paid tickets, and ticket status queries.

use vsp_store::update_ticket;
use vsp_types::api::{
    SetVoteChoicesRequest, SetVoteChoicesResponse, TicketStatusRequest, TicketStatusResponse,
};
use vsp_types::{ErrorCode, FeeStatus, TicketHash};

use crate::context::{parse_ticket_hash, update_failure, RequestContext, VspCore};
use crate::prefs::Preferences;
use crate::signing::SignedResponse;
use crate::ApiError;

/// `POST /api/v3/setvotechoices`
pub async fn set_vote_choices(core: &VspCore, ctx: &RequestContext) -> Result<SignedResponse, ApiError> {
    let request: SetVoteChoicesRequest = ctx.parse()?;
    let hash = parse_ticket_hash(&request.ticket_hash)?;
    let ticket = core.known_ticket(&hash)?;
    core.authenticate(ctx, &ticket.commitment_address)?;

    if !ticket.fee_tx_status.is_received() {
        return Err(ErrorCode::FeeNotReceived.into());
    }

    if let Some(previous) = last_change_timestamp(core, &hash)? {
        if request.timestamp <= previous {
            return Err(ErrorCode::InvalidTimestamp.into());
        }
    }

    let prefs = Preferences {
        vote_choices: request.vote_choices,
        treasury_policy: request.treasury_policy,
        tspend_policy: request.tspend_policy,
    };
    prefs
        .validate(core.params)
        .map_err(|e| ApiError::with_message(ErrorCode::InvalidVoteChoices, e))?;

    // Entries not named in the request keep their current value.
    let updated = update_ticket(core.ledger.tickets(), &hash, |t| {
        t.vote_choices.extend(prefs.vote_choices.clone());
        t.treasury_policy.extend(prefs.treasury_policy.clone());
        t.tspend_policy.extend(prefs.tspend_policy.clone());
        Ok::<(), ApiError>(())
    })
    .map_err(update_failure)?;
    tracing::info!(ticket = %hash, "vote choices updated");

    if updated.fee_tx_status == FeeStatus::Confirmed {
        core.coordinator.synchronize(&updated).await;
    }

    let response = core.signer.sign_json(&SetVoteChoicesResponse {
        timestamp: core.now().as_secs() as i64,
        request: ctx.body.clone(),
    })?;
    core.record_vote_change(&hash, ctx, &response);
    Ok(response)
}

/// Timestamp of the most recent recorded request for `hash`.
fn last_change_timestamp(core: &VspCore, hash: &TicketHash) -> Result<Option<i64>, ApiError> {
    let records = core
        .ledger
        .vote_changes()
        .get_vote_changes(hash)
        .map_err(|e| ApiError::internal("read vote changes", e))?;
    let Some(last) = records.last() else {
        return Ok(None);
    };
    let request: serde_json::Value = serde_json::from_str(&last.request)
        .map_err(|e| ApiError::internal("decode recorded vote change", e))?;
    Ok(request.get("timestamp").and_then(serde_json::Value::as_i64))
}

/// `POST /api/v3/ticketstatus`
pub async fn ticket_status(core: &VspCore, ctx: &RequestContext) -> Result<SignedResponse, ApiError> {
    let request: TicketStatusRequest = ctx.parse()?;
    let hash = parse_ticket_hash(&request.ticket_hash)?;
    let ticket = core.known_ticket(&hash)?;
    core.authenticate(ctx, &ticket.commitment_address)?;

    core.signer.sign_json(&TicketStatusResponse {
        timestamp: core.now().as_secs() as i64,
        ticket_confirmed: ticket.confirmed,
        fee_tx_status: ticket.fee_tx_status.as_str().to_string(),
        fee_tx_hash: ticket
            .fee_tx_hash
            .map(|h| h.to_string())
            .unwrap_or_default(),
        outcome: ticket
            .outcome
            .map(|o| o.as_str().to_string())
            .unwrap_or_default(),
        vote_choices: ticket.vote_choices,
        tspend_policy: ticket.tspend_policy,
        treasury_policy: ticket.treasury_policy,
        request: ctx.body.clone(),
    })
}
