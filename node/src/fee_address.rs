//! `POST /api/v3/feeaddress`: register a ticket and issue its fee address.

use vsp_crypto::{Address, ExtendedPublicKey, KeyError};
use vsp_network::{can_ticket_vote, RawTransaction, RpcError};
use vsp_store::{update_ticket, FeeXPub, StoreError, Ticket};
use vsp_transactions::{parse_ticket, MsgTx};
use vsp_types::api::{FeeAddressRequest, FeeAddressResponse};
use vsp_types::{Amount, ErrorCode, TicketHash, Timestamp};

use crate::context::{parse_ticket_hash, update_failure, RequestContext, VspCore};
use crate::signing::SignedResponse;
use crate::ApiError;

pub async fn issue_fee_address(core: &VspCore, ctx: &RequestContext) -> Result<SignedResponse, ApiError> {
    if core.config.vsp_closed {
        return Err(ApiError::new(ErrorCode::VspClosed));
    }

    let request: FeeAddressRequest = ctx.parse()?;
    let hash = parse_ticket_hash(&request.ticket_hash)?;

    let raw = ticket_transaction(core, &hash, &request.ticket_hex).await?;
    let tx = MsgTx::from_hex(&raw.hex)
        .map_err(|e| ApiError::with_message(ErrorCode::InvalidTicket, e.to_string()))?;
    let info = parse_ticket(&tx, core.params.network)
        .map_err(|e| ApiError::with_message(ErrorCode::InvalidTicket, e.to_string()))?;

    let commitment_address = info.commitment_address.encode();
    core.authenticate(ctx, &commitment_address)?;

    let can_vote = can_ticket_vote(core.oracle.as_ref(), &hash, raw.confirmations, core.params)
        .await
        .map_err(|e| ApiError::internal("check ticket can vote", e))?;
    if !can_vote {
        return Err(ErrorCode::TicketCannotVote.into());
    }

    let now = ctx.received_at;
    let deadline = now.plus_secs(core.config.fee_address_expiration_secs);
    let fee = core.config.fee_for(info.stake);

    let ticket = match core.ledger.tickets().get_ticket(&hash) {
        Ok(Some(known)) => reuse_registration(core, known, fee, now, deadline)?,
        Ok(None) => register(core, &hash, commitment_address, fee, deadline, &raw)?,
        Err(e) => return Err(ApiError::internal("read ticket", e)),
    };

    core.signer.sign_json(&FeeAddressResponse {
        timestamp: core.now().as_secs() as i64,
        fee_address: ticket.fee_address,
        fee_amount: ticket.fee_amount.atoms(),
        expiration: ticket.fee_expiration.as_secs() as i64,
        request: ctx.body.clone(),
    })
}

/// The ticket from the daemon, broadcasting the client's copy if the daemon
/// has not seen it yet.
async fn ticket_transaction(
    core: &VspCore,
    hash: &TicketHash,
    ticket_hex: &str,
) -> Result<RawTransaction, ApiError> {
    match core.oracle.get_raw_transaction(hash).await {
        Ok(raw) => Ok(raw),
        Err(RpcError::NotFound(_)) => {
            let tx = MsgTx::from_hex(ticket_hex)
                .map_err(|e| ApiError::with_message(ErrorCode::InvalidTicket, e.to_string()))?;
            if tx.tx_hash() != *hash {
                return Err(ApiError::with_message(
                    ErrorCode::InvalidTicket,
                    "ticket hex does not match ticket hash",
                ));
            }
            core.oracle.send_raw_transaction(ticket_hex).await.map_err(|e| {
                tracing::warn!(ticket = %hash, error = %e, "ticket broadcast failed");
                ApiError::new(ErrorCode::CannotBroadcastTicket)
            })?;
            tracing::info!(ticket = %hash, "broadcast ticket on behalf of client");
            Ok(RawTransaction {
                hex: ticket_hex.to_string(),
                confirmations: 0,
                block_height: 0,
            })
        }
        Err(e) => Err(ApiError::internal("fetch ticket transaction", e)),
    }
}

/// A ticket already registered keeps its address. An expired deadline is
/// pushed back and the fee recomputed.
fn reuse_registration(
    core: &VspCore,
    known: Ticket,
    fee: Amount,
    now: Timestamp,
    deadline: Timestamp,
) -> Result<Ticket, ApiError> {
    if known.fee_tx_status.is_received() {
        return Err(ErrorCode::FeeAlreadyReceived.into());
    }
    if !known.fee_expired(now) {
        return Ok(known);
    }
    tracing::info!(ticket = %known.hash, "refreshing expired fee deadline");
    update_ticket(core.ledger.tickets(), &known.hash, |t| {
        if t.fee_tx_status.is_received() {
            return Err(ApiError::new(ErrorCode::FeeAlreadyReceived));
        }
        t.fee_amount = fee;
        t.fee_expiration = deadline;
        Ok(())
    })
    .map_err(update_failure)
}

fn register(
    core: &VspCore,
    hash: &TicketHash,
    commitment_address: String,
    fee: Amount,
    deadline: Timestamp,
    raw: &RawTransaction,
) -> Result<Ticket, ApiError> {
    let (xpub, index, fee_address) = next_fee_address(core)?;

    let mut ticket = Ticket::new_pending(
        *hash,
        commitment_address,
        fee_address.encode(),
        index,
        xpub.id,
        fee,
        deadline,
    );
    if raw.confirmations >= core.config.required_confirmations {
        ticket.confirmed = true;
        ticket.purchase_height = raw.block_height;
    }

    match core.ledger.tickets().insert_ticket(&ticket) {
        Ok(()) => {}
        // A concurrent request registered the ticket first.
        Err(StoreError::Duplicate(_)) => {
            return core.known_ticket(hash);
        }
        Err(e) => return Err(ApiError::internal("insert ticket", e)),
    }

    core.metrics.fee_addresses_issued.inc();
    tracing::info!(
        ticket = %hash,
        fee_address = %ticket.fee_address,
        index,
        fee = %fee,
        "issued fee address"
    );
    Ok(ticket)
}

/// Attempts at skipping indexes whose derived key is unusable.
const MAX_DERIVATION_ATTEMPTS: usize = 4;

/// Reserve the next index on the current fee key and derive its address.
fn next_fee_address(core: &VspCore) -> Result<(FeeXPub, u32, Address), ApiError> {
    for _ in 0..MAX_DERIVATION_ATTEMPTS {
        let (xpub, index) = core
            .ledger
            .meta()
            .reserve_fee_index()
            .map_err(|e| ApiError::internal("reserve fee address index", e))?;
        let key = ExtendedPublicKey::decode(&xpub.key, core.params)
            .map_err(|e| ApiError::internal("decode fee xpub", e))?;
        match key.fee_address(index) {
            Ok(address) => return Ok((xpub, index, address)),
            Err(KeyError::InvalidChild) => {
                tracing::warn!(xpub_id = xpub.id, index, "skipping unusable fee address index");
            }
            Err(e) => return Err(ApiError::internal("derive fee address", e)),
        }
    }
    Err(ApiError::internal(
        "derive fee address",
        "no usable index found",
    ))
}
