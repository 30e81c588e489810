//! Fee payments from registration to a confirmed, voting ticket.

mod common;

use common::{LogCapture, TestVsp, MIN_FEE};
use vsp_network::RpcError;
use vsp_nullables::TicketFixture;
use vsp_store::VoteChangeStore;
use vsp_types::api::PayFeeResponse;
use vsp_types::{ErrorCode, FeeStatus, TicketOutcome, TxHash};

#[tokio::test]
async fn exact_fee_on_confirmed_ticket_is_broadcast() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    let issued = vsp.register(&ticket, 6).await;
    assert_eq!(issued.fee_amount, MIN_FEE);

    let request = vsp.payment(&ticket, MIN_FEE);
    let ctx = vsp.signed(&ticket, &request);
    let response = vsp_node::pay_fee(&vsp.node.core, &ctx).await.unwrap();

    let body: PayFeeResponse = vsp.decode(&response);
    assert_eq!(body.request, ctx.body);

    let stored = vsp.ticket(&ticket);
    assert_eq!(stored.fee_tx_status, FeeStatus::Broadcast);
    assert_eq!(stored.voting_wif.as_deref(), Some(ticket.voting_wif().as_str()));
    assert_eq!(vsp.oracle.broadcasts(), [request.fee_tx]);

    let audit = vsp.ledger.get_vote_changes(&ticket.hash()).unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].response, response.body);
}

#[tokio::test]
async fn unknown_outputs_broadcast_failure_is_reported() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    vsp.register(&ticket, 6).await;
    vsp.oracle
        .fail_broadcasts(Some(RpcError::UnknownOutputs("missing inputs".into())));

    let err = vsp.pay(&ticket, &vsp.payment(&ticket, MIN_FEE)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::CannotBroadcastFeeUnknownOutputs);
    assert_eq!(vsp.ticket(&ticket).fee_tx_status, FeeStatus::Error);
}

#[tokio::test]
async fn other_broadcast_failures_use_the_generic_code() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    vsp.register(&ticket, 6).await;
    vsp.oracle.fail_broadcasts(Some(RpcError::Rpc {
        code: -26,
        message: "insufficient priority".into(),
    }));

    let err = vsp.pay(&ticket, &vsp.payment(&ticket, MIN_FEE)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::CannotBroadcastFee);
}

#[tokio::test]
async fn malformed_preferences_are_dropped_not_rejected() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    vsp.register(&ticket, 6).await;

    let mut request = vsp.payment(&ticket, MIN_FEE);
    request
        .vote_choices
        .insert("nosuchagenda".into(), "yes".into());
    request.treasury_policy.insert("not-a-key".into(), "yes".into());
    let logs = LogCapture::default();
    let guard = logs.install();
    vsp.pay(&ticket, &request).await.unwrap();
    drop(guard);

    let logs = logs.contents();
    assert!(logs.contains("WARN"));
    assert!(logs.contains("ignoring invalid vote choices"));
    assert!(logs.contains("ignoring invalid treasury policy"));
    assert!(!logs.contains("ignoring invalid tspend policy"));

    // A map with any invalid entry is dropped whole; the payment still counts.
    let stored = vsp.ticket(&ticket);
    assert_eq!(stored.fee_tx_status, FeeStatus::Broadcast);
    assert!(stored.vote_choices.is_empty());
    assert!(stored.treasury_policy.is_empty());
}

#[tokio::test]
async fn one_atom_short_is_too_small() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    vsp.register(&ticket, 6).await;

    let err = vsp
        .pay(&ticket, &vsp.payment(&ticket, MIN_FEE - 1))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::FeeTooSmall);
    assert_eq!(vsp.ticket(&ticket).fee_tx_status, FeeStatus::Pending);

    // The ticket is untouched and a correct payment still goes through.
    vsp.pay(&ticket, &vsp.payment(&ticket, MIN_FEE)).await.unwrap();
}

#[tokio::test]
async fn voting_key_must_match_the_ticket() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    vsp.register(&ticket, 6).await;

    let mut request = vsp.payment(&ticket, MIN_FEE);
    request.voting_key = TicketFixture::new(2).voting_wif();
    let err = vsp.pay(&ticket, &request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidPrivKey);

    request.voting_key = "not a key".into();
    let err = vsp.pay(&ticket, &request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidPrivKey);
    assert!(vsp.ticket(&ticket).voting_wif.is_none());
}

#[tokio::test]
async fn payment_to_another_address_is_invalid() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    let other = TicketFixture::new(2);
    vsp.register(&ticket, 6).await;
    vsp.register(&other, 6).await;

    let mut request = vsp.payment(&ticket, MIN_FEE);
    request.fee_tx = vsp.payment(&other, MIN_FEE).fee_tx;
    let err = vsp.pay(&ticket, &request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFeeTx);
    assert!(err.message.contains("did not include any payments"));

    request.fee_tx = "zz".into();
    let err = vsp.pay(&ticket, &request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFeeTx);
}

#[tokio::test]
async fn second_payment_is_refused() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    vsp.register(&ticket, 6).await;
    let request = vsp.payment(&ticket, MIN_FEE);

    vsp.pay(&ticket, &request).await.unwrap();
    let err = vsp.pay(&ticket, &request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::FeeAlreadyReceived);
    assert_eq!(vsp.oracle.broadcasts().len(), 1);
}

#[tokio::test]
async fn concurrent_payments_accept_exactly_one() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    vsp.register(&ticket, 0).await;
    let first = vsp.signed(&ticket, &vsp.payment(&ticket, MIN_FEE));
    let second = vsp.signed(&ticket, &vsp.payment(&ticket, MIN_FEE + 1));

    let (a, b) = tokio::join!(
        vsp_node::pay_fee(&vsp.node.core, &first),
        vsp_node::pay_fee(&vsp.node.core, &second),
    );
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let rejected = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(rejected.code, ErrorCode::FeeAlreadyReceived);
    assert_eq!(vsp.ticket(&ticket).fee_tx_status, FeeStatus::Received);
}

#[tokio::test]
async fn requests_must_be_signed_by_the_commitment_key() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    vsp.register(&ticket, 6).await;

    let mut ctx = vsp.signed(&ticket, &vsp.payment(&ticket, MIN_FEE));
    ctx.client_signature = TicketFixture::new(2).sign_request(&ctx.body);
    let err = vsp_node::pay_fee(&vsp.node.core, &ctx).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BadSignature);

    ctx.client_signature.clear();
    let err = vsp_node::pay_fee(&vsp.node.core, &ctx).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BadSignature);
}

#[tokio::test]
async fn late_payment_is_expired() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    vsp.register(&ticket, 6).await;
    let request = vsp.payment(&ticket, MIN_FEE);

    vsp.clock.advance(vsp.node.core.config.fee_address_expiration_secs + 1);
    let err = vsp.pay(&ticket, &request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::FeeExpired);
}

#[tokio::test]
async fn unregistered_ticket_is_unknown() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    vsp.register(&ticket, 6).await;
    let stranger = TicketFixture::new(9);

    let mut request = vsp.payment(&ticket, MIN_FEE);
    request.ticket_hash = stranger.hash().to_string();
    let err = vsp.pay(&stranger, &request).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::UnknownTicket);
}

#[tokio::test]
async fn ticket_past_its_lifetime_cannot_vote() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    vsp.register(&ticket, 6).await;
    vsp.oracle.set_confirmations(&ticket.hash(), 7_000);

    let err = vsp
        .pay(&ticket, &vsp.payment(&ticket, MIN_FEE))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TicketCannotVote);
}

#[tokio::test]
async fn unconfirmed_ticket_goes_all_the_way_to_voting() {
    let vsp = TestVsp::new();
    let ticket = TicketFixture::new(1);
    vsp.register(&ticket, 0).await;
    let request = vsp.payment(&ticket, MIN_FEE);
    vsp.pay(&ticket, &request).await.unwrap();

    // Not broadcast until the ticket itself is mined.
    assert_eq!(vsp.ticket(&ticket).fee_tx_status, FeeStatus::Received);
    assert!(vsp.oracle.broadcasts().is_empty());

    let reconciler = vsp.node.reconciler.clone();
    vsp.oracle.set_confirmations(&ticket.hash(), 6);
    let report = reconciler.sweep().await.unwrap();
    assert_eq!(report.tickets_confirmed, 1);
    assert_eq!(report.fees_broadcast, 1);
    assert_eq!(vsp.ticket(&ticket).fee_tx_status, FeeStatus::Broadcast);

    let fee_hash: TxHash = vsp.ticket(&ticket).fee_tx_hash.unwrap();
    vsp.oracle.add_transaction(fee_hash, request.fee_tx.clone(), 6);
    let report = reconciler.sweep().await.unwrap();
    assert_eq!(report.fees_confirmed, 1);

    let stored = vsp.ticket(&ticket);
    assert_eq!(stored.fee_tx_status, FeeStatus::Confirmed);
    assert_eq!(stored.outcome, Some(TicketOutcome::Voting));
    for wallet in &vsp.wallets {
        assert_eq!(
            wallet.voting_wif_of(&ticket.hash()).as_deref(),
            Some(ticket.voting_wif().as_str())
        );
        assert_eq!(wallet.config_of(&ticket.hash()).unwrap().vote_choices["blake3pow"], "yes");
    }
}
