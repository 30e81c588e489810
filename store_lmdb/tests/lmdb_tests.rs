//! Integration tests for the LMDB ticket ledger.

use std::sync::Arc;

use tempfile::TempDir;
use vsp_store::{
    update_ticket, MetaStore, StoreError, Ticket, TicketLedger, TicketStore, UpdateError,
    VoteChangeRecord, VoteChangeStore,
};
use vsp_store_lmdb::{LmdbEnvironment, LmdbError};
use vsp_types::{Amount, FeeStatus, TicketHash, TicketOutcome, Timestamp};

const MAP_SIZE: usize = 1 << 24;

fn temp_env() -> (TempDir, LmdbEnvironment) {
    let dir = tempfile::tempdir().unwrap();
    let env = LmdbEnvironment::create_new(dir.path(), MAP_SIZE, &[9u8; 32], "xpub-one").unwrap();
    (dir, env)
}

fn ticket(n: u8) -> Ticket {
    Ticket::new_pending(
        TicketHash::new([n; 32]),
        format!("commit-{n}"),
        format!("fee-{n}"),
        n as u32,
        0,
        Amount::from_atoms(10_000),
        Timestamp::new(1_000),
    )
}

fn record(n: usize) -> VoteChangeRecord {
    VoteChangeRecord {
        request: format!("request-{n}"),
        request_signature: "sig".into(),
        response: format!("response-{n}"),
        response_signature: "server-sig".into(),
    }
}

#[test]
fn create_new_twice_fails() {
    let dir = tempfile::tempdir().unwrap();
    {
        LmdbEnvironment::create_new(dir.path(), MAP_SIZE, &[1u8; 32], "xpub").unwrap();
    }
    assert!(matches!(
        LmdbEnvironment::create_new(dir.path(), MAP_SIZE, &[1u8; 32], "xpub"),
        Err(LmdbError::AlreadyExists(_))
    ));
}

#[test]
fn open_missing_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        LmdbEnvironment::open(&dir.path().join("nothing"), MAP_SIZE),
        Err(LmdbError::NotFound(_))
    ));
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let env = LmdbEnvironment::create_new(dir.path(), MAP_SIZE, &[3u8; 32], "xpub").unwrap();
        env.ticket_store().insert_ticket(&ticket(1)).unwrap();
    }
    let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
    assert_eq!(env.meta_store().signing_seed().unwrap(), [3u8; 32]);
    let stored = env
        .ticket_store()
        .get_ticket(&TicketHash::new([1; 32]))
        .unwrap()
        .unwrap();
    assert_eq!(stored, ticket(1));
}

#[test]
fn duplicate_ticket_and_fee_address_are_refused() {
    let (_dir, env) = temp_env();
    let store = env.ticket_store();
    store.insert_ticket(&ticket(1)).unwrap();

    assert!(matches!(
        store.insert_ticket(&ticket(1)),
        Err(StoreError::Duplicate(_))
    ));

    let mut reused = ticket(2);
    reused.fee_address = "fee-1".into();
    assert!(matches!(
        store.insert_ticket(&reused),
        Err(StoreError::Duplicate(_))
    ));
    assert_eq!(store.ticket_count().unwrap(), 1);
}

#[test]
fn stale_revision_is_a_conflict() {
    let (_dir, env) = temp_env();
    let store = env.ticket_store();
    store.insert_ticket(&ticket(1)).unwrap();

    let first = store.get_ticket(&ticket(1).hash).unwrap().unwrap();
    let stale = first.clone();

    let mut next = first;
    next.confirmed = true;
    let written = store.update_ticket_if_current(&next).unwrap();
    assert_eq!(written.revision, 1);

    let mut late = stale;
    late.purchase_height = 77;
    assert!(matches!(
        store.update_ticket_if_current(&late),
        Err(StoreError::Conflict {
            expected: 0,
            found: 1
        })
    ));
}

#[test]
fn illegal_status_edge_is_refused() {
    let (_dir, env) = temp_env();
    let store = env.ticket_store();
    store.insert_ticket(&ticket(1)).unwrap();

    let mut next = store.get_ticket(&ticket(1).hash).unwrap().unwrap();
    next.fee_tx_status = FeeStatus::Confirmed;
    assert!(matches!(
        store.update_ticket_if_current(&next),
        Err(StoreError::InvalidTransition {
            from: FeeStatus::Pending,
            to: FeeStatus::Confirmed
        })
    ));
}

#[test]
fn fee_address_cannot_change() {
    let (_dir, env) = temp_env();
    let store = env.ticket_store();
    store.insert_ticket(&ticket(1)).unwrap();
    let mut next = store.get_ticket(&ticket(1).hash).unwrap().unwrap();
    next.fee_address = "elsewhere".into();
    assert!(matches!(
        store.update_ticket_if_current(&next),
        Err(StoreError::Immutable(_))
    ));
}

#[test]
fn update_entry_point_applies_change() {
    let (_dir, env) = temp_env();
    env.ticket_store().insert_ticket(&ticket(1)).unwrap();

    let updated = update_ticket(env.tickets(), &ticket(1).hash, |t| {
        t.fee_tx_status = FeeStatus::Received;
        t.voting_wif = Some("wif".into());
        Ok::<(), ()>(())
    })
    .unwrap();
    assert_eq!(updated.fee_tx_status, FeeStatus::Received);
    assert_eq!(updated.revision, 1);

    let aborted = update_ticket(env.tickets(), &ticket(1).hash, |t| {
        if t.fee_tx_status.is_received() {
            Err("already received")
        } else {
            Ok(())
        }
    });
    assert!(matches!(aborted, Err(UpdateError::Aborted("already received"))));

    let missing = update_ticket(env.tickets(), &TicketHash::new([42; 32]), |_| Ok::<(), ()>(()));
    assert!(matches!(missing, Err(UpdateError::NotFound(_))));
}

#[test]
fn concurrent_updates_are_not_lost() {
    let (_dir, env) = temp_env();
    env.ticket_store().insert_ticket(&ticket(1)).unwrap();
    let env = Arc::new(env);
    let hash = ticket(1).hash;

    let handles: Vec<_> = (0..8u32)
        .map(|i| {
            let env = env.clone();
            std::thread::spawn(move || {
                update_ticket(env.tickets(), &hash, |t| {
                    t.vote_choices.insert(format!("agenda-{i}"), "yes".into());
                    Ok::<(), ()>(())
                })
                .is_ok()
            })
        })
        .collect();
    let succeeded = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    let stored = env.tickets().get_ticket(&hash).unwrap().unwrap();
    assert_eq!(stored.vote_choices.len(), succeeded);
    assert_eq!(stored.revision, succeeded as u64);
}

#[test]
fn terminal_outcome_is_final() {
    let (_dir, env) = temp_env();
    env.ticket_store().insert_ticket(&ticket(1)).unwrap();
    let hash = ticket(1).hash;
    for status in [FeeStatus::Received, FeeStatus::Broadcast, FeeStatus::Confirmed] {
        update_ticket(env.tickets(), &hash, |t| {
            t.fee_tx_status = status;
            Ok::<(), ()>(())
        })
        .unwrap();
    }
    update_ticket(env.tickets(), &hash, |t| {
        t.outcome = Some(TicketOutcome::Voted);
        Ok::<(), ()>(())
    })
    .unwrap();

    let res = update_ticket(env.tickets(), &hash, |t| {
        t.outcome = Some(TicketOutcome::Voting);
        Ok::<(), ()>(())
    });
    assert!(matches!(
        res,
        Err(UpdateError::Store(StoreError::Immutable(_)))
    ));
}

#[test]
fn delete_frees_fee_address() {
    let (_dir, env) = temp_env();
    let store = env.ticket_store();
    store.insert_ticket(&ticket(1)).unwrap();
    store.delete_ticket(&ticket(1).hash).unwrap();
    assert!(store.get_ticket(&ticket(1).hash).unwrap().is_none());
    assert!(store.ticket_for_fee_address("fee-1").unwrap().is_none());
}

#[test]
fn vote_changes_are_ordered_and_capped() {
    let (_dir, env) = temp_env();
    let store = env.vote_change_store();
    let hash = TicketHash::new([5; 32]);
    let other = TicketHash::new([6; 32]);

    for n in 0..12 {
        store.save_vote_change(&hash, &record(n), 10).unwrap();
    }
    store.save_vote_change(&other, &record(100), 10).unwrap();

    let records = store.get_vote_changes(&hash).unwrap();
    assert_eq!(records.len(), 10);
    assert_eq!(records.first().unwrap().request, "request-2");
    assert_eq!(records.last().unwrap().request, "request-11");
    assert_eq!(store.get_vote_changes(&other).unwrap().len(), 1);

    store.delete_vote_changes(&hash).unwrap();
    assert!(store.get_vote_changes(&hash).unwrap().is_empty());
    assert_eq!(store.get_vote_changes(&other).unwrap().len(), 1);
}

#[test]
fn reserved_indexes_increase() {
    let (_dir, env) = temp_env();
    let meta = env.meta_store();
    let (xpub, first) = meta.reserve_fee_index().unwrap();
    let (_, second) = meta.reserve_fee_index().unwrap();
    assert_eq!(xpub.id, 0);
    assert_eq!(first, 1);
    assert_eq!(second, 2);
    assert_eq!(meta.fee_xpub().unwrap().last_used_idx, 2);
}

#[test]
fn retiring_xpub_starts_a_new_key() {
    let (_dir, env) = temp_env();
    let meta = env.meta_store();
    meta.reserve_fee_index().unwrap();

    let new = meta.retire_fee_xpub("xpub-two", Timestamp::new(500)).unwrap();
    assert_eq!(new.id, 1);
    assert_eq!(meta.fee_xpub().unwrap().key, "xpub-two");

    let (xpub, idx) = meta.reserve_fee_index().unwrap();
    assert_eq!((xpub.id, idx), (1, 1));

    let all = meta.all_fee_xpubs().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].retired, Some(Timestamp::new(500)));

    assert!(matches!(
        meta.retire_fee_xpub("xpub-one", Timestamp::new(600)),
        Err(StoreError::Duplicate(_))
    ));
}
