//! Ledger integrity checks.
//!
//! Run on startup to detect corruption early, before the service starts
//! accepting fees.

use vsp_store::{MetaStore, TicketStore};

use crate::{LmdbEnvironment, LmdbError};

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub tickets_checked: u64,
    pub fee_xpubs_checked: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check the ledger for inconsistencies.
///
/// Problems with individual records are collected in the report; only a
/// failure to read the database at all is returned as an error.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();

    if let Err(e) = env.meta_store().signing_seed() {
        report.errors.push(format!("signing seed unreadable: {e}"));
    }

    let xpubs = env.meta_store().all_fee_xpubs()?;
    report.fee_xpubs_checked = xpubs.len() as u64;
    let unretired: Vec<u32> = xpubs
        .iter()
        .filter(|x| x.retired.is_none())
        .map(|x| x.id)
        .collect();
    match (unretired.as_slice(), xpubs.last()) {
        ([current], Some(last)) if *current == last.id => {}
        _ => report.errors.push(format!(
            "expected exactly one current fee xpub as the newest entry, found {unretired:?}"
        )),
    }

    let tickets = env.ticket_store();
    for ticket in tickets.iter_tickets()? {
        report.tickets_checked += 1;
        match tickets.ticket_for_fee_address(&ticket.fee_address)? {
            Some(hash) if hash == ticket.hash => {}
            Some(other) => report.errors.push(format!(
                "fee address {} of ticket {} is indexed to ticket {}",
                ticket.fee_address, ticket.hash, other
            )),
            None => report.errors.push(format!(
                "fee address {} of ticket {} is not indexed",
                ticket.fee_address, ticket.hash
            )),
        }
        if ticket.voting_wif.is_none() && ticket.fee_tx_status.is_received() {
            report.errors.push(format!(
                "ticket {} has fee status {} but no voting key",
                ticket.hash, ticket.fee_tx_status
            ));
        }
        if !xpubs.iter().any(|x| x.id == ticket.fee_address_xpub_id) {
            report.errors.push(format!(
                "ticket {} references unknown fee xpub {}",
                ticket.hash, ticket.fee_address_xpub_id
            ));
        }
    }

    Ok(report)
}
