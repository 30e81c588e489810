//! Ticket records and their storage trait.

use serde::{Deserialize, Serialize};
use vsp_types::{
    Amount, FeeStatus, PolicyMap, TicketHash, TicketOutcome, Timestamp, TxHash, VoteChoices,
};

use crate::StoreError;

/// One ticket registered with the service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub hash: TicketHash,
    /// Address committed by the ticket; requests must be signed by its key.
    pub commitment_address: String,
    pub fee_address: String,
    pub fee_address_index: u32,
    pub fee_address_xpub_id: u32,
    /// Minimum fee.
    pub fee_amount: Amount,
    /// Payments are refused after this time.
    pub fee_expiration: Timestamp,
    /// The ticket has reached the required confirmations.
    pub confirmed: bool,
    /// Block height of the ticket purchase, once confirmed.
    pub purchase_height: u32,
    pub voting_wif: Option<String>,
    pub vote_choices: VoteChoices,
    pub treasury_policy: PolicyMap,
    pub tspend_policy: PolicyMap,
    pub fee_tx_hex: Option<String>,
    pub fee_tx_hash: Option<TxHash>,
    pub fee_tx_status: FeeStatus,
    /// Set to `Voting` when the fee is confirmed.
    pub outcome: Option<TicketOutcome>,
    /// Bumped by the store on every successful write.
    pub revision: u64,
}

impl Ticket {
    /// A freshly registered ticket waiting for its fee.
    pub fn new_pending(
        hash: TicketHash,
        commitment_address: String,
        fee_address: String,
        fee_address_index: u32,
        fee_address_xpub_id: u32,
        fee_amount: Amount,
        fee_expiration: Timestamp,
    ) -> Self {
        Self {
            hash,
            commitment_address,
            fee_address,
            fee_address_index,
            fee_address_xpub_id,
            fee_amount,
            fee_expiration,
            confirmed: false,
            purchase_height: 0,
            voting_wif: None,
            vote_choices: VoteChoices::new(),
            treasury_policy: PolicyMap::new(),
            tspend_policy: PolicyMap::new(),
            fee_tx_hex: None,
            fee_tx_hash: None,
            fee_tx_status: FeeStatus::Pending,
            outcome: None,
            revision: 0,
        }
    }

    pub fn fee_expired(&self, now: Timestamp) -> bool {
        self.fee_expiration.is_before(now)
    }

    /// Fee confirmed and the ticket is still waiting to vote.
    pub fn is_active(&self) -> bool {
        self.fee_tx_status == FeeStatus::Confirmed && self.outcome == Some(TicketOutcome::Voting)
    }
}

/// Check that `next` is a legal successor of `stored`.
///
/// Backends call this inside the same transaction that writes `next`.
pub fn validate_update(stored: &Ticket, next: &Ticket) -> Result<(), StoreError> {
    if stored.revision != next.revision {
        return Err(StoreError::Conflict {
            expected: next.revision,
            found: stored.revision,
        });
    }
    if stored.hash != next.hash {
        return Err(StoreError::Immutable("hash"));
    }
    if stored.fee_address != next.fee_address
        || stored.fee_address_index != next.fee_address_index
        || stored.fee_address_xpub_id != next.fee_address_xpub_id
    {
        return Err(StoreError::Immutable("fee address"));
    }
    if !stored.fee_tx_status.can_reach(next.fee_tx_status) {
        return Err(StoreError::InvalidTransition {
            from: stored.fee_tx_status,
            to: next.fee_tx_status,
        });
    }
    if matches!(stored.outcome, Some(o) if o.is_terminal()) && stored.outcome != next.outcome {
        return Err(StoreError::Immutable("terminal outcome"));
    }
    Ok(())
}

/// Per-outcome ticket counts for statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub voting: u64,
    pub voted: u64,
    pub expired: u64,
    pub missed: u64,
}

/// Trait for ticket storage operations.
pub trait TicketStore: Send + Sync {
    /// Insert a new ticket. Fails with `Duplicate` if the hash or the fee
    /// address is already registered.
    fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError>;

    fn get_ticket(&self, hash: &TicketHash) -> Result<Option<Ticket>, StoreError>;

    /// Compare-and-swap write.
    ///
    /// Succeeds only if the stored revision equals `ticket.revision` and
    /// [`validate_update`] accepts the change. Returns the ticket as stored,
    /// with its revision bumped.
    fn update_ticket_if_current(&self, ticket: &Ticket) -> Result<Ticket, StoreError>;

    fn delete_ticket(&self, hash: &TicketHash) -> Result<(), StoreError>;

    fn iter_tickets(&self) -> Result<Vec<Ticket>, StoreError>;

    fn ticket_count(&self) -> Result<u64, StoreError> {
        self.iter_tickets().map(|v| v.len() as u64)
    }

    fn tickets_with_fee_status(&self, status: FeeStatus) -> Result<Vec<Ticket>, StoreError> {
        Ok(self
            .iter_tickets()?
            .into_iter()
            .filter(|t| t.fee_tx_status == status)
            .collect())
    }

    /// Tickets not yet confirmed on chain.
    fn unconfirmed_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        Ok(self
            .iter_tickets()?
            .into_iter()
            .filter(|t| !t.confirmed)
            .collect())
    }

    /// Tickets whose voting configuration must be present on every replica.
    fn active_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        Ok(self
            .iter_tickets()?
            .into_iter()
            .filter(Ticket::is_active)
            .collect())
    }

    fn outcome_counts(&self) -> Result<OutcomeCounts, StoreError> {
        let mut counts = OutcomeCounts::default();
        for ticket in self.iter_tickets()? {
            match ticket.outcome {
                Some(TicketOutcome::Voting) => counts.voting += 1,
                Some(TicketOutcome::Voted) => counts.voted += 1,
                Some(TicketOutcome::Expired) => counts.expired += 1,
                Some(TicketOutcome::Missed) => counts.missed += 1,
                None => {}
            }
        }
        Ok(counts)
    }
}
