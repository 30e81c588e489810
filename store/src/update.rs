//! The single entry point for modifying a stored ticket.
//!
//! Every change is applied to a freshly read copy and written back with a
//! revision compare-and-swap. A concurrent writer causes a re-read and a
//! second application of the change, never a lost update.

use std::fmt;

use vsp_types::TicketHash;

use crate::{StoreError, Ticket, TicketStore};

/// Attempts before a persistently contended update gives up.
pub const MAX_UPDATE_ATTEMPTS: usize = 8;

#[derive(Debug)]
pub enum UpdateError<E> {
    /// No ticket with this hash.
    NotFound(TicketHash),
    /// The change function refused the current state.
    Aborted(E),
    Store(StoreError),
}

impl<E: fmt::Display> fmt::Display for UpdateError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(hash) => write!(f, "ticket {hash} not found"),
            Self::Aborted(e) => write!(f, "update aborted: {e}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for UpdateError<E> {}

/// Re-read `hash`, apply `change`, and write the result with compare-and-swap.
///
/// `change` may run more than once and must only depend on the ticket it is
/// given. Returning `Err` from it abandons the update.
pub fn update_ticket<S, E, F>(
    store: &S,
    hash: &TicketHash,
    mut change: F,
) -> Result<Ticket, UpdateError<E>>
where
    S: TicketStore + ?Sized,
    F: FnMut(&mut Ticket) -> Result<(), E>,
{
    let mut last_conflict = None;
    for _ in 0..MAX_UPDATE_ATTEMPTS {
        let mut ticket = store
            .get_ticket(hash)
            .map_err(UpdateError::Store)?
            .ok_or(UpdateError::NotFound(*hash))?;
        change(&mut ticket).map_err(UpdateError::Aborted)?;
        match store.update_ticket_if_current(&ticket) {
            Ok(stored) => return Ok(stored),
            Err(e @ StoreError::Conflict { .. }) => last_conflict = Some(e),
            Err(e) => return Err(UpdateError::Store(e)),
        }
    }
    Err(UpdateError::Store(last_conflict.unwrap_or_else(|| {
        StoreError::Backend("update retries exhausted".into())
    })))
}
