//! Ticket ledger storage traits.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod error;
pub mod meta;
pub mod ticket;
pub mod update;
pub mod vote_change;

pub use error::StoreError;
pub use meta::{FeeXPub, MetaStore};
pub use ticket::{OutcomeCounts, Ticket, TicketStore};
pub use update::{update_ticket, UpdateError};
pub use vote_change::{VoteChangeRecord, VoteChangeStore};

/// The complete persistent state of the service.
pub trait TicketLedger: Send + Sync {
    fn tickets(&self) -> &dyn TicketStore;
    fn vote_changes(&self) -> &dyn VoteChangeStore;
    fn meta(&self) -> &dyn MetaStore;
}
