//! Transactions as the service sees them.
//!
//! - **wire**: decode/encode of serialized transactions, transaction hashes
//! - **sanity**: context-free structural checks applied to submitted fee payments
//! - **script**: pay-to-pubkey-hash, voting-rights and commitment templates
//! - **ticket**: recognizing ticket purchases and their committed addresses

pub mod error;
pub mod sanity;
pub mod script;
pub mod ticket;
pub mod wire;

pub use error::TxError;
pub use sanity::check_transaction_sanity;
pub use script::{payment_script, voting_rights_script, DEFAULT_SCRIPT_VERSION};
pub use ticket::{is_ticket, parse_ticket, TicketInfo};
pub use wire::{MsgTx, OutPoint, TxIn, TxOut};
