//! Fundamental types for the voting service provider.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! hashes, amounts, timestamps, network parameters, ticket state enums, API error
//! codes and the JSON request/response bodies of the public API.

pub mod amount;
pub mod api;
pub mod error;
pub mod hash;
pub mod keys;
pub mod network;
pub mod params;
pub mod prefs;
pub mod state;
pub mod time;

pub use amount::Amount;
pub use error::{ErrorCode, TypeError};
pub use hash::{TicketHash, TxHash};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use network::NetworkId;
pub use params::{Agenda, ChainParams};
pub use prefs::{PolicyMap, VoteChoices};
pub use state::{FeeStatus, TicketOutcome};
pub use time::{Clock, SystemClock, Timestamp};
