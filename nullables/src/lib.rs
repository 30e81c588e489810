//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the service (clock, ledger, chain daemon,
//! voting wallets) sits behind a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod chain;
pub mod clock;
pub mod fixtures;
pub mod ledger;
pub mod replica;

pub use chain::NullChainOracle;
pub use clock::NullClock;
pub use fixtures::{fee_tx, fee_xpub, sign_with, TicketFixture, TEST_NETWORK, TICKET_PRICE};
pub use ledger::NullLedger;
pub use replica::NullReplica;
