//! LMDB ticket ledger backend.
//!
//! Implements the `vsp-store` traits using the `heed` LMDB bindings. All
//! logical stores live in named databases of a single environment, so every
//! read-modify-write happens inside one LMDB write transaction.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod ticket;
pub mod vote_change;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_integrity, IntegrityReport};
