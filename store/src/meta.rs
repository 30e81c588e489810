//! Service-wide metadata: schema version, signing key and fee keys.

use serde::{Deserialize, Serialize};
use vsp_types::Timestamp;

use crate::StoreError;

/// An extended public key that fee addresses are derived from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeXPub {
    pub id: u32,
    /// Encoded extended public key.
    pub key: String,
    /// Highest child index handed out so far.
    pub last_used_idx: u32,
    pub retired: Option<Timestamp>,
}

pub trait MetaStore: Send + Sync {
    /// Write the signing seed and the first fee key into an empty database.
    fn initialize(&self, signing_seed: &[u8; 32], fee_xpub: &str) -> Result<(), StoreError>;

    fn get_schema_version(&self) -> Result<u32, StoreError>;

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;

    /// Seed of the Ed25519 key that signs every response.
    fn signing_seed(&self) -> Result<[u8; 32], StoreError>;

    /// The current, un-retired fee key.
    fn fee_xpub(&self) -> Result<FeeXPub, StoreError>;

    /// Every fee key ever used, oldest first.
    fn all_fee_xpubs(&self) -> Result<Vec<FeeXPub>, StoreError>;

    /// Retire the current fee key and make `new_key` current.
    ///
    /// Fails with `Duplicate` if `new_key` was used before.
    fn retire_fee_xpub(&self, new_key: &str, now: Timestamp) -> Result<FeeXPub, StoreError>;

    /// Atomically reserve the next child index of the current fee key.
    fn reserve_fee_index(&self) -> Result<(FeeXPub, u32), StoreError>;
}
