//! LMDB implementation of MetaStore.
//!
//! `meta` holds fixed keys (schema version, signing seed). `fee_xpubs` maps a
//! big-endian key id to the bincode-encoded `FeeXPub`, so the last entry is
//! always the current key.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use vsp_store::meta::{FeeXPub, MetaStore};
use vsp_store::StoreError;
use vsp_types::Timestamp;

use crate::LmdbError;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
const SIGNING_SEED_KEY: &[u8] = b"signing_seed";

pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    pub(crate) xpub_db: Database<Bytes, Bytes>,
}

impl LmdbMetaStore {
    fn current_xpub(&self, txn: &heed::RoTxn) -> Result<FeeXPub, LmdbError> {
        let (_, val) = self
            .xpub_db
            .last(txn)?
            .ok_or_else(|| LmdbError::NotFound("fee xpub".to_string()))?;
        let xpub: FeeXPub = bincode::deserialize(val)?;
        if xpub.retired.is_some() {
            return Err(LmdbError::Schema(format!(
                "newest fee xpub {} is retired",
                xpub.id
            )));
        }
        Ok(xpub)
    }

    fn put_xpub(&self, wtxn: &mut heed::RwTxn, xpub: &FeeXPub) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(xpub)?;
        self.xpub_db.put(wtxn, &xpub.id.to_be_bytes(), &bytes)?;
        Ok(())
    }
}

impl MetaStore for LmdbMetaStore {
    fn initialize(&self, signing_seed: &[u8; 32], fee_xpub: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .meta_db
            .get(&wtxn, SIGNING_SEED_KEY)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate("signing seed".into()));
        }
        self.meta_db
            .put(&mut wtxn, SIGNING_SEED_KEY, signing_seed)
            .map_err(LmdbError::from)?;
        let xpub = FeeXPub {
            id: 0,
            key: fee_xpub.to_string(),
            last_used_idx: 0,
            retired: None,
        };
        self.put_xpub(&mut wtxn, &xpub)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, SCHEMA_VERSION_KEY)
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization("schema_version has unexpected byte length".into())
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        let bytes = version.to_le_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn signing_seed(&self) -> Result<[u8; 32], StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, SIGNING_SEED_KEY)
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound("signing seed".to_string()))?;
        let seed: [u8; 32] = val
            .try_into()
            .map_err(|_| StoreError::Corruption("signing seed is not 32 bytes".into()))?;
        Ok(seed)
    }

    fn fee_xpub(&self) -> Result<FeeXPub, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.current_xpub(&rtxn)?)
    }

    fn all_fee_xpubs(&self) -> Result<Vec<FeeXPub>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.xpub_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for item in iter {
            let (_key, val) = item.map_err(LmdbError::from)?;
            let xpub: FeeXPub = bincode::deserialize(val).map_err(LmdbError::from)?;
            results.push(xpub);
        }
        Ok(results)
    }

    fn retire_fee_xpub(&self, new_key: &str, now: Timestamp) -> Result<FeeXPub, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for item in self.xpub_db.iter(&wtxn).map_err(LmdbError::from)? {
            let (_key, val) = item.map_err(LmdbError::from)?;
            let xpub: FeeXPub = bincode::deserialize(val).map_err(LmdbError::from)?;
            if xpub.key == new_key {
                return Err(StoreError::Duplicate(format!("fee xpub {}", xpub.id)));
            }
        }

        let mut old = self.current_xpub(&wtxn)?;
        old.retired = Some(now);
        let new = FeeXPub {
            id: old.id + 1,
            key: new_key.to_string(),
            last_used_idx: 0,
            retired: None,
        };
        self.put_xpub(&mut wtxn, &old)?;
        self.put_xpub(&mut wtxn, &new)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(new)
    }

    fn reserve_fee_index(&self) -> Result<(FeeXPub, u32), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut xpub = self.current_xpub(&wtxn)?;
        let idx = xpub
            .last_used_idx
            .checked_add(1)
            .ok_or_else(|| StoreError::Backend(format!("fee xpub {} exhausted", xpub.id)))?;
        xpub.last_used_idx = idx;
        self.put_xpub(&mut wtxn, &xpub)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok((xpub, idx))
    }
}
