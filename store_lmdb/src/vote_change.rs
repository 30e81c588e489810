//! LMDB implementation of VoteChangeStore.
//!
//! Key format: `ticket_hash (32) ++ sequence (u32 big-endian)`, so a prefix
//! scan over the ticket hash returns its records oldest first.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use vsp_store::vote_change::{VoteChangeRecord, VoteChangeStore};
use vsp_store::StoreError;
use vsp_types::TicketHash;

use crate::LmdbError;

pub struct LmdbVoteChangeStore {
    pub(crate) env: Arc<Env>,
    pub(crate) vote_change_db: Database<Bytes, Bytes>,
}

fn record_key(hash: &TicketHash, seq: u32) -> [u8; 36] {
    let mut key = [0u8; 36];
    key[..32].copy_from_slice(hash.as_bytes());
    key[32..].copy_from_slice(&seq.to_be_bytes());
    key
}

fn key_seq(key: &[u8]) -> Result<u32, LmdbError> {
    let tail: [u8; 4] = key
        .get(32..36)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| LmdbError::Serialization("malformed vote change key".into()))?;
    Ok(u32::from_be_bytes(tail))
}

impl LmdbVoteChangeStore {
    fn keys_for(&self, txn: &heed::RoTxn, hash: &TicketHash) -> Result<Vec<Vec<u8>>, LmdbError> {
        let mut keys = Vec::new();
        for item in self.vote_change_db.prefix_iter(txn, hash.as_bytes())? {
            let (key, _) = item?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }
}

impl VoteChangeStore for LmdbVoteChangeStore {
    fn save_vote_change(
        &self,
        hash: &TicketHash,
        record: &VoteChangeRecord,
        max_records: usize,
    ) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let existing = self.keys_for(&wtxn, hash)?;
        let next_seq = match existing.last() {
            Some(key) => key_seq(key)?
                .checked_add(1)
                .ok_or_else(|| LmdbError::Schema("vote change sequence exhausted".into()))?,
            None => 0,
        };
        self.vote_change_db
            .put(&mut wtxn, &record_key(hash, next_seq), &bytes)
            .map_err(LmdbError::from)?;

        let total = existing.len() + 1;
        let excess = total.saturating_sub(max_records.max(1));
        for key in existing.iter().take(excess) {
            self.vote_change_db
                .delete(&mut wtxn, key)
                .map_err(LmdbError::from)?;
        }

        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_vote_changes(&self, hash: &TicketHash) -> Result<Vec<VoteChangeRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .vote_change_db
            .prefix_iter(&rtxn, hash.as_bytes())
            .map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for item in iter {
            let (_key, val) = item.map_err(LmdbError::from)?;
            let record: VoteChangeRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
            results.push(record);
        }
        Ok(results)
    }

    fn delete_vote_changes(&self, hash: &TicketHash) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for key in self.keys_for(&wtxn, hash)? {
            self.vote_change_db
                .delete(&mut wtxn, &key)
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
