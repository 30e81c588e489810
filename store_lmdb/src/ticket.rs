//! LMDB implementation of TicketStore.
//!
//! `tickets` maps the 32-byte ticket hash to the bincode-encoded record.
//! `fee_addresses` maps each fee address to the hash of the ticket it was
//! issued for, enforcing address uniqueness.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use vsp_store::ticket::{validate_update, Ticket, TicketStore};
use vsp_store::StoreError;
use vsp_types::TicketHash;

use crate::LmdbError;

pub struct LmdbTicketStore {
    pub(crate) env: Arc<Env>,
    pub(crate) tickets_db: Database<Bytes, Bytes>,
    pub(crate) fee_address_db: Database<Bytes, Bytes>,
}

impl LmdbTicketStore {
    fn read(&self, txn: &heed::RoTxn, hash: &TicketHash) -> Result<Option<Ticket>, LmdbError> {
        match self.tickets_db.get(txn, hash.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, wtxn: &mut RwTxn, ticket: &Ticket) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(ticket)?;
        self.tickets_db.put(wtxn, ticket.hash.as_bytes(), &bytes)?;
        Ok(())
    }

    /// Rebuild the fee address index from the ticket records.
    pub(crate) fn rebuild_fee_address_index(&self) -> Result<u64, LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        self.fee_address_db.clear(&mut wtxn)?;
        let mut entries = Vec::new();
        for item in self.tickets_db.iter(&wtxn)? {
            let (key, val) = item?;
            let ticket: Ticket = bincode::deserialize(val)?;
            entries.push((ticket.fee_address, key.to_vec()));
        }
        for (address, hash) in &entries {
            self.fee_address_db.put(&mut wtxn, address.as_bytes(), hash)?;
        }
        wtxn.commit()?;
        Ok(entries.len() as u64)
    }

    /// Hash of the ticket a fee address was issued for.
    pub fn ticket_for_fee_address(&self, address: &str) -> Result<Option<TicketHash>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .fee_address_db
            .get(&rtxn, address.as_bytes())
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let arr: [u8; 32] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization("fee address index entry is not a hash".into())
                })?;
                Ok(Some(TicketHash::new(arr)))
            }
            None => Ok(None),
        }
    }
}

impl TicketStore for LmdbTicketStore {
    fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self.read(&wtxn, &ticket.hash)?.is_some() {
            return Err(StoreError::Duplicate(format!("ticket {}", ticket.hash)));
        }
        let address = ticket.fee_address.as_bytes();
        if self
            .fee_address_db
            .get(&wtxn, address)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!(
                "fee address {}",
                ticket.fee_address
            )));
        }
        self.write(&mut wtxn, ticket)?;
        self.fee_address_db
            .put(&mut wtxn, address, ticket.hash.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_ticket(&self, hash: &TicketHash) -> Result<Option<Ticket>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.read(&rtxn, hash)?)
    }

    fn update_ticket_if_current(&self, ticket: &Ticket) -> Result<Ticket, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let stored = self
            .read(&wtxn, &ticket.hash)?
            .ok_or_else(|| StoreError::NotFound(format!("ticket {}", ticket.hash)))?;
        validate_update(&stored, ticket)?;

        let mut next = ticket.clone();
        next.revision += 1;
        self.write(&mut wtxn, &next)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(next)
    }

    fn delete_ticket(&self, hash: &TicketHash) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if let Some(stored) = self.read(&wtxn, hash)? {
            self.fee_address_db
                .delete(&mut wtxn, stored.fee_address.as_bytes())
                .map_err(LmdbError::from)?;
            self.tickets_db
                .delete(&mut wtxn, hash.as_bytes())
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn iter_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.tickets_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for item in iter {
            let (_key, val) = item.map_err(LmdbError::from)?;
            let ticket: Ticket = bincode::deserialize(val).map_err(LmdbError::from)?;
            results.push(ticket);
        }
        Ok(results)
    }

    fn ticket_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.tickets_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
