//! Nullable ledger: thread-safe in-memory ticket ledger for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use vsp_store::ticket::validate_update;
use vsp_store::{
    FeeXPub, MetaStore, StoreError, Ticket, TicketLedger, TicketStore, VoteChangeRecord,
    VoteChangeStore,
};
use vsp_types::{TicketHash, Timestamp};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct Meta {
    schema_version: u32,
    signing_seed: Option<[u8; 32]>,
    xpubs: Vec<FeeXPub>,
}

/// An in-memory ledger with the same validation rules as the LMDB backend.
#[derive(Default)]
pub struct NullLedger {
    tickets: Mutex<BTreeMap<TicketHash, Ticket>>,
    vote_changes: Mutex<HashMap<TicketHash, Vec<VoteChangeRecord>>>,
    meta: Mutex<Meta>,
    fail_writes: AtomicBool,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger initialized with a signing seed and one fee key.
    pub fn initialized(signing_seed: [u8; 32], fee_xpub: &str) -> Self {
        let ledger = Self::new();
        {
            let mut meta = lock(&ledger.meta);
            meta.signing_seed = Some(signing_seed);
            meta.xpubs.push(FeeXPub {
                id: 0,
                key: fee_xpub.to_string(),
                last_used_idx: 0,
                retired: None,
            });
        }
        ledger
    }

    /// Make every subsequent ticket write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes disabled".into()));
        }
        Ok(())
    }

    /// Overwrite a ticket without validation, as a concurrent writer would.
    pub fn force_put(&self, ticket: Ticket) {
        lock(&self.tickets).insert(ticket.hash, ticket);
    }
}

impl TicketLedger for NullLedger {
    fn tickets(&self) -> &dyn TicketStore {
        self
    }

    fn vote_changes(&self) -> &dyn VoteChangeStore {
        self
    }

    fn meta(&self) -> &dyn MetaStore {
        self
    }
}

impl TicketStore for NullLedger {
    fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tickets = lock(&self.tickets);
        if tickets.contains_key(&ticket.hash) {
            return Err(StoreError::Duplicate(format!("ticket {}", ticket.hash)));
        }
        if tickets.values().any(|t| t.fee_address == ticket.fee_address) {
            return Err(StoreError::Duplicate(format!(
                "fee address {}",
                ticket.fee_address
            )));
        }
        tickets.insert(ticket.hash, ticket.clone());
        Ok(())
    }

    fn get_ticket(&self, hash: &TicketHash) -> Result<Option<Ticket>, StoreError> {
        Ok(lock(&self.tickets).get(hash).cloned())
    }

    fn update_ticket_if_current(&self, ticket: &Ticket) -> Result<Ticket, StoreError> {
        self.check_writable()?;
        let mut tickets = lock(&self.tickets);
        let stored = tickets
            .get(&ticket.hash)
            .ok_or_else(|| StoreError::NotFound(format!("ticket {}", ticket.hash)))?;
        validate_update(stored, ticket)?;
        let mut next = ticket.clone();
        next.revision += 1;
        tickets.insert(next.hash, next.clone());
        Ok(next)
    }

    fn delete_ticket(&self, hash: &TicketHash) -> Result<(), StoreError> {
        self.check_writable()?;
        lock(&self.tickets).remove(hash);
        Ok(())
    }

    fn iter_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        Ok(lock(&self.tickets).values().cloned().collect())
    }
}

impl VoteChangeStore for NullLedger {
    fn save_vote_change(
        &self,
        hash: &TicketHash,
        record: &VoteChangeRecord,
        max_records: usize,
    ) -> Result<(), StoreError> {
        let mut all = lock(&self.vote_changes);
        let records = all.entry(*hash).or_default();
        records.push(record.clone());
        let excess = records.len().saturating_sub(max_records.max(1));
        records.drain(..excess);
        Ok(())
    }

    fn get_vote_changes(&self, hash: &TicketHash) -> Result<Vec<VoteChangeRecord>, StoreError> {
        Ok(lock(&self.vote_changes)
            .get(hash)
            .cloned()
            .unwrap_or_default())
    }

    fn delete_vote_changes(&self, hash: &TicketHash) -> Result<(), StoreError> {
        lock(&self.vote_changes).remove(hash);
        Ok(())
    }
}

impl MetaStore for NullLedger {
    fn initialize(&self, signing_seed: &[u8; 32], fee_xpub: &str) -> Result<(), StoreError> {
        let mut meta = lock(&self.meta);
        if meta.signing_seed.is_some() {
            return Err(StoreError::Duplicate("signing seed".into()));
        }
        meta.signing_seed = Some(*signing_seed);
        meta.xpubs = vec![FeeXPub {
            id: 0,
            key: fee_xpub.to_string(),
            last_used_idx: 0,
            retired: None,
        }];
        Ok(())
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        Ok(lock(&self.meta).schema_version)
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        lock(&self.meta).schema_version = version;
        Ok(())
    }

    fn signing_seed(&self) -> Result<[u8; 32], StoreError> {
        lock(&self.meta)
            .signing_seed
            .ok_or_else(|| StoreError::NotFound("signing seed".into()))
    }

    fn fee_xpub(&self) -> Result<FeeXPub, StoreError> {
        lock(&self.meta)
            .xpubs
            .last()
            .filter(|x| x.retired.is_none())
            .cloned()
            .ok_or_else(|| StoreError::NotFound("fee xpub".into()))
    }

    fn all_fee_xpubs(&self) -> Result<Vec<FeeXPub>, StoreError> {
        Ok(lock(&self.meta).xpubs.clone())
    }

    fn retire_fee_xpub(&self, new_key: &str, now: Timestamp) -> Result<FeeXPub, StoreError> {
        let mut meta = lock(&self.meta);
        if let Some(used) = meta.xpubs.iter().find(|x| x.key == new_key) {
            return Err(StoreError::Duplicate(format!("fee xpub {}", used.id)));
        }
        let current = meta
            .xpubs
            .last_mut()
            .ok_or_else(|| StoreError::NotFound("fee xpub".into()))?;
        current.retired = Some(now);
        let next = FeeXPub {
            id: current.id + 1,
            key: new_key.to_string(),
            last_used_idx: 0,
            retired: None,
        };
        meta.xpubs.push(next.clone());
        Ok(next)
    }

    fn reserve_fee_index(&self) -> Result<(FeeXPub, u32), StoreError> {
        let mut meta = lock(&self.meta);
        let current = meta
            .xpubs
            .last_mut()
            .filter(|x| x.retired.is_none())
            .ok_or_else(|| StoreError::NotFound("fee xpub".into()))?;
        current.last_used_idx += 1;
        Ok((current.clone(), current.last_used_idx))
    }
}
