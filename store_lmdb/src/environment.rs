//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, EnvOpenOptions};

use vsp_store::{MetaStore, TicketLedger, TicketStore, VoteChangeStore};

use crate::meta::LmdbMetaStore;
use crate::migration::Migrator;
use crate::ticket::LmdbTicketStore;
use crate::vote_change::LmdbVoteChangeStore;
use crate::LmdbError;

/// Default LMDB map size (1 GiB).
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

const MAX_DBS: u32 = 8;

/// The open ledger: one heed environment and the stores over it.
pub struct LmdbEnvironment {
    tickets: LmdbTicketStore,
    vote_changes: LmdbVoteChangeStore,
    meta: LmdbMetaStore,
}

impl LmdbEnvironment {
    /// Whether a database already exists at `path`.
    pub fn exists(path: &Path) -> bool {
        path.join("data.mdb").exists()
    }

    /// Create a new database at `path` holding the signing seed and first fee key.
    ///
    /// Refuses to touch an existing database.
    pub fn create_new(
        path: &Path,
        map_size: usize,
        signing_seed: &[u8; 32],
        fee_xpub: &str,
    ) -> Result<Self, LmdbError> {
        if Self::exists(path) {
            return Err(LmdbError::AlreadyExists(path.display().to_string()));
        }
        let env = Self::open_or_create(path, map_size)?;
        env.meta.initialize(signing_seed, fee_xpub)?;
        tracing::info!(path = %path.display(), "created new database");
        Ok(env)
    }

    /// Open an existing database and bring its schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        if !Self::exists(path) {
            return Err(LmdbError::NotFound(format!(
                "no database at {}, run `vspadmin createdatabase` first",
                path.display()
            )));
        }
        Self::open_or_create(path, map_size)
    }

    fn open_or_create(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Io(e.to_string()))?;

        // SAFETY: the environment is opened once per process and the files
        // are not modified by anything but this environment.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)
        }?;

        let mut wtxn = env.write_txn()?;
        let tickets_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("tickets"))?;
        let fee_address_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("fee_addresses"))?;
        let vote_change_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("vote_changes"))?;
        let xpub_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("fee_xpubs"))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let env = Arc::new(env);
        let ledger = Self {
            tickets: LmdbTicketStore {
                env: env.clone(),
                tickets_db,
                fee_address_db,
            },
            vote_changes: LmdbVoteChangeStore {
                env: env.clone(),
                vote_change_db,
            },
            meta: LmdbMetaStore {
                env,
                meta_db,
                xpub_db,
            },
        };

        Migrator::run(&ledger.tickets, &ledger.meta)?;
        Ok(ledger)
    }

    pub fn ticket_store(&self) -> &LmdbTicketStore {
        &self.tickets
    }

    pub fn vote_change_store(&self) -> &LmdbVoteChangeStore {
        &self.vote_changes
    }

    pub fn meta_store(&self) -> &LmdbMetaStore {
        &self.meta
    }
}

impl TicketLedger for LmdbEnvironment {
    fn tickets(&self) -> &dyn TicketStore {
        &self.tickets
    }

    fn vote_changes(&self) -> &dyn VoteChangeStore {
        &self.vote_changes
    }

    fn meta(&self) -> &dyn MetaStore {
        &self.meta
    }
}
