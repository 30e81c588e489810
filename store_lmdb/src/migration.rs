//! Database schema migration engine.
//!
//! Tracks a monotonically increasing schema version in the meta store and
//! runs sequential migration functions to bring an older database up to date.

use vsp_store::MetaStore;

use crate::meta::LmdbMetaStore;
use crate::ticket::LmdbTicketStore;
use crate::LmdbError;

/// The schema version that the current code expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Runs database migrations to bring the schema up to date.
pub struct Migrator;

impl Migrator {
    /// Check the stored schema version and run any needed migrations.
    ///
    /// - Version 0 means a fresh database (no version stored yet).
    /// - A stored version *higher* than `CURRENT_SCHEMA_VERSION` was written
    ///   by a newer release and is refused.
    pub fn run(tickets: &LmdbTicketStore, meta: &LmdbMetaStore) -> Result<(), LmdbError> {
        let current = meta.get_schema_version()?;

        if current == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = current, "database schema is up to date");
            return Ok(());
        }

        if current > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::Schema(format!(
                "database schema version {} is newer than supported version {}",
                current, CURRENT_SCHEMA_VERSION
            )));
        }

        for version in current..CURRENT_SCHEMA_VERSION {
            tracing::info!(from = version, to = version + 1, "running migration");
            run_migration(tickets, version, version + 1)?;
            meta.set_schema_version(version + 1)?;
        }

        tracing::info!(version = CURRENT_SCHEMA_VERSION, "migration complete");
        Ok(())
    }
}

fn run_migration(tickets: &LmdbTicketStore, from: u32, to: u32) -> Result<(), LmdbError> {
    match (from, to) {
        (0, 1) => Ok(()),
        (1, 2) => {
            // v2 adds the fee address uniqueness index.
            let indexed = tickets.rebuild_fee_address_index()?;
            tracing::info!(tickets = indexed, "fee address index built");
            Ok(())
        }
        _ => Err(LmdbError::Schema(format!(
            "unknown migration: {} -> {}",
            from, to
        ))),
    }
}
