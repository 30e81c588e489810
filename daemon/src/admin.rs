//! One-off maintenance operations run by `vspadmin`.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};

use vsp_crypto::{generate_keypair, ExtendedPublicKey, KeyError};
use vsp_node::VspConfig;
use vsp_store::{FeeXPub, TicketLedger};
use vsp_store_lmdb::environment::DEFAULT_MAP_SIZE;
use vsp_store_lmdb::LmdbEnvironment;
use vsp_types::{ChainParams, NetworkId, Timestamp};

/// Name of the config file inside the home directory.
pub const CONFIG_FILENAME: &str = "vspd.toml";

pub fn config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(CONFIG_FILENAME)
}

fn database_dir(home_dir: &Path, network: NetworkId) -> PathBuf {
    VspConfig {
        network,
        home_dir: home_dir.to_path_buf(),
        ..VspConfig::default()
    }
    .database_dir()
}

/// Reject anything but a public extended key for `network`.
pub fn validate_fee_xpub(key: &str, network: NetworkId) -> anyhow::Result<()> {
    match ExtendedPublicKey::decode(key, ChainParams::for_network(network)) {
        Ok(_) => Ok(()),
        Err(KeyError::PrivateExtendedKey) => {
            Err(anyhow!("feexpub is a private key, should be public"))
        }
        Err(e) => Err(anyhow!("failed to parse feexpub: {e}")),
    }
}

/// Create the database for `network` with a fresh signing key and `fee_xpub`
/// as the first fee key.
pub fn create_database(home_dir: &Path, network: NetworkId, fee_xpub: &str) -> anyhow::Result<PathBuf> {
    let db_dir = database_dir(home_dir, network);
    if LmdbEnvironment::exists(&db_dir) {
        bail!("{network} database already exists in {}", db_dir.display());
    }
    validate_fee_xpub(fee_xpub, network)?;

    let signing = generate_keypair().context("failed to generate signing key")?;
    LmdbEnvironment::create_new(&db_dir, DEFAULT_MAP_SIZE, &signing.private.0, fee_xpub)
        .with_context(|| format!("error creating database in {}", db_dir.display()))?;
    Ok(db_dir)
}

/// Write a config file holding every default value.
pub fn write_config(home_dir: &Path) -> anyhow::Result<PathBuf> {
    let path = config_path(home_dir);
    if path.exists() {
        bail!("config file already exists in {}", home_dir.display());
    }
    std::fs::create_dir_all(home_dir)
        .with_context(|| format!("failed to create {}", home_dir.display()))?;

    let config = VspConfig {
        home_dir: home_dir.to_path_buf(),
        ..VspConfig::default()
    };
    std::fs::write(&path, config.to_toml_string()?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Retire the current fee key; tickets registered from now on use `fee_xpub`.
pub fn retire_xpub(
    home_dir: &Path,
    network: NetworkId,
    fee_xpub: &str,
    now: Timestamp,
) -> anyhow::Result<FeeXPub> {
    validate_fee_xpub(fee_xpub, network)?;
    let db_dir = database_dir(home_dir, network);
    let env = LmdbEnvironment::open(&db_dir, DEFAULT_MAP_SIZE)
        .with_context(|| format!("error opening database in {}", db_dir.display()))?;
    env.meta()
        .retire_fee_xpub(fee_xpub, now)
        .context("failed to retire fee xpub")
}
