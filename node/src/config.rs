//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use vsp_network::RpcEndpoint;
use vsp_types::{Amount, ChainParams, NetworkId};

use crate::NodeError;

/// Configuration for a voting service provider.
///
/// Can be loaded from a TOML file via [`VspConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VspConfig {
    /// Which network the service operates on.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// Root directory for the database and log files.
    #[serde(default = "default_home_dir")]
    pub home_dir: PathBuf,

    /// Address the HTTP API binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Fee charged, as a percentage of the ticket price.
    #[serde(default = "default_fee_percentage")]
    pub fee_percentage: f64,

    /// Lowest fee ever charged, in atoms.
    #[serde(default = "default_min_fee_atoms")]
    pub min_fee_atoms: i64,

    /// Refuse new tickets. Tickets already registered are still served.
    #[serde(default)]
    pub vsp_closed: bool,

    /// Reason shown to clients while closed.
    #[serde(default)]
    pub vsp_closed_msg: String,

    /// Chain daemon RPC host, `host:port`.
    #[serde(default = "default_dcrd_host")]
    pub dcrd_host: String,

    #[serde(default)]
    pub dcrd_user: String,

    #[serde(default)]
    pub dcrd_pass: String,

    /// PEM certificate of the chain daemon. Plain HTTP when unset.
    #[serde(default)]
    pub dcrd_cert: Option<PathBuf>,

    /// Voting wallet RPC hosts.
    #[serde(default)]
    pub wallet_hosts: Vec<String>,

    #[serde(default)]
    pub wallet_user: String,

    #[serde(default)]
    pub wallet_pass: String,

    /// One certificate per wallet host, or none at all.
    #[serde(default)]
    pub wallet_certs: Vec<PathBuf>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between background sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Upper bound on every RPC to the daemon or a wallet.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Confirmations before a ticket or fee counts as mined.
    #[serde(default = "default_required_confirmations")]
    pub required_confirmations: u32,

    /// How long a fee address accepts payment.
    #[serde(default = "default_fee_address_expiration_secs")]
    pub fee_address_expiration_secs: u64,

    /// Audit records kept per ticket.
    #[serde(default = "default_max_vote_change_records")]
    pub max_vote_change_records: usize,

    /// Whether to expose the Prometheus `/metrics` endpoint.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Testnet
}

fn default_home_dir() -> PathBuf {
    PathBuf::from("./vspd_data")
}

fn default_listen() -> String {
    "0.0.0.0:8800".to_string()
}

fn default_fee_percentage() -> f64 {
    3.0
}

fn default_min_fee_atoms() -> i64 {
    10_000
}

fn default_dcrd_host() -> String {
    format!("127.0.0.1:{}", default_network().default_daemon_port())
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_rpc_timeout_secs() -> u64 {
    10
}

fn default_required_confirmations() -> u32 {
    6
}

fn default_fee_address_expiration_secs() -> u64 {
    60 * 60
}

fn default_max_vote_change_records() -> usize {
    10
}

// ── Impl ───────────────────────────────────────────────────────────────

impl VspConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if !(self.fee_percentage > 0.0 && self.fee_percentage < 100.0) {
            return Err(NodeError::Config(format!(
                "fee_percentage must be between 0 and 100, got {}",
                self.fee_percentage
            )));
        }
        if self.min_fee_atoms < 0 {
            return Err(NodeError::Config("min_fee_atoms must not be negative".into()));
        }
        if self.wallet_hosts.is_empty() {
            return Err(NodeError::Config("at least one wallet host is required".into()));
        }
        if !self.wallet_certs.is_empty() && self.wallet_certs.len() != self.wallet_hosts.len() {
            return Err(NodeError::Config(format!(
                "{} wallet hosts but {} wallet certificates",
                self.wallet_hosts.len(),
                self.wallet_certs.len()
            )));
        }
        if self.sweep_interval_secs == 0 || self.rpc_timeout_secs == 0 {
            return Err(NodeError::Config(
                "sweep_interval_secs and rpc_timeout_secs must be positive".into(),
            ));
        }
        if self.required_confirmations == 0 {
            return Err(NodeError::Config("required_confirmations must be positive".into()));
        }
        if self.max_vote_change_records == 0 {
            return Err(NodeError::Config("max_vote_change_records must be positive".into()));
        }
        Ok(())
    }

    pub fn chain_params(&self) -> &'static ChainParams {
        ChainParams::for_network(self.network)
    }

    /// `<home>/data/<network>/vspd.db`
    pub fn database_dir(&self) -> PathBuf {
        self.home_dir
            .join("data")
            .join(self.network.as_str())
            .join("vspd.db")
    }

    pub fn min_fee(&self) -> Amount {
        Amount::from_atoms(self.min_fee_atoms)
    }

    /// `max(stake × fee_percentage / 100, min_fee)`
    pub fn fee_for(&self, stake: Amount) -> Amount {
        stake.percentage(self.fee_percentage).max(self.min_fee())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn daemon_endpoint(&self) -> Result<RpcEndpoint, NodeError> {
        Ok(RpcEndpoint {
            host: self.dcrd_host.clone(),
            user: self.dcrd_user.clone(),
            pass: self.dcrd_pass.clone(),
            cert_pem: read_cert(self.dcrd_cert.as_deref())?,
        })
    }

    pub fn wallet_endpoints(&self) -> Result<Vec<RpcEndpoint>, NodeError> {
        self.wallet_hosts
            .iter()
            .enumerate()
            .map(|(i, host)| {
                Ok(RpcEndpoint {
                    host: host.clone(),
                    user: self.wallet_user.clone(),
                    pass: self.wallet_pass.clone(),
                    cert_pem: read_cert(self.wallet_certs.get(i).map(PathBuf::as_path))?,
                })
            })
            .collect()
    }
}

fn read_cert(path: Option<&Path>) -> Result<Option<Vec<u8>>, NodeError> {
    path.map(|p| {
        std::fs::read(p).map_err(|e| NodeError::Config(format!("{}: {e}", p.display())))
    })
    .transpose()
}

impl Default for VspConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            home_dir: default_home_dir(),
            listen: default_listen(),
            fee_percentage: default_fee_percentage(),
            min_fee_atoms: default_min_fee_atoms(),
            vsp_closed: false,
            vsp_closed_msg: String::new(),
            dcrd_host: default_dcrd_host(),
            dcrd_user: String::new(),
            dcrd_pass: String::new(),
            dcrd_cert: None,
            wallet_hosts: Vec::new(),
            wallet_user: String::new(),
            wallet_pass: String::new(),
            wallet_certs: Vec::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            sweep_interval_secs: default_sweep_interval_secs(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            required_confirmations: default_required_confirmations(),
            fee_address_expiration_secs: default_fee_address_expiration_secs(),
            max_vote_change_records: default_max_vote_change_records(),
            enable_metrics: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = VspConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = VspConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = VspConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.listen, "0.0.0.0:8800");
        assert_eq!(config.max_vote_change_records, 10);
        assert_eq!(config.log_format, "human");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            network = "mainnet"
            fee_percentage = 1.5
            wallet_hosts = ["10.0.0.1:9110", "10.0.0.2:9110"]
        "#;
        let config = VspConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.network, NetworkId::Mainnet);
        assert_eq!(config.fee_percentage, 1.5);
        assert_eq!(config.wallet_endpoints().unwrap().len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = VspConfig::from_toml_file(Path::new("/nonexistent/vspd.toml"));
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn validation_rejects_bad_settings() {
        let mut config = VspConfig {
            wallet_hosts: vec!["w1".into()],
            ..VspConfig::default()
        };
        assert!(config.validate().is_ok());

        config.fee_percentage = 0.0;
        assert!(config.validate().is_err());
        config.fee_percentage = 3.0;

        config.wallet_certs = vec!["a.pem".into(), "b.pem".into()];
        assert!(config.validate().is_err());
        config.wallet_certs.clear();

        config.wallet_hosts.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn fee_has_a_floor() {
        let config = VspConfig::default();
        // 3% of 1 coin.
        assert_eq!(
            config.fee_for(Amount::from_atoms(100_000_000)).atoms(),
            3_000_000
        );
        assert_eq!(config.fee_for(Amount::from_atoms(1_000)), config.min_fee());
    }

    #[test]
    fn database_lives_under_network_dir() {
        let config = VspConfig {
            home_dir: PathBuf::from("/srv/vsp"),
            network: NetworkId::Mainnet,
            ..VspConfig::default()
        };
        assert_eq!(
            config.database_dir(),
            PathBuf::from("/srv/vsp/data/mainnet/vspd.db")
        );
    }
}
