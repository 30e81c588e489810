//! Network identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// Identifies which chain network the service operates on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    Mainnet,
    /// The public test network.
    Testnet,
    /// Local simulation network.
    Simnet,
}

impl NetworkId {
    /// Human-readable name, as reported by `/vspinfo`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet3",
            Self::Simnet => "simnet",
        }
    }

    /// Default RPC port of the chain daemon.
    pub fn default_daemon_port(&self) -> u16 {
        match self {
            Self::Mainnet => 9109,
            Self::Testnet => 19109,
            Self::Simnet => 19556,
        }
    }

    /// Default RPC port of a wallet replica.
    pub fn default_wallet_port(&self) -> u16 {
        match self {
            Self::Mainnet => 9110,
            Self::Testnet => 19110,
            Self::Simnet => 19557,
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" | "testnet3" => Ok(Self::Testnet),
            "simnet" => Ok(Self::Simnet),
            other => Err(TypeError::UnknownNetwork(other.to_string())),
        }
    }
}
