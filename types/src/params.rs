//! Per-network chain parameters.
//!
//! Only the subset the service needs: encoding prefixes, ticket lifetime and
//! the agendas of the current stake vote version.

use crate::NetworkId;

/// A consensus agenda that stakeholders can vote on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Agenda {
    pub id: &'static str,
    pub choices: &'static [&'static str],
}

impl Agenda {
    pub fn has_choice(&self, choice: &str) -> bool {
        self.choices.contains(&choice)
    }
}

/// Chain parameters for one network.
#[derive(Clone, Debug)]
pub struct ChainParams {
    pub network: NetworkId,
    /// Prefix of WIF-encoded private keys.
    pub private_key_id: [u8; 2],
    /// Prefix of pay-to-pubkey-hash addresses.
    pub pubkey_hash_addr_id: [u8; 2],
    /// Version bytes of extended public keys.
    pub hd_public_key_id: [u8; 4],
    /// Version bytes of extended private keys.
    pub hd_private_key_id: [u8; 4],
    /// Largest serialized transaction accepted by the network.
    pub max_tx_size: usize,
    /// Blocks before a ticket may vote.
    pub ticket_maturity: u32,
    /// Blocks after maturity before an unselected ticket expires.
    pub ticket_expiry: u32,
    pub vote_version: u32,
    pub agendas: &'static [Agenda],
}

const YES_NO: &[&str] = &["abstain", "no", "yes"];

const AGENDAS: &[Agenda] = &[
    Agenda {
        id: "blake3pow",
        choices: YES_NO,
    },
    Agenda {
        id: "changesubsidysplitr2",
        choices: YES_NO,
    },
];

static MAINNET: ChainParams = ChainParams {
    network: NetworkId::Mainnet,
    private_key_id: [0x22, 0xde],
    pubkey_hash_addr_id: [0x07, 0x3f],
    hd_public_key_id: [0x02, 0xfd, 0xa9, 0x26],
    hd_private_key_id: [0x02, 0xfd, 0xa4, 0xe8],
    max_tx_size: 393_216,
    ticket_maturity: 256,
    ticket_expiry: 40_960,
    vote_version: 10,
    agendas: AGENDAS,
};

static TESTNET: ChainParams = ChainParams {
    network: NetworkId::Testnet,
    private_key_id: [0x23, 0x0e],
    pubkey_hash_addr_id: [0x0f, 0x21],
    hd_public_key_id: [0x04, 0x35, 0x87, 0xd1],
    hd_private_key_id: [0x04, 0x35, 0x83, 0x97],
    max_tx_size: 393_216,
    ticket_maturity: 16,
    ticket_expiry: 6_144,
    vote_version: 11,
    agendas: AGENDAS,
};

static SIMNET: ChainParams = ChainParams {
    network: NetworkId::Simnet,
    private_key_id: [0x23, 0x07],
    pubkey_hash_addr_id: [0x0e, 0x91],
    hd_public_key_id: [0x04, 0x20, 0xbd, 0x3d],
    hd_private_key_id: [0x04, 0x20, 0xb9, 0x03],
    max_tx_size: 1_000_000,
    ticket_maturity: 16,
    ticket_expiry: 384,
    vote_version: 11,
    agendas: AGENDAS,
};

impl ChainParams {
    pub fn for_network(network: NetworkId) -> &'static ChainParams {
        match network {
            NetworkId::Mainnet => &MAINNET,
            NetworkId::Testnet => &TESTNET,
            NetworkId::Simnet => &SIMNET,
        }
    }

    pub fn agenda(&self, id: &str) -> Option<&Agenda> {
        self.agendas.iter().find(|a| a.id == id)
    }

    /// Confirmations past which a ticket can no longer vote, whether it
    /// expired or was already selected.
    pub fn ticket_lifetime(&self) -> u32 {
        self.ticket_maturity + self.ticket_expiry
    }
}
