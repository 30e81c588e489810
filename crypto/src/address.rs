//! Pay-to-pubkey-hash addresses.
//!
//! Address format: base58check(`network prefix (2 bytes) ++ hash160(pubkey) (20 bytes)`).

use std::fmt;

use vsp_types::{ChainParams, NetworkId, PublicKey};

use crate::hash::hash160;
use crate::KeyError;

const PAYLOAD_LEN: usize = 22;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    network: NetworkId,
    hash: [u8; 20],
}

impl Address {
    pub fn from_pubkey_hash(network: NetworkId, hash: [u8; 20]) -> Self {
        Self { network, hash }
    }

    pub fn from_public_key(network: NetworkId, key: &PublicKey) -> Self {
        Self::from_pubkey_hash(network, hash160(key.as_bytes()))
    }

    /// Decode and check that the address belongs to `params.network`.
    pub fn decode(s: &str, params: &ChainParams) -> Result<Self, KeyError> {
        let payload = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|e| KeyError::Encoding(e.to_string()))?;
        if payload.len() != PAYLOAD_LEN {
            return Err(KeyError::Length {
                expected: PAYLOAD_LEN,
                actual: payload.len(),
            });
        }
        if payload[..2] != params.pubkey_hash_addr_id {
            return Err(KeyError::WrongNetwork);
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[2..]);
        Ok(Self::from_pubkey_hash(params.network, hash))
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn pubkey_hash(&self) -> &[u8; 20] {
        &self.hash
    }

    pub fn encode(&self) -> String {
        let params = ChainParams::for_network(self.network);
        let mut payload = Vec::with_capacity(PAYLOAD_LEN);
        payload.extend_from_slice(&params.pubkey_hash_addr_id);
        payload.extend_from_slice(&self.hash);
        bs58::encode(payload).with_check().into_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    #[test]
    fn encode_decode() {
        let kp = keypair_from_seed(&[3u8; 32]);
        let addr = Address::from_public_key(NetworkId::Testnet, &kp.public);
        let params = ChainParams::for_network(NetworkId::Testnet);
        let decoded = Address::decode(&addr.encode(), params).unwrap();
        assert_eq!(decoded, addr);
    }

    #[test]
    fn other_network_rejected() {
        let addr = Address::from_pubkey_hash(NetworkId::Mainnet, [9u8; 20]);
        let params = ChainParams::for_network(NetworkId::Simnet);
        assert_eq!(
            Address::decode(&addr.encode(), params),
            Err(KeyError::WrongNetwork)
        );
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let addr = Address::from_pubkey_hash(NetworkId::Mainnet, [9u8; 20]).encode();
        let mut chars: Vec<char> = addr.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '2' { '3' } else { '2' };
        let tampered: String = chars.into_iter().collect();
        let params = ChainParams::for_network(NetworkId::Mainnet);
        assert!(matches!(
            Address::decode(&tampered, params),
            Err(KeyError::Encoding(_))
        ));
    }
}
