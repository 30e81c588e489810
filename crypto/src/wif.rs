//! Wallet import format for voting keys.
//!
//! Layout: base58check(`network private key id (2) ++ signature type (1) ++ seed (32)`).

use std::fmt;

use vsp_types::{ChainParams, NetworkId, PrivateKey, PublicKey};
use zeroize::Zeroize;

use crate::keys::public_from_private;
use crate::KeyError;

/// Signature type byte for Ed25519 keys.
pub const SIG_TYPE_ED25519: u8 = 1;

const PAYLOAD_LEN: usize = 35;

/// A decoded WIF private key.
pub struct Wif {
    network: NetworkId,
    key: PrivateKey,
}

impl Wif {
    pub fn new(network: NetworkId, key: PrivateKey) -> Self {
        Self { network, key }
    }

    /// Decode and check that the key belongs to `params.network`.
    pub fn decode(s: &str, params: &ChainParams) -> Result<Self, KeyError> {
        let mut payload = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|e| KeyError::Encoding(e.to_string()))?;
        let result = Self::from_payload(&payload, params);
        payload.zeroize();
        result
    }

    fn from_payload(payload: &[u8], params: &ChainParams) -> Result<Self, KeyError> {
        if payload.len() != PAYLOAD_LEN {
            return Err(KeyError::Length {
                expected: PAYLOAD_LEN,
                actual: payload.len(),
            });
        }
        if payload[..2] != params.private_key_id {
            return Err(KeyError::WrongNetwork);
        }
        if payload[2] != SIG_TYPE_ED25519 {
            return Err(KeyError::UnsupportedSigType(payload[2]));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&payload[3..]);
        Ok(Self::new(params.network, PrivateKey(seed)))
    }

    pub fn encode(&self) -> String {
        let params = ChainParams::for_network(self.network);
        let mut payload = Vec::with_capacity(PAYLOAD_LEN);
        payload.extend_from_slice(&params.private_key_id);
        payload.push(SIG_TYPE_ED25519);
        payload.extend_from_slice(&self.key.0);
        let encoded = bs58::encode(&payload).with_check().into_string();
        payload.zeroize();
        encoded
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.key
    }

    pub fn public_key(&self) -> PublicKey {
        public_from_private(&self.key)
    }
}

impl fmt::Debug for Wif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wif")
            .field("network", &self.network)
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}
