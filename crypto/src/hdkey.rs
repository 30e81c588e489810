//! Extended public keys and non-hardened child derivation.
//!
//! Serialized layout (78 bytes, base58check):
//! `version (4) ++ depth (1) ++ parent fingerprint (4) ++ child number (4)
//!  ++ chain code (32) ++ 0x00 ++ key (32)`.
//!
//! Child keys are derived additively on the Ed25519 curve:
//! `I = HMAC-SHA512(chain_code, 0x00 ++ parent_key ++ index_be)`,
//! `child = parent + I[..32] * G`, `child_chain_code = I[32..]`.
//! The holder of the parent scalar `k` signs for the child with `k + I[..32]`.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use vsp_types::{ChainParams, NetworkId, PublicKey};

use crate::address::Address;
use crate::hash::hash160;
use crate::KeyError;

type HmacSha512 = Hmac<Sha512>;

/// First hardened child index.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Branch of the fee key that per-ticket fee addresses are derived from.
pub const EXTERNAL_BRANCH: u32 = 0;

const SERIALIZED_LEN: usize = 78;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedPublicKey {
    network: NetworkId,
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
    chain_code: [u8; 32],
    key: PublicKey,
}

impl ExtendedPublicKey {
    /// A depth-zero key. The point must be a valid, non small-order curve point.
    pub fn new_master(
        network: NetworkId,
        chain_code: [u8; 32],
        key: PublicKey,
    ) -> Result<Self, KeyError> {
        decompress(&key)?;
        Ok(Self {
            network,
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_number: 0,
            chain_code,
            key,
        })
    }

    /// Decode an extended key, rejecting private keys and other networks.
    pub fn decode(s: &str, params: &ChainParams) -> Result<Self, KeyError> {
        let payload = bs58::decode(s.trim())
            .with_check(None)
            .into_vec()
            .map_err(|e| KeyError::Encoding(e.to_string()))?;
        if payload.len() != SERIALIZED_LEN {
            return Err(KeyError::Length {
                expected: SERIALIZED_LEN,
                actual: payload.len(),
            });
        }
        let version = &payload[0..4];
        if version == params.hd_private_key_id {
            return Err(KeyError::PrivateExtendedKey);
        }
        if version != params.hd_public_key_id {
            return Err(KeyError::WrongNetwork);
        }
        if payload[45] != 0 {
            return Err(KeyError::Encoding("unexpected key marker byte".into()));
        }

        let mut parent_fingerprint = [0u8; 4];
        parent_fingerprint.copy_from_slice(&payload[5..9]);
        let mut child_number = [0u8; 4];
        child_number.copy_from_slice(&payload[9..13]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&payload[13..45]);
        let key = PublicKey::from_slice(&payload[46..78])
            .map_err(|e| KeyError::Encoding(e.to_string()))?;
        decompress(&key)?;

        Ok(Self {
            network: params.network,
            depth: payload[4],
            parent_fingerprint,
            child_number: u32::from_be_bytes(child_number),
            chain_code,
            key,
        })
    }

    pub fn encode(&self) -> String {
        let params = ChainParams::for_network(self.network);
        let mut payload = Vec::with_capacity(SERIALIZED_LEN);
        payload.extend_from_slice(&params.hd_public_key_id);
        payload.push(self.depth);
        payload.extend_from_slice(&self.parent_fingerprint);
        payload.extend_from_slice(&self.child_number.to_be_bytes());
        payload.extend_from_slice(&self.chain_code);
        payload.push(0);
        payload.extend_from_slice(self.key.as_bytes());
        bs58::encode(payload).with_check().into_string()
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Derive the non-hardened child at `index`.
    ///
    /// `InvalidChild` is returned for the (negligibly rare) index whose child
    /// point is degenerate; callers move on to the next index.
    pub fn child(&self, index: u32) -> Result<Self, KeyError> {
        if index >= HARDENED_OFFSET {
            return Err(KeyError::HardenedDerivation);
        }
        let parent = decompress(&self.key)?;
        let (tweak, chain_code) = derive_tweak(&self.chain_code, &self.key, index)?;
        let child: EdwardsPoint = parent + EdwardsPoint::mul_base(&tweak);
        if child.is_small_order() {
            return Err(KeyError::InvalidChild);
        }

        let mut parent_fingerprint = [0u8; 4];
        parent_fingerprint.copy_from_slice(&hash160(self.key.as_bytes())[..4]);

        Ok(Self {
            network: self.network,
            depth: self.depth.saturating_add(1),
            parent_fingerprint,
            child_number: index,
            chain_code,
            key: PublicKey(child.compress().to_bytes()),
        })
    }

    /// The fee address at `index` on the external branch.
    pub fn fee_address(&self, index: u32) -> Result<Address, KeyError> {
        let child = self.child(EXTERNAL_BRANCH)?.child(index)?;
        Ok(Address::from_public_key(self.network, &child.key))
    }
}

fn decompress(key: &PublicKey) -> Result<EdwardsPoint, KeyError> {
    let point = CompressedEdwardsY(key.0)
        .decompress()
        .ok_or(KeyError::InvalidPoint)?;
    if point.is_small_order() {
        return Err(KeyError::InvalidPoint);
    }
    Ok(point)
}

/// Scalar tweak and child chain code for `index`.
fn derive_tweak(
    chain_code: &[u8; 32],
    key: &PublicKey,
    index: u32,
) -> Result<(Scalar, [u8; 32]), KeyError> {
    let mut mac = HmacSha512::new_from_slice(chain_code).map_err(|_| KeyError::InvalidChild)?;
    mac.update(&[0u8]);
    mac.update(key.as_bytes());
    mac.update(&index.to_be_bytes());
    let out = mac.finalize().into_bytes();

    let mut left = [0u8; 32];
    left.copy_from_slice(&out[..32]);
    let mut right = [0u8; 32];
    right.copy_from_slice(&out[32..]);
    Ok((Scalar::from_bytes_mod_order(left), right))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master_from_scalar(scalar: &Scalar) -> ExtendedPublicKey {
        let point = EdwardsPoint::mul_base(scalar);
        ExtendedPublicKey::new_master(
            NetworkId::Testnet,
            [7u8; 32],
            PublicKey(point.compress().to_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn child_matches_private_derivation() {
        let secret = Scalar::from_bytes_mod_order([11u8; 32]);
        let master = master_from_scalar(&secret);

        let child = master.child(5).unwrap();
        let (tweak, chain_code) = derive_tweak(&[7u8; 32], master.public_key(), 5).unwrap();
        let expected = EdwardsPoint::mul_base(&(secret + tweak));

        assert_eq!(child.public_key().0, expected.compress().to_bytes());
        assert_eq!(child.chain_code, chain_code);
        assert_eq!(child.depth(), 1);
    }

    #[test]
    fn fee_addresses_are_distinct_and_stable() {
        let master = master_from_scalar(&Scalar::from_bytes_mod_order([3u8; 32]));
        let a0 = master.fee_address(0).unwrap();
        let a1 = master.fee_address(1).unwrap();
        assert_ne!(a0, a1);
        assert_eq!(master.fee_address(0).unwrap(), a0);
    }

    #[test]
    fn hardened_index_rejected() {
        let master = master_from_scalar(&Scalar::from_bytes_mod_order([3u8; 32]));
        assert_eq!(
            master.child(HARDENED_OFFSET),
            Err(KeyError::HardenedDerivation)
        );
    }

    #[test]
    fn encode_decode() {
        let master = master_from_scalar(&Scalar::from_bytes_mod_order([9u8; 32]));
        let params = ChainParams::for_network(NetworkId::Testnet);
        let decoded = ExtendedPublicKey::decode(&master.encode(), params).unwrap();
        assert_eq!(decoded, master);
    }

    #[test]
    fn private_version_rejected() {
        let params = ChainParams::for_network(NetworkId::Testnet);
        let master = master_from_scalar(&Scalar::from_bytes_mod_order([9u8; 32]));
        let mut payload = bs58::decode(master.encode())
            .with_check(None)
            .into_vec()
            .unwrap();
        payload[..4].copy_from_slice(&params.hd_private_key_id);
        let s = bs58::encode(payload).with_check().into_string();
        assert_eq!(
            ExtendedPublicKey::decode(&s, params),
            Err(KeyError::PrivateExtendedKey)
        );
    }

    #[test]
    fn other_network_rejected() {
        let master = master_from_scalar(&Scalar::from_bytes_mod_order([9u8; 32]));
        let params = ChainParams::for_network(NetworkId::Mainnet);
        assert_eq!(
            ExtendedPublicKey::decode(&master.encode(), params),
            Err(KeyError::WrongNetwork)
        );
    }
}
