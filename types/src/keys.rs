//! Ed25519 key and signature types.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::TypeError;

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

/// A 32-byte Ed25519 private key seed.
///
/// Not `Debug`, `Serialize` or `Clone`. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(pub [u8; 32]);

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

/// An Ed25519 key pair.
///
/// Built by `vsp_crypto::generate_keypair()` or `vsp_crypto::keypair_from_seed()`.
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TypeError::InvalidLength { expected: 32, actual: bytes.len() })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Signature {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| TypeError::InvalidLength { expected: 64, actual: bytes.len() })?;
        Ok(Self(arr))
    }

    /// Standard base64, the encoding used in signature headers.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(s: &str) -> Result<Self, TypeError> {
        let bytes = STANDARD
            .decode(s)
            .map_err(|e| TypeError::InvalidEncoding(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_base64() {
        let sig = Signature([7u8; 64]);
        let encoded = sig.to_base64();
        assert_eq!(Signature::from_base64(&encoded).unwrap(), sig);
        assert!(Signature::from_base64("AAAA").is_err());
    }

    #[test]
    fn public_key_wrong_length() {
        let err = PublicKey::from_slice(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, TypeError::InvalidLength { expected: 32, actual: 3 }));
    }
}
