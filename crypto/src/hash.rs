//! Blake2b hashing for transactions and public keys.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use vsp_types::TxHash;

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Hash multiple byte slices in sequence.
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// The 20-byte hash that addresses and scripts commit to.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let full = blake2b_256(data);
    let mut out = [0u8; 20];
    out.copy_from_slice(&full[..20]);
    out
}

/// Hash a serialized transaction prefix to produce its `TxHash`.
pub fn hash_transaction(prefix_bytes: &[u8]) -> TxHash {
    TxHash::new(blake2b_256(prefix_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_matches_concatenation() {
        let a = blake2b_256(b"helloworld");
        let b = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(a, b);
    }

    #[test]
    fn hash160_is_prefix() {
        let full = blake2b_256(b"key");
        assert_eq!(&hash160(b"key")[..], &full[..20]);
    }
}
