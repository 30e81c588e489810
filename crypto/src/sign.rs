//! Ed25519 message signing and verification.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use vsp_types::{PrivateKey, PublicKey, Signature};

/// Sign a message with a private key.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(message).to_bytes())
}

/// Verify a signature against a message and public key.
///
/// Uses strict verification, so small-order keys and malleated signatures fail.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify_strict(message, &dalek_sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    #[test]
    fn sign_and_verify() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let body = br#"{"timestamp":1}"#;
        let sig = sign_message(body, &kp.private);
        assert!(verify_signature(body, &sig, &kp.public));
    }

    #[test]
    fn tampered_body_fails() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let sig = sign_message(br#"{"a":1}"#, &kp.private);
        assert!(!verify_signature(br#"{"a":2}"#, &sig, &kp.public));
    }

    #[test]
    fn other_key_fails() {
        let a = keypair_from_seed(&[1u8; 32]);
        let b = keypair_from_seed(&[2u8; 32]);
        let sig = sign_message(b"msg", &a.private);
        assert!(!verify_signature(b"msg", &sig, &b.public));
    }
}
