//! Client request authentication.
//!
//! A client proves it owns a ticket by signing the raw request body with the
//! key behind the ticket's commitment address. The header value is
//! `base64(public key (32) ++ signature (64))`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use vsp_crypto::{verify_signature, Address};
use vsp_types::{ErrorCode, NetworkId, PublicKey, Signature};

use crate::ApiError;

pub const CLIENT_SIGNATURE_HEADER: &str = "VSP-Client-Signature";

const HEADER_LEN: usize = 32 + 64;

fn bad_signature(reason: &str) -> ApiError {
    tracing::debug!(reason, "rejected client signature");
    ApiError::new(ErrorCode::BadSignature)
}

/// Check that `header` signs `body` with the key of `commitment_address`.
pub fn verify_client_signature(
    header: &str,
    body: &[u8],
    commitment_address: &str,
    network: NetworkId,
) -> Result<(), ApiError> {
    if header.is_empty() {
        return Err(bad_signature("missing signature header"));
    }
    let bytes = STANDARD
        .decode(header.trim())
        .map_err(|_| bad_signature("header is not base64"))?;
    if bytes.len() != HEADER_LEN {
        return Err(bad_signature("header has the wrong length"));
    }
    let public = PublicKey::from_slice(&bytes[..32]).map_err(|_| bad_signature("public key"))?;
    let signature = Signature::from_slice(&bytes[32..]).map_err(|_| bad_signature("signature"))?;

    if Address::from_public_key(network, &public).encode() != commitment_address {
        return Err(bad_signature("key does not match commitment address"));
    }
    if !verify_signature(body, &signature, &public) {
        return Err(bad_signature("signature does not verify"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsp_nullables::{sign_with, TicketFixture, TEST_NETWORK};
    use vsp_crypto::keypair_from_seed;

    #[test]
    fn owner_signature_is_accepted() {
        let ticket = TicketFixture::new(1);
        let body = br#"{"tickethash":"00"}"#;
        let header = ticket.sign_request(body);
        let owner = ticket.commitment_address().encode();
        assert!(verify_client_signature(&header, body, &owner, TEST_NETWORK).is_ok());
    }

    #[test]
    fn other_keys_and_bodies_are_rejected() {
        let ticket = TicketFixture::new(1);
        let owner = ticket.commitment_address().encode();
        let body = br#"{"tickethash":"00"}"#;

        let stranger = sign_with(&keypair_from_seed(&[9u8; 32]), body);
        let err = verify_client_signature(&stranger, body, &owner, TEST_NETWORK).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadSignature);

        let header = ticket.sign_request(body);
        assert!(verify_client_signature(&header, b"{}", &owner, TEST_NETWORK).is_err());
        assert!(verify_client_signature("", body, &owner, TEST_NETWORK).is_err());
        assert!(verify_client_signature("!!", body, &owner, TEST_NETWORK).is_err());
    }
}
