//! Signing of API response bodies with the service key.

use serde::Serialize;

use vsp_crypto::{keypair_from_seed, sign_message};
use vsp_types::{KeyPair, PublicKey};

use crate::ApiError;

/// Header carrying the base64 signature of a response body.
pub const SERVER_SIGNATURE_HEADER: &str = "VSP-Server-Signature";

/// A response body and its signature, ready to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedResponse {
    pub body: String,
    pub signature: String,
}

/// Holds the process-wide Ed25519 key stored in the ledger.
pub struct ResponseSigner {
    keys: KeyPair,
}

impl ResponseSigner {
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            keys: keypair_from_seed(seed),
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.keys.public
    }

    /// Base64 signature over the exact bytes of `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        sign_message(body, &self.keys.private).to_base64()
    }

    pub fn sign_json<T: Serialize>(&self, value: &T) -> Result<SignedResponse, ApiError> {
        let body =
            serde_json::to_string(value).map_err(|e| ApiError::internal("encode response", e))?;
        let signature = self.sign(body.as_bytes());
        Ok(SignedResponse { body, signature })
    }

    /// Error bodies are signed like any other response.
    pub fn sign_error(&self, err: &ApiError) -> SignedResponse {
        let body = serde_json::to_string(&err.body()).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"message":"internal error"}}"#, err.code.code())
        });
        let signature = self.sign(body.as_bytes());
        SignedResponse { body, signature }
    }
}
