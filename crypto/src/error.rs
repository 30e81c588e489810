use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid base58check encoding: {0}")]
    Encoding(String),

    #[error("invalid length: expected {expected}, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("key is for the wrong network")]
    WrongNetwork,

    #[error("unsupported signature type {0}")]
    UnsupportedSigType(u8),

    #[error("extended key is private, expected a public key")]
    PrivateExtendedKey,

    #[error("not a valid curve point")]
    InvalidPoint,

    #[error("hardened derivation requires the private key")]
    HardenedDerivation,

    #[error("derived key is invalid, skip to the next index")]
    InvalidChild,

    #[error("random source unavailable: {0}")]
    Entropy(String),
}
