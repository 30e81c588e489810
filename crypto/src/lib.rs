//! Cryptographic primitives for the voting service provider.
//!
//! - **Ed25519** for response signatures, client request signatures and voting keys
//! - **Blake2b** for transaction hashes and 20-byte public key hashes
//! - **base58check** encodings for addresses, WIF private keys and extended public keys
//! - Public child-key derivation for per-ticket fee addresses

pub mod address;
pub mod error;
pub mod hash;
pub mod hdkey;
pub mod keys;
pub mod sign;
pub mod wif;

pub use address::Address;
pub use error::KeyError;
pub use hash::{blake2b_256, blake2b_256_multi, hash160, hash_transaction};
pub use hdkey::ExtendedPublicKey;
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
pub use wif::Wif;
