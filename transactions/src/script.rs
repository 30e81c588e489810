//! Script templates the service recognizes.

use vsp_crypto::Address;
use vsp_types::Amount;

pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_DATA_20: u8 = 0x14;
pub const OP_DATA_30: u8 = 0x1e;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_RETURN: u8 = 0x6a;
/// Tags the voting-rights output of a ticket purchase.
pub const OP_SSTX: u8 = 0xba;

/// Version of every script template below.
pub const DEFAULT_SCRIPT_VERSION: u16 = 0;

const P2PKH_LEN: usize = 25;
const COMMITMENT_LEN: usize = 32;

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn pay_to_pubkey_hash(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_LEN);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
    script.extend_from_slice(hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

/// `OP_SSTX` followed by the pay-to-pubkey-hash template.
pub fn voting_rights(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_LEN + 1);
    script.push(OP_SSTX);
    script.extend(pay_to_pubkey_hash(hash));
    script
}

/// `OP_RETURN <hash (20) ++ amount (8, LE) ++ fee limits (2)>`
pub fn commitment(hash: &[u8; 20], amount: Amount, fee_limits: u16) -> Vec<u8> {
    let mut script = Vec::with_capacity(COMMITMENT_LEN);
    script.extend_from_slice(&[OP_RETURN, OP_DATA_30]);
    script.extend_from_slice(hash);
    script.extend_from_slice(&amount.atoms().to_le_bytes());
    script.extend_from_slice(&fee_limits.to_le_bytes());
    script
}

/// Script version and script paying to `address`.
pub fn payment_script(address: &Address) -> (u16, Vec<u8>) {
    (
        DEFAULT_SCRIPT_VERSION,
        pay_to_pubkey_hash(address.pubkey_hash()),
    )
}

/// Script version and script granting voting rights to `address`.
pub fn voting_rights_script(address: &Address) -> (u16, Vec<u8>) {
    (DEFAULT_SCRIPT_VERSION, voting_rights(address.pubkey_hash()))
}

pub fn extract_pubkey_hash(script: &[u8]) -> Option<[u8; 20]> {
    if script.len() != P2PKH_LEN
        || script[..3] != [OP_DUP, OP_HASH160, OP_DATA_20]
        || script[23..] != [OP_EQUALVERIFY, OP_CHECKSIG]
    {
        return None;
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&script[3..23]);
    Some(hash)
}

pub fn extract_voting_rights_hash(script: &[u8]) -> Option<[u8; 20]> {
    match script.split_first() {
        Some((&OP_SSTX, rest)) => extract_pubkey_hash(rest),
        _ => None,
    }
}

/// Hash and amount committed to by a ticket commitment output.
pub fn extract_commitment(script: &[u8]) -> Option<([u8; 20], Amount)> {
    if script.len() != COMMITMENT_LEN || script[..2] != [OP_RETURN, OP_DATA_30] {
        return None;
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&script[2..22]);
    let mut amount = [0u8; 8];
    amount.copy_from_slice(&script[22..30]);
    // The top bit flags a script-hash commitment, which cannot sign requests.
    let raw = u64::from_le_bytes(amount);
    if raw & (1 << 63) != 0 {
        return None;
    }
    Some((hash, Amount::from_atoms(raw as i64)))
}
