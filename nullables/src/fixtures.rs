//! Deterministic keys and transactions for tests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use vsp_crypto::{keypair_from_seed, sign_message, Address, ExtendedPublicKey, KeyError, Wif};
use vsp_transactions::script::{commitment, pay_to_pubkey_hash, voting_rights};
use vsp_transactions::{MsgTx, OutPoint, TxIn, TxOut};
use vsp_types::{Amount, KeyPair, NetworkId, PrivateKey, TicketHash, TxHash};

/// Network every fixture uses unless told otherwise.
pub const TEST_NETWORK: NetworkId = NetworkId::Testnet;

/// Stake of every fixture ticket.
pub const TICKET_PRICE: i64 = 200 * 100_000_000;

fn seed(tag: u8, n: u8) -> [u8; 32] {
    let mut seed = [n; 32];
    seed[0] = tag;
    seed
}

fn input(hash: [u8; 32]) -> TxIn {
    TxIn {
        prev_out: OutPoint {
            hash: TxHash::new(hash),
            index: 0,
            tree: 0,
        },
        sequence: u32::MAX,
        value_in: 0,
        block_height: 0,
        block_index: 0,
        signature_script: vec![0x51],
    }
}

/// A ticket purchase with known voting and commitment keys.
pub struct TicketFixture {
    pub network: NetworkId,
    pub tx: MsgTx,
    voting_seed: [u8; 32],
    commitment_seed: [u8; 32],
}

impl TicketFixture {
    /// Ticket number `n`; different `n` give unrelated keys and hashes.
    pub fn new(n: u8) -> Self {
        Self::on_network(TEST_NETWORK, n)
    }

    pub fn on_network(network: NetworkId, n: u8) -> Self {
        let voting_seed = seed(0xa0, n);
        let commitment_seed = seed(0xc0, n);
        let voting = Address::from_public_key(network, &keypair_from_seed(&voting_seed).public);
        let owner = Address::from_public_key(network, &keypair_from_seed(&commitment_seed).public);

        let mut tx = MsgTx::new(1);
        tx.inputs.push(input(seed(0x10, n)));
        tx.outputs.push(TxOut {
            value: TICKET_PRICE,
            script_version: 0,
            pk_script: voting_rights(voting.pubkey_hash()),
        });
        tx.outputs.push(TxOut {
            value: 0,
            script_version: 0,
            pk_script: commitment(owner.pubkey_hash(), Amount::from_atoms(TICKET_PRICE), 0x5800),
        });
        Self {
            network,
            tx,
            voting_seed,
            commitment_seed,
        }
    }

    pub fn hash(&self) -> TicketHash {
        self.tx.tx_hash()
    }

    pub fn hex(&self) -> String {
        self.tx.to_hex()
    }

    pub fn voting_wif(&self) -> String {
        Wif::new(self.network, PrivateKey(self.voting_seed)).encode()
    }

    pub fn commitment_key(&self) -> KeyPair {
        keypair_from_seed(&self.commitment_seed)
    }

    pub fn commitment_address(&self) -> Address {
        Address::from_public_key(self.network, &self.commitment_key().public)
    }

    /// Value of the client signature header for `body`.
    pub fn sign_request(&self, body: &[u8]) -> String {
        sign_with(&self.commitment_key(), body)
    }
}

/// `base64(public key ++ signature)` over `body`.
pub fn sign_with(key: &KeyPair, body: &[u8]) -> String {
    let signature = sign_message(body, &key.private);
    let mut bytes = Vec::with_capacity(96);
    bytes.extend_from_slice(key.public.as_bytes());
    bytes.extend_from_slice(signature.as_bytes());
    STANDARD.encode(bytes)
}

/// A transaction paying `amount` to `address`, plus change elsewhere.
pub fn fee_tx(address: &Address, amount: Amount, n: u8) -> MsgTx {
    let mut tx = MsgTx::new(1);
    tx.inputs.push(input(seed(0xf0, n)));
    tx.outputs.push(TxOut {
        value: 12_345,
        script_version: 0,
        pk_script: pay_to_pubkey_hash(&[0xee; 20]),
    });
    tx.outputs.push(TxOut {
        value: amount.atoms(),
        script_version: 0,
        pk_script: pay_to_pubkey_hash(address.pubkey_hash()),
    });
    tx
}

/// A fee extended public key for `network`.
pub fn fee_xpub(network: NetworkId) -> Result<ExtendedPublicKey, KeyError> {
    let key = keypair_from_seed(&seed(0xfe, 1)).public;
    ExtendedPublicKey::new_master(network, [7u8; 32], key)
}
