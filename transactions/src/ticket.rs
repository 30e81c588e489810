//! Recognizing ticket purchase transactions.
//!
//! A ticket pays its stake to an `OP_SSTX`-tagged voting-rights output at
//! index 0 and commits the refund address in an `OP_RETURN` output at index 1.
//! Further outputs (change, additional commitments) are ignored.

use vsp_crypto::Address;
use vsp_types::{Amount, NetworkId, TicketHash};

use crate::script::{extract_commitment, extract_voting_rights_hash};
use crate::{MsgTx, TxError};

/// The parts of a ticket the service relies on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketInfo {
    pub hash: TicketHash,
    /// Address whose key may vote with this ticket.
    pub voting_address: Address,
    pub voting_script_version: u16,
    pub stake: Amount,
    /// Address whose key signs the owner's requests.
    pub commitment_address: Address,
}

pub fn parse_ticket(tx: &MsgTx, network: NetworkId) -> Result<TicketInfo, TxError> {
    if tx.outputs.len() < 2 {
        return Err(TxError::NotATicket("fewer than two outputs"));
    }
    let vote_out = &tx.outputs[0];
    let voting_hash = extract_voting_rights_hash(&vote_out.pk_script)
        .ok_or(TxError::NotATicket("output 0 is not a voting rights script"))?;
    let (commitment_hash, _) = extract_commitment(&tx.outputs[1].pk_script)
        .ok_or(TxError::NotATicket("output 1 is not a commitment"))?;

    Ok(TicketInfo {
        hash: tx.tx_hash(),
        voting_address: Address::from_pubkey_hash(network, voting_hash),
        voting_script_version: vote_out.script_version,
        stake: vote_out.amount(),
        commitment_address: Address::from_pubkey_hash(network, commitment_hash),
    })
}

pub fn is_ticket(tx: &MsgTx) -> bool {
    parse_ticket(tx, NetworkId::Mainnet).is_ok()
}
