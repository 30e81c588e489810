//! Context-free transaction sanity checks.
//!
//! These are the structural checks any node applies before looking at the
//! chain. They do not look up inputs or verify signatures.

use std::collections::HashSet;

use vsp_types::amount::MAX_AMOUNT;
use vsp_types::ChainParams;

use crate::{MsgTx, TxError};

pub fn check_transaction_sanity(tx: &MsgTx, params: &ChainParams) -> Result<(), TxError> {
    if tx.inputs.is_empty() {
        return Err(TxError::NoInputs);
    }
    if tx.outputs.is_empty() {
        return Err(TxError::NoOutputs);
    }

    let size = tx.serialize_size();
    if size > params.max_tx_size {
        return Err(TxError::TooBig {
            size,
            max: params.max_tx_size,
        });
    }

    let mut total: i64 = 0;
    for (index, output) in tx.outputs.iter().enumerate() {
        if output.value < 0 || output.value > MAX_AMOUNT {
            return Err(TxError::InvalidOutputValue {
                index,
                value: output.value,
            });
        }
        total = total
            .checked_add(output.value)
            .filter(|t| *t <= MAX_AMOUNT)
            .ok_or(TxError::TotalTooLarge(total.saturating_add(output.value)))?;
    }

    let mut seen = HashSet::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        if !seen.insert(input.prev_out) {
            return Err(TxError::DuplicateInput);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OutPoint, TxIn, TxOut};
    use vsp_types::{NetworkId, TxHash};

    fn params() -> &'static ChainParams {
        ChainParams::for_network(NetworkId::Simnet)
    }

    fn input(n: u8) -> TxIn {
        TxIn {
            prev_out: OutPoint {
                hash: TxHash::new([n; 32]),
                index: 0,
                tree: 0,
            },
            sequence: u32::MAX,
            value_in: 0,
            block_height: 0,
            block_index: 0,
            signature_script: vec![],
        }
    }

    fn output(value: i64) -> TxOut {
        TxOut {
            value,
            script_version: 0,
            pk_script: vec![0x6a],
        }
    }

    fn tx(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> MsgTx {
        let mut tx = MsgTx::new(1);
        tx.inputs = inputs;
        tx.outputs = outputs;
        tx
    }

    #[test]
    fn accepts_plain_tx() {
        assert_eq!(
            check_transaction_sanity(&tx(vec![input(1)], vec![output(10)]), params()),
            Ok(())
        );
    }

    #[test]
    fn rejects_empty_sides() {
        assert_eq!(
            check_transaction_sanity(&tx(vec![], vec![output(10)]), params()),
            Err(TxError::NoInputs)
        );
        assert_eq!(
            check_transaction_sanity(&tx(vec![input(1)], vec![]), params()),
            Err(TxError::NoOutputs)
        );
    }

    #[test]
    fn rejects_negative_and_oversized_values() {
        assert!(matches!(
            check_transaction_sanity(&tx(vec![input(1)], vec![output(-1)]), params()),
            Err(TxError::InvalidOutputValue { index: 0, .. })
        ));
        let half = MAX_AMOUNT / 2 + 1;
        assert!(matches!(
            check_transaction_sanity(&tx(vec![input(1)], vec![output(half), output(half)]), params()),
            Err(TxError::TotalTooLarge(_))
        ));
    }

    #[test]
    fn rejects_duplicate_inputs() {
        assert_eq!(
            check_transaction_sanity(&tx(vec![input(1), input(1)], vec![output(1)]), params()),
            Err(TxError::DuplicateInput)
        );
    }

    #[test]
    fn rejects_oversized_tx() {
        let mut big = output(1);
        big.pk_script = vec![0u8; params().max_tx_size];
        assert!(matches!(
            check_transaction_sanity(&tx(vec![input(1)], vec![big]), params()),
            Err(TxError::TooBig { .. })
        ));
    }
}
