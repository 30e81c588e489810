use proptest::prelude::*;

use vsp_types::{Amount, ErrorCode, Timestamp, TxHash};

proptest! {
    /// The display string of a hash always parses back to the same hash.
    #[test]
    fn tx_hash_display_parses(bytes in prop::array::uniform32(0u8..)) {
        let hash = TxHash::new(bytes);
        let parsed = TxHash::from_hex(&hash.to_string()).unwrap();
        prop_assert_eq!(parsed, hash);
    }

    /// TxHash survives the storage encoding unchanged.
    #[test]
    fn tx_hash_bincode(bytes in prop::array::uniform32(0u8..)) {
        let hash = TxHash::new(bytes);
        let encoded = bincode::serialize(&hash).unwrap();
        let decoded: TxHash = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, hash);
    }

    /// A fee percentage never exceeds the amount it is taken from.
    #[test]
    fn percentage_bounded(atoms in 0i64..2_100_000_000_000_000, pct in 0.0f64..100.0) {
        let amount = Amount::from_atoms(atoms);
        let fee = amount.percentage(pct);
        prop_assert!(fee.atoms() >= 0);
        prop_assert!(fee <= amount);
    }

    /// Deadlines: `is_before` is strict.
    #[test]
    fn deadline_is_strict(deadline in 0u64..u64::MAX / 2, delta in 0u64..1000) {
        let d = Timestamp::new(deadline);
        prop_assert!(!d.is_before(Timestamp::new(deadline)));
        prop_assert_eq!(d.is_before(Timestamp::new(deadline + delta)), delta > 0);
    }

    /// Every code below 18 maps to a code with the same number.
    #[test]
    fn error_codes_dense(n in 0u16..18) {
        prop_assert_eq!(ErrorCode::try_from(n).unwrap().code(), n);
    }
}
