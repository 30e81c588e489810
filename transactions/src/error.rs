use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TxError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("unexpected end of data reading {0}")]
    UnexpectedEof(&'static str),

    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),

    #[error("unsupported serialization type {0}")]
    UnsupportedSerType(u16),

    #[error("count {count} for {what} exceeds remaining data")]
    TooManyItems { what: &'static str, count: u64 },

    #[error("witness has {witness} inputs but prefix has {prefix}")]
    WitnessMismatch { prefix: usize, witness: usize },

    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("serialized transaction is too big: {size} > {max}")]
    TooBig { size: usize, max: usize },

    #[error("output {index} has invalid value {value}")]
    InvalidOutputValue { index: usize, value: i64 },

    #[error("total output value {0} exceeds the maximum")]
    TotalTooLarge(i64),

    #[error("transaction spends the same outpoint twice")]
    DuplicateInput,

    #[error("not a ticket: {0}")]
    NotATicket(&'static str),
}
