//! API error codes and the shared parse error type.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from parsing or decoding the primitive types in this crate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}

/// Stable numeric error codes returned to API clients.
///
/// The numbers are part of the public interface and never change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    BadRequest = 0,
    InternalError = 1,
    VspClosed = 2,
    FeeAlreadyReceived = 3,
    InvalidFeeTx = 4,
    FeeTooSmall = 5,
    UnknownTicket = 6,
    TicketCannotVote = 7,
    FeeExpired = 8,
    InvalidVoteChoices = 9,
    BadSignature = 10,
    InvalidPrivKey = 11,
    FeeNotReceived = 12,
    InvalidTicket = 13,
    CannotBroadcastTicket = 14,
    CannotBroadcastFee = 15,
    CannotBroadcastFeeUnknownOutputs = 16,
    InvalidTimestamp = 17,
}

impl ErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Message sent when the handler does not supply a more specific one.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::BadRequest => "bad request",
            Self::InternalError => "internal error",
            Self::VspClosed => "vsp is closed",
            Self::FeeAlreadyReceived => "fee tx already received for ticket",
            Self::InvalidFeeTx => "invalid fee tx",
            Self::FeeTooSmall => "fee too small",
            Self::UnknownTicket => "unknown ticket",
            Self::TicketCannotVote => "ticket not eligible to vote",
            Self::FeeExpired => "fee has expired",
            Self::InvalidVoteChoices => "invalid vote choices",
            Self::BadSignature => "bad request signature",
            Self::InvalidPrivKey => "invalid private key",
            Self::FeeNotReceived => "no fee tx received for ticket",
            Self::InvalidTicket => "not a valid ticket tx",
            Self::CannotBroadcastTicket => "ticket transaction could not be broadcast",
            Self::CannotBroadcastFee => "fee transaction could not be broadcast",
            Self::CannotBroadcastFeeUnknownOutputs => {
                "fee transaction could not be broadcast due to unknown outputs"
            }
            Self::InvalidTimestamp => "old or reused timestamp",
        }
    }

    /// Whether the failure is the client's fault rather than the server's.
    pub fn is_client_error(self) -> bool {
        !matches!(self, Self::InternalError)
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> u16 {
        code.code()
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        use ErrorCode::*;
        const ALL: [ErrorCode; 18] = [
            BadRequest,
            InternalError,
            VspClosed,
            FeeAlreadyReceived,
            InvalidFeeTx,
            FeeTooSmall,
            UnknownTicket,
            TicketCannotVote,
            FeeExpired,
            InvalidVoteChoices,
            BadSignature,
            InvalidPrivKey,
            FeeNotReceived,
            InvalidTicket,
            CannotBroadcastTicket,
            CannotBroadcastFee,
            CannotBroadcastFeeUnknownOutputs,
            InvalidTimestamp,
        ];
        ALL.get(value as usize)
            .copied()
            .ok_or_else(|| format!("unknown error code {value}"))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::BadRequest.code(), 0);
        assert_eq!(ErrorCode::FeeAlreadyReceived.code(), 3);
        assert_eq!(ErrorCode::InvalidPrivKey.code(), 11);
        assert_eq!(ErrorCode::CannotBroadcastFeeUnknownOutputs.code(), 16);
        assert_eq!(ErrorCode::InvalidTimestamp.code(), 17);
    }

    #[test]
    fn numeric_conversion_matches_discriminant() {
        for n in 0u16..18 {
            let code = ErrorCode::try_from(n).unwrap();
            assert_eq!(code.code(), n);
        }
        assert!(ErrorCode::try_from(18).is_err());
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&ErrorCode::FeeTooSmall).unwrap();
        assert_eq!(json, "5");
    }
}
