//! Server errors and the HTTP status of each API error code.

use axum::http::StatusCode;
use thiserror::Error;

use vsp_types::ErrorCode;

#[derive(Debug, Error)]
pub enum RpcServerError {
    #[error("invalid listen address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InternalError
        | ErrorCode::CannotBroadcastTicket
        | ErrorCode::CannotBroadcastFee => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::CannotBroadcastFeeUnknownOutputs => StatusCode::PRECONDITION_FAILED,
        ErrorCode::BadSignature => StatusCode::UNAUTHORIZED,
        ErrorCode::BadRequest
        | ErrorCode::VspClosed
        | ErrorCode::FeeAlreadyReceived
        | ErrorCode::InvalidFeeTx
        | ErrorCode::FeeTooSmall
        | ErrorCode::UnknownTicket
        | ErrorCode::TicketCannotVote
        | ErrorCode::FeeExpired
        | ErrorCode::InvalidVoteChoices
        | ErrorCode::InvalidPrivKey
        | ErrorCode::FeeNotReceived
        | ErrorCode::InvalidTicket
        | ErrorCode::InvalidTimestamp => StatusCode::BAD_REQUEST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_mistakes_are_4xx() {
        assert_eq!(status_for(ErrorCode::FeeTooSmall), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorCode::BadSignature), StatusCode::UNAUTHORIZED);
        assert!(status_for(ErrorCode::CannotBroadcastFeeUnknownOutputs).is_client_error());
        assert!(status_for(ErrorCode::InternalError).is_server_error());
    }
}
