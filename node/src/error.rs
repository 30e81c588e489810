use thiserror::Error;

use vsp_types::api::ApiErrorBody;
use vsp_types::ErrorCode;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] vsp_store::StoreError),

    #[error("database error: {0}")]
    Lmdb(#[from] vsp_store_lmdb::LmdbError),

    #[error("rpc error: {0}")]
    Rpc(#[from] vsp_network::RpcError),

    #[error("key error: {0}")]
    Key(#[from] vsp_crypto::KeyError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shutdown timeout")]
    ShutdownTimeout,
}

/// A rejection returned to an API client.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message} (code {})", code.code())]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    /// An error carrying the code's stock message.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Infrastructure failure. Details go to the log, never to the client.
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::new(ErrorCode::InternalError)
    }

    pub fn body(&self) -> ApiErrorBody {
        ApiErrorBody {
            code: self.code,
            message: self.message.clone(),
        }
    }
}

impl From<ErrorCode> for ApiError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_and_custom_messages() {
        let err = ApiError::new(ErrorCode::FeeTooSmall);
        assert_eq!(err.message, "fee too small");
        let err = ApiError::with_message(ErrorCode::InvalidFeeTx, "no outputs");
        assert_eq!(err.body().message, "no outputs");
        assert_eq!(err.to_string(), "no outputs (code 4)");
    }
}
