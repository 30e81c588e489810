use thiserror::Error;

/// Failure of a call to the chain daemon or a voting wallet.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    Timeout,

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// A broadcast transaction spends outputs the daemon does not know, or
    /// that are already spent.
    #[error("transaction references unknown or spent outputs: {0}")]
    UnknownOutputs(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Daemon code for a transaction or block that is not known.
const CODE_NO_TX_INFO: i64 = -5;

const UNKNOWN_OUTPUTS_MSG: &str = "references outputs of unknown or fully-spent transaction";

impl RpcError {
    /// Classify an error object returned by the remote end.
    pub fn from_remote(code: i64, message: String) -> Self {
        if message.contains(UNKNOWN_OUTPUTS_MSG) {
            Self::UnknownOutputs(message)
        } else if code == CODE_NO_TX_INFO {
            Self::NotFound(message)
        } else {
            Self::Rpc { code, message }
        }
    }

    /// The endpoint could not be used at all this cycle.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout)
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Unreachable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
