use thiserror::Error;

/// Errors crossing the bridge collaborator seams
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),
    #[error("Token {token} is not supported on {chain}")]
    UnsupportedToken { token: String, chain: String },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("{0}")]
    Wallet(String),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    #[error("Transaction {0} was dropped before confirmation")]
    TransactionDropped(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        // Giữ nguyên nếu lỗi gốc đã là BridgeError
        if let Some(bridge_err) = err.downcast_ref::<BridgeError>() {
            return bridge_err.clone();
        }
        BridgeError::Other(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Other(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anyhow_round_trip_keeps_variant() {
        let err = anyhow::Error::new(BridgeError::InvalidAmount("-1".into()));
        assert_eq!(BridgeError::from(err), BridgeError::InvalidAmount("-1".into()));

        let other = anyhow::anyhow!("boom");
        assert_eq!(BridgeError::from(other).to_string(), "boom");
    }

    #[test]
    fn test_wallet_messages_pass_through() {
        let err = BridgeError::Wallet("User rejected the request".into());
        assert_eq!(err.to_string(), "User rejected the request");
    }
}
