use common::BridgeError;
use thiserror::Error;

/// User rejected the request
pub const USER_REJECTED: i64 = 4001;
/// Chain has not been added to the wallet
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// Another request of the same kind is already waiting in the wallet
pub const REQUEST_PENDING: i64 = -32002;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Web3 wallet not found! Please install MetaMask, Coinbase Wallet, or another Web3 wallet extension.")]
    NoProvider,
    #[error("{message}")]
    Rejected { code: i64, message: String },
    #[error("Wallet returned no accounts")]
    NoAccounts,
    #[error("Wallet is not connected")]
    NotConnected,
    #[error("Failed to add {0} network to your wallet")]
    AddChainFailed(String),
    #[error("Failed to switch network")]
    SwitchFailed,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid wallet response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, WalletError>;

impl WalletError {
    /// EIP-1193 / JSON-RPC error code, if the wallet returned one
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code() == Some(USER_REJECTED)
    }

    /// Message shown when a connection attempt fails
    pub fn connect_message(&self) -> String {
        match self {
            Self::NoProvider => self.to_string(),
            Self::Rejected { code: USER_REJECTED, .. } => {
                "Connection rejected. Please try again and approve the connection.".to_string()
            }
            Self::Rejected { code: REQUEST_PENDING, .. } => {
                "Connection request pending. Please check your wallet.".to_string()
            }
            other => format!("Failed to connect wallet: {}", other),
        }
    }
}

impl From<anyhow::Error> for WalletError {
    fn from(err: anyhow::Error) -> Self {
        // Cố gắng chuyển đổi nếu là WalletError
        if let Some(wallet_err) = err.downcast_ref::<WalletError>() {
            return wallet_err.clone();
        }
        WalletError::Transport(format!("{:#}", err))
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        WalletError::Transport(err.to_string())
    }
}

impl From<WalletError> for BridgeError {
    fn from(err: WalletError) -> Self {
        BridgeError::Wallet(err.to_string())
    }
}
