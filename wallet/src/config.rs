use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::detect::ProviderFlags;

/// Endpoint mặc định của Frame (ví desktop cung cấp EIP-1193 qua HTTP)
pub const DEFAULT_WALLET_RPC_URL: &str = "http://127.0.0.1:1248";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletProviderConfig {
    /// JSON-RPC endpoint of the wallet
    pub rpc_url: String,
    pub request_timeout_secs: u64,
    /// How often the watcher polls accounts and chain id
    pub event_poll_interval_ms: u64,
    pub flags: ProviderFlags,
}

impl Default for WalletProviderConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_WALLET_RPC_URL.to_string(),
            // eth_requestAccounts và eth_sendTransaction chờ người dùng xác nhận
            request_timeout_secs: 300,
            event_poll_interval_ms: 2_000,
            flags: ProviderFlags { is_frame: true, ..Default::default() },
        }
    }
}

impl WalletProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.event_poll_interval_ms.max(100))
    }
}
