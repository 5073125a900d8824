//! EIP-1193 provider abstraction
//!
//! `WalletProvider` is the single `request(method, params)` entry point of an
//! EIP-1193 provider plus its event stream. The typed helpers on top of it
//! (`request_accounts`, `switch_chain`, ...) are default methods so every
//! transport gets them for free.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::detect::ProviderFlags;
use crate::error::{Result, WalletError};

/// Events a wallet pushes without being asked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// Account list changed; empty means the user disconnected every account
    AccountsChanged(Vec<String>),
    /// Active chain changed, hex chain id
    ChainChanged(String),
    /// Provider lost its connection
    Disconnect,
}

#[async_trait]
pub trait WalletProvider: Send + Sync + 'static {
    /// Raw EIP-1193 request
    async fn request(&self, method: &str, params: Value) -> Result<Value>;

    /// Identity flags used for wallet name detection
    fn flags(&self) -> ProviderFlags;

    /// New receiver for pushed wallet events
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;

    /// `eth_requestAccounts`: prompts the user when not yet authorized
    async fn request_accounts(&self) -> Result<Vec<String>> {
        let value = self.request("eth_requestAccounts", json!([])).await?;
        parse_accounts(value)
    }

    /// `eth_accounts`: silent, empty when not authorized
    async fn accounts(&self) -> Result<Vec<String>> {
        let value = self.request("eth_accounts", json!([])).await?;
        parse_accounts(value)
    }

    /// `eth_chainId`
    async fn chain_id(&self) -> Result<String> {
        let value = self.request("eth_chainId", json!([])).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::InvalidResponse(format!("eth_chainId returned {}", value)))
    }

    /// `wallet_switchEthereumChain`
    async fn switch_chain(&self, chain_id: &str) -> Result<()> {
        self.request("wallet_switchEthereumChain", json!([{ "chainId": chain_id }]))
            .await
            .map(|_| ())
    }

    /// `wallet_addEthereumChain`
    async fn add_chain(&self, params: Value) -> Result<()> {
        self.request("wallet_addEthereumChain", json!([params])).await.map(|_| ())
    }

    /// `eth_sendTransaction`, returns the transaction hash
    async fn send_transaction(&self, tx: Value) -> Result<String> {
        let value = self.request("eth_sendTransaction", json!([tx])).await?;
        value.as_str().map(str::to_string).ok_or_else(|| {
            WalletError::InvalidResponse(format!("eth_sendTransaction returned {}", value))
        })
    }
}

fn parse_accounts(value: Value) -> Result<Vec<String>> {
    serde_json::from_value(value)
        .map_err(|e| WalletError::InvalidResponse(format!("account list: {}", e)))
}
