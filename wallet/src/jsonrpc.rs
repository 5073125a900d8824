//! EIP-1193 provider over HTTP JSON-RPC
//!
//! Desktop wallets such as Frame expose the same request interface a browser
//! extension injects, on a local HTTP port. HTTP has no push channel, so a
//! background watcher polls `eth_accounts` / `eth_chainId` and turns changes
//! into `WalletEvent`s.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::WalletProviderConfig;
use crate::detect::ProviderFlags;
use crate::error::{Result, WalletError};
use crate::provider::{WalletEvent, WalletProvider};

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

pub struct JsonRpcWalletProvider {
    client: Client,
    url: Url,
    next_id: AtomicU64,
    flags: ProviderFlags,
    events: broadcast::Sender<WalletEvent>,
}

impl JsonRpcWalletProvider {
    pub fn new(config: &WalletProviderConfig) -> Result<Self> {
        let url = Url::parse(&config.rpc_url).map_err(|e| {
            WalletError::Transport(format!("Invalid wallet RPC URL {}: {}", config.rpc_url, e))
        })?;
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        info!("Using JSON-RPC wallet provider at {}", url);
        Ok(Self {
            client,
            url,
            next_id: AtomicU64::new(1),
            flags: config.flags,
            events,
        })
    }

    /// Start polling the wallet for account and chain changes
    pub fn spawn_watcher(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let provider = Arc::clone(self);
        tokio::spawn(async move { provider.watch(period).await })
    }

    async fn watch(&self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        let mut last_accounts: Option<Vec<String>> = None;
        let mut last_chain: Option<String> = None;
        let mut reachable = true;

        loop {
            ticker.tick().await;
            let polled = match self.accounts().await {
                Ok(accounts) => self.chain_id().await.map(|chain| (accounts, chain)),
                Err(e) => Err(e),
            };

            match polled {
                Ok((accounts, chain)) => {
                    reachable = true;
                    if last_accounts.as_ref().map_or(false, |prev| *prev != accounts) {
                        debug!("Wallet accounts changed: {:?}", accounts);
                        let _ = self.events.send(WalletEvent::AccountsChanged(accounts.clone()));
                    }
                    if last_chain.as_ref().map_or(false, |prev| *prev != chain) {
                        debug!("Wallet chain changed: {}", chain);
                        let _ = self.events.send(WalletEvent::ChainChanged(chain.clone()));
                    }
                    last_accounts = Some(accounts);
                    last_chain = Some(chain);
                }
                Err(e) => {
                    if reachable {
                        warn!("Wallet at {} became unreachable: {}", self.url, e);
                        let _ = self.events.send(WalletEvent::Disconnect);
                        reachable = false;
                        last_accounts = None;
                        last_chain = None;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest { jsonrpc: "2.0", id, method, params };

        debug!("Wallet request #{} {}", id, method);
        let response = self.client.post(self.url.clone()).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(WalletError::Transport(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let response: RpcResponse = response.json().await?;
        if let Some(error) = response.error {
            return Err(WalletError::Rejected { code: error.code, message: error.message });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    fn flags(&self) -> ProviderFlags {
        self.flags
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        let config = WalletProviderConfig { rpc_url: "not a url".into(), ..Default::default() };
        assert!(matches!(JsonRpcWalletProvider::new(&config), Err(WalletError::Transport(_))));
    }

    #[test]
    fn test_error_object_parsing() {
        let raw = r#"{"jsonrpc":"2.0","id":3,"error":{"code":4001,"message":"User rejected the request."}}"#;
        let parsed: RpcResponse = serde_json::from_str(raw).unwrap();
        let error = parsed.error.unwrap();
        assert_eq!(error.code, 4001);
        assert_eq!(error.message, "User rejected the request.");
        assert!(parsed.result.is_none());
    }

    #[tokio::test]
    async fn test_new_provider_exposes_flags_and_events() {
        let provider = JsonRpcWalletProvider::new(&WalletProviderConfig::default()).unwrap();
        assert!(provider.flags().is_frame);
        let mut rx = provider.subscribe();
        provider.events.send(WalletEvent::ChainChanged("0x89".into())).unwrap();
        assert_eq!(rx.recv().await.unwrap(), WalletEvent::ChainChanged("0x89".into()));
    }
}
