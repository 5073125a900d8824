//! Wallet session management
//!
//! `SessionManager` owns the connected account and active chain for the
//! lifetime of the process. It is the only writer of that state: explicit
//! connect / disconnect calls and pushed wallet events all go through it.

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use common::{ChainDescriptor, TransactionSigner};

use crate::detect::detect_wallet_name;
use crate::error::{Result, WalletError};
use crate::network;
use crate::provider::{WalletEvent, WalletProvider};
use crate::signer::ProviderSigner;

/// Connected account and network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub address: String,
    /// Hex chain id as reported by the wallet
    pub chain_id: String,
    pub wallet_name: String,
}

/// What an applied wallet event changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    AccountChanged(String),
    ChainChanged(String),
    Disconnected,
    Unchanged,
}

pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    session: RwLock<Option<WalletSession>>,
}

impl SessionManager {
    /// `provider` is `None` when no wallet is available at all
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self { provider, session: RwLock::new(None) }
    }

    pub fn provider_detected(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> Result<&Arc<dyn WalletProvider>> {
        self.provider.as_ref().ok_or(WalletError::NoProvider)
    }

    /// Wallet name from the provider flags, when a provider is present
    pub fn wallet_name(&self) -> Option<&'static str> {
        self.provider.as_ref().map(|p| detect_wallet_name(&p.flags()))
    }

    /// Receiver for wallet events, `None` without a provider
    pub fn subscribe(&self) -> Option<broadcast::Receiver<WalletEvent>> {
        self.provider.as_ref().map(|p| p.subscribe())
    }

    /// Interactive connect (`eth_requestAccounts`)
    pub async fn connect(&self) -> Result<WalletSession> {
        let provider = self.provider()?;
        let wallet_name = detect_wallet_name(&provider.flags()).to_string();
        info!("Connecting to {}", wallet_name);

        let accounts = provider.request_accounts().await?;
        let address = first_account(&accounts).ok_or(WalletError::NoAccounts)?;
        let chain_id = provider.chain_id().await?;

        let session = WalletSession { address, chain_id, wallet_name };
        info!("Connected {} on chain {}", session.address, session.chain_id);
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    /// Silent reconnect (`eth_accounts`). `Ok(None)` when nothing is authorized.
    pub async fn check_existing_connection(&self) -> Result<Option<WalletSession>> {
        let Some(provider) = self.provider.as_ref() else {
            return Ok(None);
        };
        let accounts = provider.accounts().await?;
        let Some(address) = first_account(&accounts) else {
            debug!("No authorized wallet accounts");
            return Ok(None);
        };
        let chain_id = provider.chain_id().await?;
        let wallet_name = detect_wallet_name(&provider.flags()).to_string();

        let session = WalletSession { address, chain_id, wallet_name };
        info!("Restored wallet session for {}", session.address);
        *self.session.write().await = Some(session.clone());
        Ok(Some(session))
    }

    /// Forget the session. Wallets have no standard revoke call, so the
    /// authorization itself stays with the wallet.
    pub async fn disconnect(&self) {
        if self.session.write().await.take().is_some() {
            info!("Wallet disconnected");
        }
    }

    pub async fn current(&self) -> Option<WalletSession> {
        self.session.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Fold a pushed wallet event into the session
    pub async fn apply_event(&self, event: &WalletEvent) -> SessionChange {
        let mut guard = self.session.write().await;
        let Some(session) = guard.as_mut() else {
            debug!("Ignoring wallet event without a session: {:?}", event);
            return SessionChange::Unchanged;
        };

        match event {
            WalletEvent::AccountsChanged(accounts) => match first_account(accounts) {
                None => {
                    *guard = None;
                    info!("Wallet revoked all accounts");
                    SessionChange::Disconnected
                }
                Some(address) if !address.eq_ignore_ascii_case(&session.address) => {
                    info!("Wallet account changed to {}", address);
                    session.address = address.clone();
                    SessionChange::AccountChanged(address)
                }
                Some(_) => SessionChange::Unchanged,
            },
            WalletEvent::ChainChanged(chain_id) => {
                if chain_id.eq_ignore_ascii_case(&session.chain_id) {
                    SessionChange::Unchanged
                } else {
                    info!("Wallet chain changed to {}", chain_id);
                    session.chain_id = chain_id.clone();
                    SessionChange::ChainChanged(chain_id.clone())
                }
            }
            WalletEvent::Disconnect => {
                *guard = None;
                info!("Wallet provider disconnected");
                SessionChange::Disconnected
            }
        }
    }

    /// Make `descriptor` the wallet's active chain
    pub async fn switch_network(&self, descriptor: &ChainDescriptor) -> Result<()> {
        let provider = self.provider()?;
        network::switch_network(provider.as_ref(), descriptor).await?;
        if let Some(session) = self.session.write().await.as_mut() {
            session.chain_id = descriptor.chain_id.clone();
        }
        Ok(())
    }

    /// Signer bound to the connected account
    pub async fn signer(&self) -> Result<Arc<dyn TransactionSigner>> {
        let provider = Arc::clone(self.provider()?);
        let session = self.current().await.ok_or(WalletError::NotConnected)?;
        Ok(Arc::new(ProviderSigner::new(provider, session.address)))
    }
}

/// First well-formed account of a wallet account list
fn first_account(accounts: &[String]) -> Option<String> {
    let first = accounts.first()?;
    match Address::from_str(first) {
        Ok(_) => Some(first.clone()),
        Err(e) => {
            warn!("Wallet returned malformed account {}: {}", first, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_account() {
        let good = "0x1111111111111111111111111111111111111111".to_string();
        assert_eq!(first_account(&[good.clone()]), Some(good));
        assert_eq!(first_account(&[]), None);
        assert_eq!(first_account(&["nope".to_string()]), None);
    }

    #[tokio::test]
    async fn test_without_provider() {
        let manager = SessionManager::new(None);
        assert!(!manager.provider_detected());
        assert_eq!(manager.connect().await, Err(WalletError::NoProvider));
        assert_eq!(manager.check_existing_connection().await, Ok(None));
        assert!(manager.subscribe().is_none());
        assert!(manager.signer().await.is_err());
    }
}
