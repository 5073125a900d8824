//! Bridge collaborator traits
//!
//! This module defines the seams the transfer orchestrator talks through: the
//! token-bridge SDK, the attestation lookup service, the wallet signer and the
//! progress callback the SDK reports milestones on.

use async_trait::async_trait;
use std::sync::Arc;

use super::chain::Chain;
use super::transaction::TransferRequest;
use super::types::{AttestationKey, AttestationLookup, BridgeQuote, SupportedToken, TransferReceipt};
use crate::error::Result;

/// Transaction prepared for the wallet to sign and broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCall {
    /// Hex chain id the transaction is meant for
    pub chain_id: String,
    pub from: String,
    pub to: String,
    pub data: Vec<u8>,
    /// Native value in wei
    pub value: u128,
}

/// Signs and broadcasts transactions on behalf of the connected account
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Address of the signing account
    fn address(&self) -> String;

    /// Send the transaction and return its hash
    async fn send_transaction(&self, call: TransactionCall) -> Result<String>;
}

/// Receives `(step, message)` milestones while a transfer is being submitted
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, step: u8, message: String);
}

/// Chain access for the Wormhole token bridge
#[async_trait]
pub trait BridgeSdk: Send + Sync + 'static {
    /// Balance of `token` held by `owner`, in whole-token units
    async fn get_token_balance(&self, chain: Chain, token: &str, owner: &str) -> Result<String>;

    /// Amount of `token` the token bridge may spend for `owner`, in whole-token units
    async fn check_token_allowance(&self, chain: Chain, token: &str, owner: &str) -> Result<String>;

    /// Tokens that can be bridged from `chain`
    fn get_supported_tokens(&self, chain: Chain) -> Vec<SupportedToken>;

    /// Fee and timing estimate for a transfer
    async fn get_bridge_quote(&self, request: &TransferRequest) -> Result<BridgeQuote>;

    /// Approve the token bridge to spend `amount` of `token`; returns the tx hash
    async fn approve_token(
        &self,
        signer: Arc<dyn TransactionSigner>,
        chain: Chain,
        token: &str,
        amount: &str,
    ) -> Result<String>;

    /// Wait until the transaction is mined successfully
    async fn wait_for_transaction(&self, chain: Chain, tx_hash: &str) -> Result<()>;

    /// Submit the transfer on the source chain and wait for its confirmation
    async fn initiate_transfer(
        &self,
        signer: Arc<dyn TransactionSigner>,
        request: &TransferRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<TransferReceipt>;

    /// Get provider name
    fn provider_name(&self) -> &str;
}

/// Lookup of signed VAAs
#[async_trait]
pub trait AttestationSource: Send + Sync + 'static {
    /// One lookup, no retries
    async fn fetch_attestation(&self, key: &AttestationKey) -> Result<AttestationLookup>;
}
