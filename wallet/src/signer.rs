use async_trait::async_trait;
use common::{BridgeError, TransactionCall, TransactionSigner};
use ethers::utils::hex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::provider::WalletProvider;

/// Sends transactions through the wallet with `eth_sendTransaction`
pub struct ProviderSigner {
    provider: Arc<dyn WalletProvider>,
    address: String,
}

impl ProviderSigner {
    pub fn new(provider: Arc<dyn WalletProvider>, address: String) -> Self {
        Self { provider, address }
    }
}

/// JSON shape of a transaction for `eth_sendTransaction`
pub fn transaction_json(call: &TransactionCall) -> Value {
    json!({
        "from": call.from,
        "to": call.to,
        "data": format!("0x{}", hex::encode(&call.data)),
        "value": format!("{:#x}", call.value),
        "chainId": call.chain_id,
    })
}

#[async_trait]
impl TransactionSigner for ProviderSigner {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn send_transaction(&self, call: TransactionCall) -> common::Result<String> {
        debug!("Sending transaction to {} on chain {}", call.to, call.chain_id);
        self.provider
            .send_transaction(transaction_json(&call))
            .await
            .map_err(BridgeError::from)
    }
}
