//! Wormhole Token Bridge qua ethers
//!
//! Đọc số dư / allowance / message fee bằng `eth_call` trên RPC công khai của
//! từng chain, còn các giao dịch ghi (approve, transferTokens) được ký bởi ví
//! người dùng qua `TransactionSigner`.

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::utils::{format_units, hex, parse_units};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use common::{
    BridgeError, BridgeQuote, BridgeSdk, Chain, ChainDescriptor, ChainRegistry, ProgressReporter,
    SupportedToken, TokenDeployment, TokenDescriptor, TransactionCall, TransactionSigner,
    TransferReceipt, TransferRequest,
};

use crate::sdk::abi;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(600);

pub struct WormholeTokenBridge {
    registry: Arc<ChainRegistry>,
    tokens: Vec<TokenDescriptor>,
    providers: RwLock<HashMap<Chain, Arc<Provider<Http>>>>,
    receipt_timeout: Duration,
}

impl WormholeTokenBridge {
    pub fn new(registry: Arc<ChainRegistry>, tokens: Vec<TokenDescriptor>) -> Self {
        Self {
            registry,
            tokens,
            providers: RwLock::new(HashMap::new()),
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    fn chain(&self, chain: Chain) -> common::Result<&ChainDescriptor> {
        self.registry
            .get(chain)
            .ok_or_else(|| BridgeError::UnsupportedChain(chain.to_string()))
    }

    fn deployment(&self, chain: Chain, symbol: &str) -> common::Result<&TokenDeployment> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .and_then(|t| t.on_chain(chain))
            .ok_or_else(|| BridgeError::UnsupportedToken {
                token: symbol.to_string(),
                chain: chain.to_string(),
            })
    }

    async fn provider(&self, chain: Chain) -> common::Result<Arc<Provider<Http>>> {
        if let Some(provider) = self.providers.read().await.get(&chain) {
            return Ok(Arc::clone(provider));
        }

        let descriptor = self.chain(chain)?;
        let provider = Provider::<Http>::try_from(descriptor.rpc_url.as_str()).map_err(|e| {
            BridgeError::Config(format!("Invalid RPC URL for {}: {}", descriptor.name, e))
        })?;
        let provider = Arc::new(provider.interval(RECEIPT_POLL_INTERVAL));
        debug!("Created RPC provider for {} at {}", descriptor.name, descriptor.rpc_url);

        self.providers.write().await.insert(chain, Arc::clone(&provider));
        Ok(provider)
    }

    async fn read_uint(&self, chain: Chain, to: Address, data: Vec<u8>) -> common::Result<U256> {
        let provider = self.provider(chain).await?;
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        let output = provider
            .call(&tx, None)
            .await
            .map_err(|e| BridgeError::Rpc(format!("eth_call on {} failed: {}", chain, e)))?;
        abi::decode_uint(&output)
            .ok_or_else(|| BridgeError::Rpc(format!("eth_call on {} returned {} bytes", chain, output.len())))
    }

    async fn wait_receipt(&self, chain: Chain, hash: H256) -> common::Result<TransactionReceipt> {
        let provider = self.provider(chain).await?;
        let pending = PendingTransaction::new(hash, provider.as_ref()).confirmations(1);

        let receipt = tokio::time::timeout(self.receipt_timeout, pending)
            .await
            .map_err(|_| {
                BridgeError::TransactionFailed(format!("timed out waiting for {:?} on {}", hash, chain))
            })?
            .map_err(|e| BridgeError::Rpc(e.to_string()))?
            .ok_or_else(|| BridgeError::TransactionDropped(format!("{:?}", hash)))?;

        if receipt.status == Some(U64::zero()) {
            warn!("Transaction {:?} reverted on {}", hash, chain);
            return Err(BridgeError::TransactionFailed(format!("transaction {:?} reverted", hash)));
        }
        Ok(receipt)
    }
}

fn parse_address(raw: &str) -> common::Result<Address> {
    Address::from_str(raw.trim()).map_err(|_| BridgeError::InvalidAddress(raw.to_string()))
}

fn parse_hash(raw: &str) -> common::Result<H256> {
    H256::from_str(raw.trim()).map_err(|_| BridgeError::Other(format!("Invalid transaction hash: {}", raw)))
}

fn to_base_units(amount: &str, decimals: u8) -> common::Result<U256> {
    parse_units(amount.trim(), u32::from(decimals))
        .map(Into::into)
        .map_err(|e| BridgeError::InvalidAmount(format!("{}: {}", amount, e)))
}

fn from_base_units(value: U256, decimals: u8) -> common::Result<String> {
    let formatted = format_units(value, u32::from(decimals))
        .map_err(|e| BridgeError::Other(format!("Cannot format {}: {}", value, e)))?;
    // "150.000000" -> "150"
    Ok(Decimal::from_str(&formatted)
        .map(|d| d.normalize().to_string())
        .unwrap_or(formatted))
}

fn value_as_wei(value: U256) -> common::Result<u128> {
    if value > U256::from(u128::MAX) {
        return Err(BridgeError::Other(format!("Native value {} does not fit in u128", value)));
    }
    Ok(value.as_u128())
}

#[async_trait]
impl BridgeSdk for WormholeTokenBridge {
    async fn get_token_balance(&self, chain: Chain, token: &str, owner: &str) -> common::Result<String> {
        let deployment = self.deployment(chain, token)?;
        let owner = parse_address(owner)?;
        let raw = self
            .read_uint(chain, parse_address(&deployment.address)?, abi::balance_of(owner))
            .await?;
        from_base_units(raw, deployment.decimals)
    }

    async fn check_token_allowance(&self, chain: Chain, token: &str, owner: &str) -> common::Result<String> {
        let descriptor = self.chain(chain)?;
        let deployment = self.deployment(chain, token)?;
        let data = abi::allowance(parse_address(owner)?, parse_address(&descriptor.token_bridge)?);
        let raw = self
            .read_uint(chain, parse_address(&deployment.address)?, data)
            .await?;
        from_base_units(raw, deployment.decimals)
    }

    fn get_supported_tokens(&self, chain: Chain) -> Vec<SupportedToken> {
        self.tokens
            .iter()
            .filter_map(|token| {
                token.on_chain(chain).map(|d| SupportedToken {
                    symbol: token.symbol.clone(),
                    name: token.name.clone(),
                    address: d.address.clone(),
                    decimals: d.decimals,
                })
            })
            .collect()
    }

    async fn get_bridge_quote(&self, request: &TransferRequest) -> common::Result<BridgeQuote> {
        let source = self.chain(request.source_chain)?;
        let target = self.chain(request.target_chain)?;
        self.deployment(request.source_chain, &request.token)?;

        let fee = self
            .read_uint(request.source_chain, parse_address(&source.core_bridge)?, abi::message_fee())
            .await?;

        Ok(BridgeQuote::new(
            from_base_units(fee, source.native_currency.decimals)?,
            source.native_currency.symbol.clone(),
            source.finality_minutes,
            format!("Wormhole Token Bridge: {} → {}", source.name, target.name),
        ))
    }

    async fn approve_token(
        &self,
        signer: Arc<dyn TransactionSigner>,
        chain: Chain,
        token: &str,
        amount: &str,
    ) -> common::Result<String> {
        let descriptor = self.chain(chain)?;
        let deployment = self.deployment(chain, token)?;
        let units = to_base_units(amount, deployment.decimals)?;

        info!("Approving {} {} for the token bridge on {}", amount, token, descriptor.name);
        signer
            .send_transaction(TransactionCall {
                chain_id: descriptor.chain_id.clone(),
                from: signer.address(),
                to: deployment.address.clone(),
                data: abi::approve(parse_address(&descriptor.token_bridge)?, units),
                value: 0,
            })
            .await
    }

    async fn wait_for_transaction(&self, chain: Chain, tx_hash: &str) -> common::Result<()> {
        self.wait_receipt(chain, parse_hash(tx_hash)?).await.map(|_| ())
    }

    async fn initiate_transfer(
        &self,
        signer: Arc<dyn TransactionSigner>,
        request: &TransferRequest,
        progress: &dyn ProgressReporter,
    ) -> common::Result<TransferReceipt> {
        let source = self.chain(request.source_chain)?;
        let target = self.chain(request.target_chain)?;
        let deployment = self.deployment(request.source_chain, &request.token)?;
        let units = to_base_units(&request.amount, deployment.decimals)?;
        let recipient = abi::address_to_bytes32(parse_address(&request.recipient)?);
        let token_bridge = parse_address(&source.token_bridge)?;
        let core_bridge = parse_address(&source.core_bridge)?;

        let fee = self
            .read_uint(request.source_chain, core_bridge, abi::message_fee())
            .await?;
        let data = abi::transfer_tokens(
            parse_address(&deployment.address)?,
            units,
            target.wormhole_chain_id,
            recipient,
            U256::zero(),
            rand::random::<u32>(),
        );

        progress
            .report(1, "Submitting transfer to the Wormhole token bridge...".to_string())
            .await;
        let tx_hash = signer
            .send_transaction(TransactionCall {
                chain_id: source.chain_id.clone(),
                from: signer.address(),
                to: source.token_bridge.clone(),
                data,
                value: value_as_wei(fee)?,
            })
            .await?;
        info!("Transfer submitted on {}: {}", source.name, tx_hash);

        progress
            .report(1, format!("Waiting for confirmation of {} on {}...", tx_hash, source.name))
            .await;
        let receipt = self.wait_receipt(request.source_chain, parse_hash(&tx_hash)?).await?;
        let sequence = abi::sequence_from_receipt(&receipt, core_bridge).ok_or_else(|| {
            BridgeError::TransactionFailed("no LogMessagePublished event in receipt".to_string())
        })?;

        Ok(TransferReceipt {
            tx_hash,
            sequence: sequence.to_string(),
            emitter: Some(hex::encode(abi::address_to_bytes32(token_bridge))),
        })
    }

    fn provider_name(&self) -> &str {
        "Wormhole"
    }
}
