//! Common bridge type definitions
//!
//! Quotes, token descriptors, transfer receipts and the attestation lookup
//! types shared by the SDK adapter, the attestation client and the
//! orchestrator.

use serde::{Serialize, Deserialize};
use std::fmt;

use super::chain::Chain;

/// Fee and timing estimate for a transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeQuote {
    /// Fee amount in the source chain's native currency
    pub fee: String,

    /// Fee currency symbol
    pub fee_currency: String,

    /// Estimated minutes until the transfer can complete
    pub estimated_minutes: u32,

    /// Human readable route description
    pub route: String,
}

impl BridgeQuote {
    pub fn new(fee: String, fee_currency: String, estimated_minutes: u32, route: String) -> Self {
        Self {
            fee,
            fee_currency,
            estimated_minutes,
            route,
        }
    }
}

impl fmt::Display for BridgeQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fee {} {}, ~{} min via {}",
            self.fee, self.fee_currency, self.estimated_minutes, self.route
        )
    }
}

/// Deployment of a token on one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDeployment {
    pub chain: Chain,
    pub address: String,
    pub decimals: u8,
}

/// A bridgeable token and where it lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub symbol: String,
    pub name: String,
    pub deployments: Vec<TokenDeployment>,
}

impl TokenDescriptor {
    pub fn on_chain(&self, chain: Chain) -> Option<&TokenDeployment> {
        self.deployments.iter().find(|d| d.chain == chain)
    }
}

/// Token entry as listed for one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedToken {
    pub symbol: String,
    pub name: String,
    pub address: String,
    pub decimals: u8,
}

/// USDC and USDT deployments on the supported chains
pub fn default_token_descriptors() -> Vec<TokenDescriptor> {
    let deploy = |chain, address: &str, decimals| TokenDeployment {
        chain,
        address: address.to_string(),
        decimals,
    };

    vec![
        TokenDescriptor {
            symbol: "USDC".to_string(),
            name: "USD Coin".to_string(),
            deployments: vec![
                deploy(Chain::Ethereum, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6),
                deploy(Chain::Polygon, "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359", 6),
                deploy(Chain::Bsc, "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d", 18),
                deploy(Chain::Arbitrum, "0xaf88d065e77c8cC2239327C5EDb3A432268e5831", 6),
                deploy(Chain::Avalanche, "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E", 6),
                deploy(Chain::Optimism, "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85", 6),
            ],
        },
        TokenDescriptor {
            symbol: "USDT".to_string(),
            name: "Tether USD".to_string(),
            deployments: vec![
                deploy(Chain::Ethereum, "0xdAC17F958D2ee523a2206206994597C13D831ec7", 6),
                deploy(Chain::Polygon, "0xc2132D05D31c914a87C6611C10748AEb04B58e8F", 6),
                deploy(Chain::Bsc, "0x55d398326f99059fF775485246999027B3197955", 18),
                deploy(Chain::Arbitrum, "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9", 6),
                deploy(Chain::Avalanche, "0x9702230A8Ea53601f5cD2dc00fDBc13d4dF4A8c7", 6),
                deploy(Chain::Optimism, "0x94b008aA00579c1307B0EF2c499aD98a8ce58e58", 6),
            ],
        },
    ]
}

/// Result of submitting a transfer on the source chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub tx_hash: String,
    /// Wormhole message sequence, decimal
    pub sequence: String,
    /// 32-byte hex emitter address, when known
    pub emitter: Option<String>,
}

/// Identifies a Wormhole message for attestation lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttestationKey {
    pub wormhole_chain_id: u16,
    pub tx_hash: String,
    pub sequence: String,
    pub emitter: Option<String>,
}

/// Outcome of a single attestation lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttestationLookup {
    /// Signed VAA, base64
    Available(String),
    /// Guardians have not signed the message yet
    NotYetAvailable,
}
