//! Chain enum and chain registry
//!
//! This module defines the `Chain` enum for the EVM networks reachable through
//! the Wormhole Token Bridge, the static `ChainDescriptor` for each of them and
//! the `ChainRegistry` used to look chains up by name or by the hex chain id a
//! wallet reports.

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use serde_json::{json, Value};

/// Supported blockchain networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Ethereum mainnet
    Ethereum,
    /// Polygon PoS
    Polygon,
    /// BNB Smart Chain
    Bsc,
    /// Arbitrum One
    Arbitrum,
    /// Avalanche C-Chain
    Avalanche,
    /// OP Mainnet
    Optimism,
}

impl Chain {
    /// Convert to Wormhole chain ID
    pub fn to_wormhole_id(&self) -> u16 {
        match self {
            Chain::Ethereum => 2,
            Chain::Bsc => 4,
            Chain::Polygon => 5,
            Chain::Avalanche => 6,
            Chain::Arbitrum => 23,
            Chain::Optimism => 24,
        }
    }

    /// Convert from Wormhole chain ID to Chain
    pub fn from_wormhole_id(id: u16) -> Option<Self> {
        match id {
            2 => Some(Chain::Ethereum),
            4 => Some(Chain::Bsc),
            5 => Some(Chain::Polygon),
            6 => Some(Chain::Avalanche),
            23 => Some(Chain::Arbitrum),
            24 => Some(Chain::Optimism),
            _ => None,
        }
    }

    /// Get string representation of the chain
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Polygon => "polygon",
            Chain::Bsc => "bsc",
            Chain::Arbitrum => "arbitrum",
            Chain::Avalanche => "avalanche",
            Chain::Optimism => "optimism",
        }
    }

    /// Get a list of all supported chains, in display order
    pub fn supported_chains() -> Vec<Self> {
        vec![
            Self::Ethereum,
            Self::Polygon,
            Self::Bsc,
            Self::Arbitrum,
            Self::Avalanche,
            Self::Optimism,
        ]
    }

    /// Built-in descriptor for this chain
    pub fn descriptor(&self) -> ChainDescriptor {
        match self {
            Chain::Ethereum => ChainDescriptor::new(
                *self, "Ethereum", "⟠", "0x1", "https://eth.llamarpc.com",
                "https://etherscan.io", NativeCurrency::new("Ether", "ETH"),
                "0x98f3c9e6E3fAce36bAAd05FE09d375Ef1464288B",
                "0x3ee18B2214AFF97000D974cf647E7C347E8fa585", 19,
            ),
            Chain::Polygon => ChainDescriptor::new(
                *self, "Polygon", "⬟", "0x89", "https://polygon.llamarpc.com",
                "https://polygonscan.com", NativeCurrency::new("MATIC", "MATIC"),
                "0x7A4B5a56256163F07b2C80A7cA55aBE66c4ec4d7",
                "0x5a58505a96D1dbf8dF91cB21B54419FC36e93fdE", 2,
            ),
            Chain::Bsc => ChainDescriptor::new(
                *self, "BSC", "🟡", "0x38", "https://bsc.llamarpc.com",
                "https://bscscan.com", NativeCurrency::new("BNB", "BNB"),
                "0x98f3c9e6E3fAce36bAAd05FE09d375Ef1464288B",
                "0xB6F6D86a8f9879A9c87f643768d9efc38c1Da6E7", 1,
            ),
            Chain::Arbitrum => ChainDescriptor::new(
                *self, "Arbitrum", "🔷", "0xA4B1", "https://arb1.arbitrum.io/rpc",
                "https://arbiscan.io", NativeCurrency::new("Ether", "ETH"),
                "0xa5f208e072434bC67592E4C49C1B991BA79BCA46",
                "0x0b2402144Bb366A632D14B83F244D2e0e21bD39c", 19,
            ),
            Chain::Avalanche => ChainDescriptor::new(
                *self, "Avalanche", "🔺", "0xA86A", "https://api.avax.network/ext/bc/C/rpc",
                "https://snowtrace.io", NativeCurrency::new("Avalanche", "AVAX"),
                "0x54a8e5f9c4CbA08F9943965859F6c34eAF03E26c",
                "0x0e082F06FF657D94310cB8cE8B0D9a04541d8052", 1,
            ),
            Chain::Optimism => ChainDescriptor::new(
                *self, "Optimism", "🔴", "0xA", "https://mainnet.optimism.io",
                "https://optimistic.etherscan.io", NativeCurrency::new("Ether", "ETH"),
                "0xEe91C335eab126dF5fDB3797EA9d6aD93aeC9722",
                "0x1D68124e65faFC907325e3EDbF8c4d84499DAa8b", 19,
            ),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethereum" | "eth" => Ok(Self::Ethereum),
            "polygon" | "matic" => Ok(Self::Polygon),
            "bsc" | "bnb" => Ok(Self::Bsc),
            "arbitrum" => Ok(Self::Arbitrum),
            "avalanche" | "avax" => Ok(Self::Avalanche),
            "optimism" => Ok(Self::Optimism),
            _ => Err(format!("Unknown chain: {}", s)),
        }
    }
}

/// Native currency of a chain (always 18 decimals on the supported networks)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals: 18,
        }
    }
}

/// Static configuration of one supported chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    pub chain: Chain,
    pub name: String,
    pub icon: String,
    /// Hex chain id as wallets report it, e.g. `0x89`
    pub chain_id: String,
    pub rpc_url: String,
    pub explorer_url: String,
    pub native_currency: NativeCurrency,
    pub wormhole_chain_id: u16,
    /// Wormhole core contract, emits `LogMessagePublished`
    pub core_bridge: String,
    /// Wormhole token bridge contract, spender for approvals and message emitter
    pub token_bridge: String,
    /// Rough time until guardians observe a finalized transfer
    pub finality_minutes: u32,
}

impl ChainDescriptor {
    #[allow(clippy::too_many_arguments)]
    fn new(
        chain: Chain,
        name: &str,
        icon: &str,
        chain_id: &str,
        rpc_url: &str,
        explorer_url: &str,
        native_currency: NativeCurrency,
        core_bridge: &str,
        token_bridge: &str,
        finality_minutes: u32,
    ) -> Self {
        Self {
            chain,
            name: name.to_string(),
            icon: icon.to_string(),
            chain_id: chain_id.to_string(),
            rpc_url: rpc_url.to_string(),
            explorer_url: explorer_url.to_string(),
            native_currency,
            wormhole_chain_id: chain.to_wormhole_id(),
            core_bridge: core_bridge.to_string(),
            token_bridge: token_bridge.to_string(),
            finality_minutes,
        }
    }

    /// Numeric EIP-155 chain id
    pub fn numeric_chain_id(&self) -> Option<u64> {
        parse_chain_id(&self.chain_id)
    }

    /// Compare against a chain id reported by a wallet.
    ///
    /// Wallets are inconsistent about hex casing (`0xa4b1` vs `0xA4B1`), so the
    /// comparison is numeric.
    pub fn matches_chain_id(&self, reported: &str) -> bool {
        match (self.numeric_chain_id(), parse_chain_id(reported)) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => false,
        }
    }

    /// Block explorer link for a transaction on this chain
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }

    /// Parameters for `wallet_addEthereumChain`
    pub fn add_chain_params(&self) -> Value {
        json!({
            "chainId": self.chain_id,
            "chainName": self.name,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
            "rpcUrls": [self.rpc_url],
            "blockExplorerUrls": [self.explorer_url],
        })
    }
}

/// Parse a `0x`-prefixed hex or plain decimal chain id
pub fn parse_chain_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

/// Lookup table over the configured chains
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainDescriptor>) -> Self {
        Self { chains }
    }

    /// Registry with the built-in descriptors of every supported chain
    pub fn defaults() -> Self {
        Self::new(Chain::supported_chains().iter().map(Chain::descriptor).collect())
    }

    pub fn get(&self, chain: Chain) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|d| d.chain == chain)
    }

    /// Find the chain a wallet is currently connected to
    pub fn by_chain_id(&self, reported: &str) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|d| d.matches_chain_id(reported))
    }

    pub fn all(&self) -> &[ChainDescriptor] {
        &self.chains
    }

    /// Target options for a given source: every configured chain except the source itself
    pub fn targets_for(&self, source: Chain) -> Vec<Chain> {
        self.chains
            .iter()
            .map(|d| d.chain)
            .filter(|c| *c != source)
            .collect()
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}
