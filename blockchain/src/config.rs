/// Configuration module for the Wormhole bridge
///
/// This module defines the YAML configuration of the bridge CLI: wallet
/// endpoint, attestation service, quote debounce, settlement policy, and the
/// chain and token tables.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use common::{default_token_descriptors, Chain, ChainDescriptor, ChainRegistry, TokenDescriptor};
use wallet::WalletProviderConfig;

use crate::processor::bridge_orchestrator::{OrchestratorSettings, SettlementPolicy};
use crate::processor::wormhole::DEFAULT_WORMHOLESCAN_API_URL;

pub const DEFAULT_CONFIG_PATH: &str = "config/bridge_config.yaml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub general: GeneralConfig,
    pub wallet: WalletProviderConfig,
    pub attestation: AttestationConfig,
    pub quote: QuoteConfig,
    pub transfer: TransferConfig,
    /// Empty means the built-in chain table
    pub chains: Vec<ChainDescriptor>,
    /// Empty means the built-in USDC / USDT table
    pub tokens: Vec<TokenDescriptor>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            wallet: WalletProviderConfig::default(),
            attestation: AttestationConfig::default(),
            quote: QuoteConfig::default(),
            transfer: TransferConfig::default(),
            chains: Vec::new(),
            tokens: Vec::new(),
        }
    }
}

/// General settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string() }
    }
}

/// VAA lookup service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationConfig {
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_WORMHOLESCAN_API_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    /// Quiet period after the last form edit before a quote is requested
    pub debounce_ms: u64,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self { debounce_ms: 2_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub settlement: SettlementMode,
    /// Delay before an unverified completion is reported
    pub completion_delay_ms: u64,
    pub receipt_timeout_secs: u64,
    pub default_source: Chain,
    pub default_target: Chain,
    pub default_token: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            settlement: SettlementMode::AssumeAfterDelay,
            completion_delay_ms: 5_000,
            receipt_timeout_secs: 600,
            default_source: Chain::Ethereum,
            default_target: Chain::Polygon,
            default_token: "USDC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMode {
    AssumeAfterDelay,
    AwaitRedeem,
}

impl BridgeConfig {
    pub fn registry(&self) -> ChainRegistry {
        if self.chains.is_empty() {
            ChainRegistry::defaults()
        } else {
            ChainRegistry::new(self.chains.clone())
        }
    }

    pub fn token_table(&self) -> Vec<TokenDescriptor> {
        if self.tokens.is_empty() {
            default_token_descriptors()
        } else {
            self.tokens.clone()
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        let settlement = match self.transfer.settlement {
            SettlementMode::AssumeAfterDelay => SettlementPolicy::AssumeAfterDelay(
                Duration::from_millis(self.transfer.completion_delay_ms),
            ),
            SettlementMode::AwaitRedeem => SettlementPolicy::AwaitRedeem,
        };
        OrchestratorSettings {
            quote_debounce: Duration::from_millis(self.quote.debounce_ms),
            settlement,
            default_source: self.transfer.default_source,
            default_target: self.transfer.default_target,
            default_token: self.transfer.default_token.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.transfer.default_source == self.transfer.default_target {
            bail!("Default source and target chain must differ ({})", self.transfer.default_source);
        }
        let registry = self.registry();
        for chain in [self.transfer.default_source, self.transfer.default_target] {
            if registry.get(chain).is_none() {
                bail!("Default chain {} is not configured", chain);
            }
        }
        let tokens = self.token_table();
        if !tokens.iter().any(|t| t.symbol.eq_ignore_ascii_case(&self.transfer.default_token)) {
            bail!("Default token {} is not configured", self.transfer.default_token);
        }
        Ok(())
    }
}

/// Configuration manager for handling config loading/saving
pub struct ConfigManager {
    config: RwLock<BridgeConfig>,
    config_path: String,
}

impl ConfigManager {
    pub fn new(config_path: &str) -> Self {
        Self {
            config: RwLock::new(BridgeConfig::default()),
            config_path: config_path.to_string(),
        }
    }

    /// Load configuration from file
    pub async fn load(&self) -> Result<()> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            info!("Configuration file not found, using default configuration");
            return Ok(());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", self.config_path))?;

        let config: BridgeConfig = serde_yaml::from_str(&config_content)
            .context("Failed to parse configuration file")?;
        config.validate()?;

        *self.config.write().await = config;
        info!("Configuration loaded from {}", self.config_path);

        Ok(())
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config = self.config.read().await;
        let config_yaml = serde_yaml::to_string(&*config)
            .context("Failed to serialize configuration")?;

        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }

        fs::write(path, config_yaml)
            .with_context(|| format!("Failed to write configuration to file: {}", self.config_path))?;

        info!("Configuration saved to {}", self.config_path);
        Ok(())
    }

    pub async fn get_config(&self) -> BridgeConfig {
        self.config.read().await.clone()
    }

    pub async fn update_config(&self, config: BridgeConfig) -> Result<()> {
        config.validate()?;
        *self.config.write().await = config;
        Ok(())
    }

    /// Environment overrides: WORMHOLESCAN_API_URL, WALLET_RPC_URL, BRIDGE_LOG_LEVEL
    pub async fn apply_env_overrides(&self) {
        let mut config = self.config.write().await;
        if let Ok(url) = std::env::var("WORMHOLESCAN_API_URL") {
            info!("WORMHOLESCAN_API_URL overrides attestation endpoint");
            config.attestation.api_url = url;
        }
        if let Ok(url) = std::env::var("WALLET_RPC_URL") {
            info!("WALLET_RPC_URL overrides wallet endpoint");
            config.wallet.rpc_url = url;
        }
        if let Ok(level) = std::env::var("BRIDGE_LOG_LEVEL") {
            config.general.log_level = level;
        }
    }

    pub fn config_path(&self) -> &str {
        &self.config_path
    }
}

/// Full configuration with the chain and token tables written out
pub fn initialize_default_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.chains = Chain::supported_chains().iter().map(Chain::descriptor).collect();
    config.tokens = default_token_descriptors();
    if let Err(e) = config.validate() {
        warn!("Built-in configuration failed validation: {}", e);
    }
    config
}
