//! Wormhole bridge transfer orchestrator
//!
//! Move an ERC-20 token between EVM chains through the Wormhole Token Bridge:
//! wallet session, balance and allowance checks, quotes, approval, network
//! switching, transfer submission and VAA tracking.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod processor;
pub mod sdk;

pub use config::{initialize_default_config, BridgeConfig, ConfigManager, SettlementMode};
pub use processor::bridge_orchestrator::{
    ApprovalOutcome, BridgeOrchestrator, BridgeState, Diagnostics, OrchestratorSettings,
    SettlementPolicy, SwitchOutcome, TransferForm, TransferOutcome,
};
pub use processor::gating::{GateReport, GateWarning, PrimaryAction};
pub use processor::prompt::{ChannelPrompter, Notice, Prompt, PromptEvent, PromptRequest, Prompter};
pub use processor::wormhole::WormholeScanClient;
pub use sdk::token_bridge::WormholeTokenBridge;

/// Initialize logging. `RUST_LOG` takes precedence over `log_level`.
pub fn init_logging(log_level: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    info!("Logging initialized at {} level", level);
    Ok(())
}
