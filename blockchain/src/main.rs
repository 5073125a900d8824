/// Wormhole bridge CLI - Main entry point
///
/// Connects to a JSON-RPC wallet endpoint (Frame or any EIP-1193 bridge) and
/// drives token transfers through the Wormhole Token Bridge.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use blockchain::{
    config::ConfigManager, init_logging, initialize_default_config, ApprovalOutcome, BridgeConfig,
    BridgeOrchestrator, ChannelPrompter, PromptEvent, TransferOutcome, WormholeScanClient,
    WormholeTokenBridge,
};
use common::{AttestationKey, AttestationLookup, AttestationSource, Chain, TransferStatus};
use wallet::{JsonRpcWalletProvider, SessionManager, WalletProvider};

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = blockchain::config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate default configuration
    Init,

    /// List supported chains
    Chains,

    /// List tokens supported on a chain
    Tokens {
        #[arg(long, default_value = "ethereum")]
        chain: Chain,
    },

    /// Connect the wallet and print the session
    Connect,

    /// Show balance and allowance for the connected account
    Balance {
        #[arg(long, default_value = "ethereum")]
        chain: Chain,
        #[arg(long, default_value = "USDC")]
        token: String,
    },

    /// Get a fee quote
    Quote(TransferArgs),

    /// Approve the token bridge to spend the amount
    Approve(TransferArgs),

    /// Bridge tokens to the target chain
    Transfer(TransferArgs),

    /// Look up the signed VAA of an earlier transfer
    Vaa {
        /// Source chain of the transfer
        #[arg(long)]
        chain: Chain,
        /// Source transaction hash
        #[arg(long)]
        tx: String,
        #[arg(long)]
        sequence: String,
        /// Emitter address (32-byte hex)
        #[arg(long)]
        emitter: Option<String>,
    },
}

#[derive(Args, Clone)]
struct TransferArgs {
    #[arg(long)]
    from: Chain,
    #[arg(long)]
    to: Chain,
    #[arg(long, default_value = "USDC")]
    token: String,
    #[arg(long)]
    amount: String,
    /// Defaults to the connected address
    #[arg(long)]
    recipient: Option<String>,
    /// Answer yes to every prompt
    #[arg(short, long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config_manager = Arc::new(ConfigManager::new(&cli.config));
    config_manager.load().await?;
    config_manager.apply_env_overrides().await;
    let config = config_manager.get_config().await;

    let log_level = cli.log_level.clone().unwrap_or_else(|| config.general.log_level.clone());
    init_logging(&log_level)?;

    match cli.command {
        Commands::Init => init_config(config_manager).await,
        Commands::Chains => {
            list_chains(&config);
            Ok(())
        }
        Commands::Tokens { chain } => {
            list_tokens(&config, chain);
            Ok(())
        }
        Commands::Connect => connect(&config).await,
        Commands::Balance { chain, token } => show_balance(&config, chain, &token).await,
        Commands::Quote(args) => quote(&config, &args).await,
        Commands::Approve(args) => approve(&config, &args).await,
        Commands::Transfer(args) => transfer(&config, &args).await,
        Commands::Vaa { chain, tx, sequence, emitter } => {
            lookup_vaa(&config, chain, tx, sequence, emitter).await
        }
    }
}

/// Initialize configuration with defaults
async fn init_config(config_manager: Arc<ConfigManager>) -> Result<()> {
    info!("Initializing default configuration at {}", config_manager.config_path());
    config_manager.update_config(initialize_default_config()).await?;
    config_manager.save().await?;
    println!("Configuration written to {}", config_manager.config_path());
    Ok(())
}

fn list_chains(config: &BridgeConfig) {
    for chain in config.registry().all() {
        println!(
            "{} {:<18} chain {:<8} wormhole {:<3} ~{} min finality",
            chain.icon, chain.name, chain.chain_id, chain.wormhole_chain_id, chain.finality_minutes
        );
    }
}

fn list_tokens(config: &BridgeConfig, chain: Chain) {
    for token in config.token_table() {
        if let Some(deployment) = token.on_chain(chain) {
            println!("{:<6} {:<16} {} ({} decimals)", token.symbol, token.name, deployment.address, deployment.decimals);
        }
    }
}

/// Wire wallet, SDK, attestation client and prompter into an orchestrator
async fn build_orchestrator(
    config: &BridgeConfig,
    auto_confirm: bool,
) -> Result<Arc<BridgeOrchestrator>> {
    let registry = Arc::new(config.registry());

    let provider: Option<Arc<dyn WalletProvider>> = match JsonRpcWalletProvider::new(&config.wallet) {
        Ok(provider) => {
            let provider = Arc::new(provider);
            provider.spawn_watcher(config.wallet.poll_interval());
            Some(provider as Arc<dyn WalletProvider>)
        }
        Err(e) => {
            warn!("Wallet provider unavailable: {}", e);
            None
        }
    };
    let session = Arc::new(SessionManager::new(provider));

    let sdk = WormholeTokenBridge::new(Arc::clone(&registry), config.token_table()).with_receipt_timeout(
        std::time::Duration::from_secs(config.transfer.receipt_timeout_secs),
    );
    let attestations = WormholeScanClient::with_config(
        &config.attestation.api_url,
        Some(config.attestation.timeout_secs),
    )?;

    let (prompter, prompts) = ChannelPrompter::channel(4);
    tokio::spawn(answer_prompts(prompts, auto_confirm));

    let orchestrator = BridgeOrchestrator::new(
        registry,
        session,
        Arc::new(sdk),
        Arc::new(attestations),
        Arc::new(prompter),
        config.orchestrator_settings(),
    );

    if orchestrator.check_existing_connection().await.is_none()
        && orchestrator.connect_wallet().await.is_none()
    {
        let state = orchestrator.state().await;
        bail!(state.error.unwrap_or_else(|| "Wallet connection failed".to_string()));
    }
    Ok(orchestrator)
}

/// Answer prompts on stdin, or accept everything with `--yes`
async fn answer_prompts(mut prompts: mpsc::Receiver<PromptEvent>, auto_confirm: bool) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(event) = prompts.recv().await {
        match event {
            PromptEvent::Notice(notice) => println!("{}", notice),
            PromptEvent::Confirm(request) => {
                println!("{}", request.prompt);
                if auto_confirm {
                    request.accept();
                    continue;
                }
                println!("Continue? [y/N]");
                let accepted = match lines.next_line().await {
                    Ok(Some(line)) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
                    _ => false,
                };
                request.answer(accepted);
            }
        }
    }
}

async fn connect(config: &BridgeConfig) -> Result<()> {
    let orchestrator = build_orchestrator(config, false).await?;
    let diagnostics = orchestrator.diagnostics().await;
    println!("{}", serde_json::to_string_pretty(&diagnostics)?);
    Ok(())
}

async fn show_balance(config: &BridgeConfig, chain: Chain, token: &str) -> Result<()> {
    let orchestrator = build_orchestrator(config, false).await?;
    orchestrator.set_source_chain(chain).await?;
    orchestrator.set_token(token).await?;
    orchestrator.refresh_balances().await;

    let state = orchestrator.state().await;
    if let Some(error) = state.error {
        bail!(error);
    }
    println!("Balance:   {} {}", state.token_balance, state.form.token);
    println!("Allowance: {} {}", state.allowance, state.form.token);
    Ok(())
}

/// Fill the form from the command line arguments
async fn prepare(config: &BridgeConfig, args: &TransferArgs) -> Result<Arc<BridgeOrchestrator>> {
    let orchestrator = build_orchestrator(config, args.yes).await?;
    orchestrator.set_source_chain(args.from).await?;
    orchestrator.set_target_chain(args.to).await?;
    orchestrator.set_token(&args.token).await?;
    orchestrator.set_amount(&args.amount).await;
    match &args.recipient {
        Some(recipient) => orchestrator.set_recipient(recipient).await,
        None => {
            orchestrator
                .use_own_address_as_recipient()
                .await
                .context("No connected address to use as recipient")?;
        }
    }
    orchestrator.refresh_balances().await;
    Ok(orchestrator)
}

async fn quote(config: &BridgeConfig, args: &TransferArgs) -> Result<()> {
    let orchestrator = prepare(config, args).await?;
    match orchestrator.refresh_quote().await {
        Some(quote) => {
            println!("{}", quote);
            Ok(())
        }
        None => {
            let state = orchestrator.state().await;
            bail!(state.error.unwrap_or_else(|| "Quote unavailable for this input".to_string()))
        }
    }
}

async fn approve(config: &BridgeConfig, args: &TransferArgs) -> Result<()> {
    let orchestrator = prepare(config, args).await?;
    let mut outcome = orchestrator.approve().await;
    if outcome == ApprovalOutcome::NetworkSwitched {
        outcome = orchestrator.approve().await;
    }

    match outcome {
        ApprovalOutcome::Approved { tx_hash } => {
            info!("Approval confirmed: {}", tx_hash);
            Ok(())
        }
        ApprovalOutcome::Blocked(report) => {
            for warning in &report.warnings {
                println!("{}", warning);
            }
            bail!("Approval not possible ({:?})", report.action)
        }
        other => bail!("Approval did not complete: {:?}", other),
    }
}

async fn transfer(config: &BridgeConfig, args: &TransferArgs) -> Result<()> {
    let orchestrator = prepare(config, args).await?;
    let mut statuses = orchestrator.subscribe_status();
    tokio::spawn(async move {
        while let Ok(status) = statuses.recv().await {
            print_status(&status);
        }
    });

    let mut outcome = orchestrator.transfer().await;
    if outcome == TransferOutcome::NetworkSwitched {
        orchestrator.refresh_balances().await;
        outcome = orchestrator.transfer().await;
    }

    match outcome {
        TransferOutcome::Completed(status) | TransferOutcome::AwaitingSettlement(status) => {
            if let Some(url) = orchestrator.explorer_tx_url().await {
                println!("Source transaction: {}", url);
            }
            println!("{}", status);
            Ok(())
        }
        TransferOutcome::AwaitingAttestation => {
            let Some(status) = orchestrator.state().await.transfer_status else {
                bail!("Transfer status was lost");
            };
            let sequence = status.sequence.unwrap_or_default();
            let tx_hash = status.tx_hash.unwrap_or_default();
            println!("Guardians have not signed sequence {} yet. Track it on wormholescan.io.", sequence);
            let mut hint = format!("vaa --chain {} --tx {} --sequence {}", args.from, tx_hash, sequence);
            if let Some(emitter) = status.emitter {
                hint.push_str(&format!(" --emitter {}", emitter));
            }
            println!("Check again later with `{}`", hint);
            Ok(())
        }
        TransferOutcome::Blocked(report) => {
            for warning in &report.warnings {
                println!("{}", warning);
            }
            bail!("Transfer not possible ({:?})", report.action)
        }
        TransferOutcome::Failed(message) => bail!(message),
        other => bail!("Transfer did not complete: {:?}", other),
    }
}

/// One-off VAA lookup for a transfer submitted by an earlier run
async fn lookup_vaa(
    config: &BridgeConfig,
    chain: Chain,
    tx_hash: String,
    sequence: String,
    emitter: Option<String>,
) -> Result<()> {
    let descriptor = config
        .registry()
        .get(chain)
        .cloned()
        .with_context(|| format!("Chain {} is not configured", chain))?;
    let client = WormholeScanClient::with_config(
        &config.attestation.api_url,
        Some(config.attestation.timeout_secs),
    )?;
    let key = AttestationKey {
        wormhole_chain_id: descriptor.wormhole_chain_id,
        tx_hash,
        sequence,
        emitter,
    };
    match client.fetch_attestation(&key).await? {
        AttestationLookup::Available(vaa) => {
            println!("{}", vaa);
            Ok(())
        }
        AttestationLookup::NotYetAvailable => bail!("VAA not yet available for sequence {}", key.sequence),
    }
}

fn print_status(status: &TransferStatus) {
    match status.short_tx_hash() {
        Some(tx) => println!("{} [{}]", status, tx),
        None => println!("{}", status),
    }
}
