use async_trait::async_trait;
use metrics::increment_counter;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use common::{
    AttestationKey, AttestationLookup, AttestationSource, BridgeError, BridgeQuote, BridgeSdk,
    Chain, ChainDescriptor, ChainRegistry, ProgressReporter, TransferRequest, TransferStatus,
    TransferStep,
};
use wallet::{SessionChange, SessionManager, WalletEvent, WalletSession};

use crate::processor::gating::{self, GateInput, GateReport, PrimaryAction};
use crate::processor::prompt::{Notice, Prompt, Prompter};
use crate::processor::requests::RequestTracker;

const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Thông báo khi VAA chưa được guardian ký; người dùng có thể resume sau
pub const VAA_NOT_READY_MESSAGE: &str = "Transfer monitoring failed: VAA not yet available";

const BALANCE_ERROR_PREFIX: &str = "Failed to load balance";
const QUOTE_ERROR_PREFIX: &str = "Failed to get quote";

/// How a transfer is declared complete once its VAA is available
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementPolicy {
    /// Report completion after a fixed delay without observing the target chain
    AssumeAfterDelay(Duration),
    /// Stay at step 4 until the caller reports redemption via `confirm_settlement`
    AwaitRedeem,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub quote_debounce: Duration,
    pub settlement: SettlementPolicy,
    pub default_source: Chain,
    pub default_target: Chain,
    pub default_token: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            quote_debounce: Duration::from_secs(2),
            settlement: SettlementPolicy::AssumeAfterDelay(Duration::from_secs(5)),
            default_source: Chain::Ethereum,
            default_target: Chain::Polygon,
            default_token: "USDC".to_string(),
        }
    }
}

/// Fields the user edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferForm {
    pub source_chain: Chain,
    pub target_chain: Chain,
    pub token: String,
    pub amount: String,
    pub recipient: String,
}

/// Observable state of the transfer workflow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeState {
    pub form: TransferForm,
    pub token_balance: String,
    pub allowance: String,
    pub balance_loading: bool,
    pub approving: bool,
    pub transferring: bool,
    pub quote_loading: bool,
    pub quote: Option<BridgeQuote>,
    /// General error banner
    pub error: Option<String>,
    pub transfer_status: Option<TransferStatus>,
}

impl BridgeState {
    fn new(settings: &OrchestratorSettings) -> Self {
        Self {
            form: TransferForm {
                source_chain: settings.default_source,
                target_chain: settings.default_target,
                token: settings.default_token.clone(),
                amount: String::new(),
                recipient: String::new(),
            },
            token_balance: "0".to_string(),
            allowance: "0".to_string(),
            balance_loading: false,
            approving: false,
            transferring: false,
            quote_loading: false,
            quote: None,
            error: None,
            transfer_status: None,
        }
    }

    fn has_live_transfer(&self) -> bool {
        self.transfer_status.as_ref().map_or(false, |s| !s.is_terminal())
    }
}

/// Read-out for the "advanced" panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub connected_address: Option<String>,
    pub balance_loading: bool,
    pub sequence: Option<String>,
    pub vaa_ready: bool,
    pub wallet_name: Option<String>,
    pub network_name: String,
    pub provider_detected: bool,
    pub supported_tokens: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// Gating does not allow a transfer right now
    Blocked(GateReport),
    /// Another approval or transfer is running
    Busy,
    /// User declined a confirmation prompt
    Declined,
    /// Wallet now on the source chain; the user re-issues the transfer
    NetworkSwitched,
    NetworkSwitchFailed(String),
    Failed(String),
    /// Submitted on chain, VAA not signed yet; see `resume_monitoring`
    AwaitingAttestation,
    /// VAA ready, waiting for `confirm_settlement`
    AwaitingSettlement(TransferStatus),
    Completed(TransferStatus),
    /// A reset or newer attempt superseded this one; its results were dropped
    Superseded,
    NothingToResume,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    Blocked(GateReport),
    Busy,
    Declined,
    NetworkSwitched,
    NetworkSwitchFailed(String),
    Approved { tx_hash: String },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Switched,
    Declined,
    Failed(String),
}

/// Điều phối toàn bộ luồng chuyển token qua Wormhole: phiên ví, số dư,
/// báo giá, approve, chuyển mạng, theo dõi VAA.
pub struct BridgeOrchestrator {
    registry: Arc<ChainRegistry>,
    session: Arc<SessionManager>,
    sdk: Arc<dyn BridgeSdk>,
    attestations: Arc<dyn AttestationSource>,
    prompter: Arc<dyn Prompter>,
    settings: OrchestratorSettings,
    state: RwLock<BridgeState>,
    requests: RequestTracker,
    status_tx: broadcast::Sender<TransferStatus>,
    event_listener: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeOrchestrator {
    pub fn new(
        registry: Arc<ChainRegistry>,
        session: Arc<SessionManager>,
        sdk: Arc<dyn BridgeSdk>,
        attestations: Arc<dyn AttestationSource>,
        prompter: Arc<dyn Prompter>,
        settings: OrchestratorSettings,
    ) -> Arc<Self> {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        info!(
            "Bridge orchestrator ready ({} chains, provider {})",
            registry.all().len(),
            sdk.provider_name()
        );
        Arc::new(Self {
            registry,
            session,
            sdk,
            attestations,
            prompter,
            state: RwLock::new(BridgeState::new(&settings)),
            settings,
            requests: RequestTracker::new(),
            status_tx,
            event_listener: Mutex::new(None),
        })
    }

    pub async fn state(&self) -> BridgeState {
        self.state.read().await.clone()
    }

    /// Every change to the live transfer status, in order
    pub fn subscribe_status(&self) -> broadcast::Receiver<TransferStatus> {
        self.status_tx.subscribe()
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    fn descriptor(&self, chain: Chain) -> ChainDescriptor {
        self.registry.get(chain).cloned().unwrap_or_else(|| chain.descriptor())
    }

    async fn set_error(&self, error: Option<String>) {
        self.state.write().await.error = error;
    }

    /// Drop the banner when it was left by an earlier failure of the same kind
    fn clear_error_from(state: &mut BridgeState, prefix: &str) {
        if state.error.as_deref().map_or(false, |e| e.starts_with(prefix)) {
            state.error = None;
        }
    }

    // ---------------------------------------------------------------------
    // Wallet session
    // ---------------------------------------------------------------------

    /// Interactive connect. Failures land in the error banner.
    pub async fn connect_wallet(self: &Arc<Self>) -> Option<WalletSession> {
        self.set_error(None).await;
        match self.session.connect().await {
            Ok(session) => {
                self.ensure_event_listener().await;
                self.refresh_balances().await;
                self.schedule_quote();
                Some(session)
            }
            Err(e) => {
                warn!("Wallet connection failed: {}", e);
                self.set_error(Some(e.connect_message())).await;
                None
            }
        }
    }

    /// Silent reconnect on startup; failures are only logged
    pub async fn check_existing_connection(self: &Arc<Self>) -> Option<WalletSession> {
        match self.session.check_existing_connection().await {
            Ok(Some(session)) => {
                self.ensure_event_listener().await;
                self.refresh_balances().await;
                Some(session)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("No existing wallet connection found: {}", e);
                None
            }
        }
    }

    pub async fn disconnect_wallet(&self) {
        self.session.disconnect().await;
        self.clear_wallet_state().await;
    }

    async fn clear_wallet_state(&self) {
        self.requests.attempts.invalidate();
        self.requests.balances.invalidate();
        self.requests.quotes.invalidate();
        let mut state = self.state.write().await;
        state.token_balance = "0".to_string();
        state.allowance = "0".to_string();
        state.balance_loading = false;
        state.quote = None;
        state.quote_loading = false;
        state.transfer_status = None;
    }

    /// Subscribe to wallet events once per orchestrator
    async fn ensure_event_listener(self: &Arc<Self>) {
        let mut listener = self.event_listener.lock().await;
        if listener.as_ref().map_or(false, |handle| !handle.is_finished()) {
            return;
        }
        let Some(mut events) = self.session.subscribe() else {
            return;
        };

        let orchestrator: Weak<Self> = Arc::downgrade(self);
        *listener = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(this) = orchestrator.upgrade() else {
                            break;
                        };
                        this.handle_wallet_event(event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} wallet events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Apply a wallet event and re-derive what depends on the session
    pub async fn handle_wallet_event(self: &Arc<Self>, event: WalletEvent) -> SessionChange {
        let change = self.session.apply_event(&event).await;
        match &change {
            SessionChange::Disconnected => self.clear_wallet_state().await,
            SessionChange::AccountChanged(_) => {
                self.refresh_balances().await;
                self.schedule_quote();
            }
            SessionChange::ChainChanged(_) | SessionChange::Unchanged => {
                self.refresh_balances().await;
            }
        }
        change
    }

    // ---------------------------------------------------------------------
    // Form
    // ---------------------------------------------------------------------

    pub async fn set_source_chain(self: &Arc<Self>, chain: Chain) -> Result<(), BridgeError> {
        if self.registry.get(chain).is_none() {
            return Err(BridgeError::UnsupportedChain(chain.to_string()));
        }
        {
            let mut state = self.state.write().await;
            if state.form.source_chain == chain {
                return Ok(());
            }
            let previous = state.form.source_chain;
            state.form.source_chain = chain;
            if state.form.target_chain == chain {
                state.form.target_chain = previous;
            }
            state.quote = None;
        }
        self.refresh_balances().await;
        self.schedule_quote();
        Ok(())
    }

    pub async fn set_target_chain(self: &Arc<Self>, chain: Chain) -> Result<(), BridgeError> {
        if self.registry.get(chain).is_none() {
            return Err(BridgeError::UnsupportedChain(chain.to_string()));
        }
        {
            let mut state = self.state.write().await;
            if state.form.source_chain == chain {
                return Err(BridgeError::Other(
                    "Target chain must differ from the source chain".to_string(),
                ));
            }
            state.form.target_chain = chain;
            state.quote = None;
        }
        self.schedule_quote();
        Ok(())
    }

    pub async fn set_token(self: &Arc<Self>, token: &str) -> Result<(), BridgeError> {
        let source = self.state.read().await.form.source_chain;
        let supported = self
            .sdk
            .get_supported_tokens(source)
            .into_iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(token))
            .ok_or_else(|| BridgeError::UnsupportedToken {
                token: token.to_string(),
                chain: source.to_string(),
            })?;
        self.state.write().await.form.token = supported.symbol;
        self.refresh_balances().await;
        self.schedule_quote();
        Ok(())
    }

    pub async fn set_amount(self: &Arc<Self>, amount: &str) {
        self.state.write().await.form.amount = amount.to_string();
        self.schedule_quote();
    }

    pub async fn set_recipient(self: &Arc<Self>, recipient: &str) {
        self.state.write().await.form.recipient = recipient.to_string();
        self.schedule_quote();
    }

    pub async fn swap_chains(self: &Arc<Self>) {
        {
            let mut state = self.state.write().await;
            let form = &mut state.form;
            std::mem::swap(&mut form.source_chain, &mut form.target_chain);
            state.quote = None;
        }
        self.refresh_balances().await;
        self.schedule_quote();
    }

    /// 99% of the known balance
    pub async fn max_amount(&self) -> String {
        gating::max_transfer_amount(&self.state.read().await.token_balance)
    }

    /// Fill in `max_amount`
    pub async fn use_max_amount(self: &Arc<Self>) -> String {
        let amount = {
            let mut state = self.state.write().await;
            let amount = gating::max_transfer_amount(&state.token_balance);
            state.form.amount = amount.clone();
            amount
        };
        self.schedule_quote();
        amount
    }

    pub async fn use_own_address_as_recipient(self: &Arc<Self>) -> Option<String> {
        let address = self.session.current().await?.address;
        self.state.write().await.form.recipient = address.clone();
        self.schedule_quote();
        Some(address)
    }

    /// Target options for the current source chain
    pub async fn target_options(&self) -> Vec<Chain> {
        let source = self.state.read().await.form.source_chain;
        self.registry.targets_for(source)
    }

    fn build_request(&self, form: &TransferForm, sender: &str) -> TransferRequest {
        TransferRequest::new(
            form.source_chain,
            form.target_chain,
            form.token.clone(),
            form.amount.trim(),
            form.recipient.trim(),
            sender,
        )
    }

    // ---------------------------------------------------------------------
    // Gating
    // ---------------------------------------------------------------------

    pub async fn gate(&self) -> GateReport {
        let session = self.session.current().await;
        let state = self.state.read().await;
        let source = self.descriptor(state.form.source_chain);
        gating::evaluate(&GateInput {
            connected: session.is_some(),
            amount: &state.form.amount,
            recipient: &state.form.recipient,
            balance: &state.token_balance,
            allowance: &state.allowance,
            token: &state.form.token,
            source: &source,
            active_chain_id: session.as_ref().map(|s| s.chain_id.as_str()),
            balance_loading: state.balance_loading,
            approving: state.approving,
            transferring: state.transferring,
        })
    }

    // ---------------------------------------------------------------------
    // Balance and quotes
    // ---------------------------------------------------------------------

    /// Reload balance and allowance for (address, source chain, token)
    pub async fn refresh_balances(&self) {
        let Some(session) = self.session.current().await else {
            return;
        };
        let (ticket, chain, token) = {
            let mut state = self.state.write().await;
            if state.transferring {
                debug!("Skipping balance refresh while a transfer is in flight");
                return;
            }
            state.balance_loading = true;
            (self.requests.balances.next(), state.form.source_chain, state.form.token.clone())
        };

        let result = async {
            let balance = self.sdk.get_token_balance(chain, &token, &session.address).await?;
            let allowance = self.sdk.check_token_allowance(chain, &token, &session.address).await?;
            Ok::<_, BridgeError>((balance, allowance))
        }
        .await;

        let mut state = self.state.write().await;
        if !self.requests.balances.is_current(ticket) {
            debug!("Dropping stale balance result for {} on {}", token, chain);
            increment_counter!("bridge_stale_results_dropped_total");
            return;
        }
        state.balance_loading = false;
        match result {
            Ok((balance, allowance)) => {
                debug!("{} balance {} / allowance {} on {}", token, balance, allowance, chain);
                state.token_balance = balance;
                state.allowance = allowance;
                Self::clear_error_from(&mut state, BALANCE_ERROR_PREFIX);
            }
            Err(e) => {
                warn!("Failed to load balance: {}", e);
                state.error = Some(format!("{}: {}", BALANCE_ERROR_PREFIX, e));
            }
        }
    }

    /// Request a quote after the quiet period, superseding any pending one
    pub fn schedule_quote(self: &Arc<Self>) {
        let generation = self.requests.quotes.next();
        let quiet = self.settings.quote_debounce;
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if !this.requests.quotes.is_current(generation) {
                return;
            }
            this.fetch_quote(generation).await;
        });
    }

    /// Request a quote now
    pub async fn refresh_quote(&self) -> Option<BridgeQuote> {
        let generation = self.requests.quotes.next();
        self.fetch_quote(generation).await
    }

    async fn fetch_quote(&self, generation: u64) -> Option<BridgeQuote> {
        let session = self.session.current().await?;
        let request = {
            let mut state = self.state.write().await;
            let current = self.requests.quotes.is_current(generation);
            if state.transferring {
                if current {
                    state.quote_loading = false;
                }
                return None;
            }
            let request = self.build_request(&state.form, &session.address);
            if !request.is_quotable() {
                // a superseded fetch may have left the flag set
                if current {
                    state.quote_loading = false;
                    state.quote = None;
                }
                return None;
            }
            state.quote_loading = true;
            request
        };

        debug!("Requesting quote for {}", request);
        let result = self.sdk.get_bridge_quote(&request).await;

        let mut state = self.state.write().await;
        if !self.requests.quotes.is_current(generation) {
            debug!("Dropping superseded quote #{}", generation);
            increment_counter!("bridge_stale_results_dropped_total");
            return None;
        }
        state.quote_loading = false;
        match result {
            Ok(quote) => {
                state.quote = Some(quote.clone());
                Self::clear_error_from(&mut state, QUOTE_ERROR_PREFIX);
                Some(quote)
            }
            Err(e) => {
                warn!("Quote failed: {}", e);
                state.quote = None;
                state.error = Some(format!("{}: {}", QUOTE_ERROR_PREFIX, e));
                None
            }
        }
    }

    // ---------------------------------------------------------------------
    // Network switch
    // ---------------------------------------------------------------------

    async fn run_network_switch(&self, source: &ChainDescriptor, purpose: &str) -> SwitchOutcome {
        let prompt = Prompt::SwitchNetwork {
            chain_name: source.name.clone(),
            purpose: purpose.to_string(),
        };
        if !self.prompter.confirm(&prompt).await {
            info!("User declined switching to {}", source.name);
            return SwitchOutcome::Declined;
        }
        match self.session.switch_network(source).await {
            Ok(()) => SwitchOutcome::Switched,
            Err(e) => {
                let message = e.to_string();
                self.set_error(Some(message.clone())).await;
                SwitchOutcome::Failed(message)
            }
        }
    }

    /// Ask the wallet to move to the current source chain
    pub async fn switch_to_source_network(&self) -> SwitchOutcome {
        let source = self.descriptor(self.state.read().await.form.source_chain);
        self.run_network_switch(&source, "continue").await
    }

    // ---------------------------------------------------------------------
    // Approval
    // ---------------------------------------------------------------------

    pub async fn approve(self: &Arc<Self>) -> ApprovalOutcome {
        let report = self.gate().await;
        if report.action != PrimaryAction::Approve {
            return ApprovalOutcome::Blocked(report);
        }
        if !report.correct_network {
            let source = self.descriptor(self.state.read().await.form.source_chain);
            return match self.run_network_switch(&source, "approve tokens").await {
                SwitchOutcome::Switched => ApprovalOutcome::NetworkSwitched,
                SwitchOutcome::Declined => ApprovalOutcome::Declined,
                SwitchOutcome::Failed(message) => ApprovalOutcome::NetworkSwitchFailed(message),
            };
        }
        if !report.can_approve() {
            return ApprovalOutcome::Blocked(report);
        }

        let (chain, token, amount) = {
            let mut state = self.state.write().await;
            if state.approving || state.transferring {
                return ApprovalOutcome::Busy;
            }
            state.approving = true;
            state.error = None;
            (state.form.source_chain, state.form.token.clone(), state.form.amount.trim().to_string())
        };

        let result = async {
            let signer = self.session.signer().await?;
            let tx_hash = self.sdk.approve_token(signer, chain, &token, &amount).await?;
            info!("Approval submitted: {}", tx_hash);
            self.sdk.wait_for_transaction(chain, &tx_hash).await?;
            Ok::<_, BridgeError>(tx_hash)
        }
        .await;

        self.state.write().await.approving = false;
        match result {
            Ok(tx_hash) => {
                info!("Approval {} confirmed", tx_hash);
                self.refresh_balances().await;
                let explorer_url = self.descriptor(chain).tx_url(&tx_hash);
                self.prompter
                    .notify(&Notice::ApprovalConfirmed { tx_hash: tx_hash.clone(), explorer_url })
                    .await;
                ApprovalOutcome::Approved { tx_hash }
            }
            Err(e) => {
                let message = format!("Token approval failed: {}", e);
                warn!("{}", message);
                self.set_error(Some(message.clone())).await;
                ApprovalOutcome::Failed(message)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Transfer
    // ---------------------------------------------------------------------

    pub async fn transfer(self: &Arc<Self>) -> TransferOutcome {
        let report = self.gate().await;
        let Some(session) = self.session.current().await else {
            return TransferOutcome::Blocked(report);
        };
        if !report.correct_network {
            let source = self.descriptor(self.state.read().await.form.source_chain);
            return match self.run_network_switch(&source, "initiate transfer").await {
                SwitchOutcome::Switched => TransferOutcome::NetworkSwitched,
                SwitchOutcome::Declined => TransferOutcome::Declined,
                SwitchOutcome::Failed(message) => TransferOutcome::NetworkSwitchFailed(message),
            };
        }
        if !report.can_transfer() {
            return TransferOutcome::Blocked(report);
        }

        let (request, quote) = {
            let state = self.state.read().await;
            if state.has_live_transfer() {
                return TransferOutcome::Busy;
            }
            (self.build_request(&state.form, &session.address), state.quote.clone())
        };
        let prompt = Prompt::ConfirmTransfer { summary: self.transfer_summary(&request, quote.as_ref()) };
        if !self.prompter.confirm(&prompt).await {
            info!("Transfer declined by user");
            return TransferOutcome::Declined;
        }
        // balance, network or form may have moved while the prompt was open
        let report = self.gate().await;
        if !report.correct_network || !report.can_transfer() {
            info!("Transfer no longer allowed after confirmation: {:?}", report.action);
            return TransferOutcome::Blocked(report);
        }

        let attempt = {
            let mut state = self.state.write().await;
            if state.transferring || state.approving || state.has_live_transfer() {
                return TransferOutcome::Busy;
            }
            if self.build_request(&state.form, &session.address) != request {
                info!("Transfer form changed after confirmation");
                return TransferOutcome::Blocked(report);
            }
            let attempt = self.requests.attempts.next();
            let status = TransferStatus::new(attempt, request.source_chain, request.target_chain);
            let _ = self.status_tx.send(status.clone());
            state.transfer_status = Some(status);
            state.transferring = true;
            state.error = None;
            attempt
        };
        increment_counter!("bridge_transfers_started_total");
        info!("Starting transfer attempt {}: {}", attempt, request);

        let outcome = self.execute_transfer(attempt, &request).await;

        self.state.write().await.transferring = false;
        if !matches!(outcome, TransferOutcome::Superseded) {
            self.refresh_balances().await;
        }
        outcome
    }

    fn transfer_summary(&self, request: &TransferRequest, quote: Option<&BridgeQuote>) -> String {
        let fee = quote
            .map(|q| format!("{} {}", q.fee, q.fee_currency))
            .unwrap_or_else(|| "calculating...".to_string());
        format!(
            "Confirm transfer:\nAmount: {} {}\nFrom: {}\nTo: {}\nRecipient: {}\nEstimated fee: {}",
            request.amount,
            request.token,
            self.descriptor(request.source_chain).name,
            self.descriptor(request.target_chain).name,
            request.recipient,
            fee
        )
    }

    async fn execute_transfer(&self, attempt: u64, request: &TransferRequest) -> TransferOutcome {
        let signer = match self.session.signer().await {
            Ok(signer) => signer,
            Err(e) => return self.fail_attempt(attempt, format!("Transfer failed: {}", e)).await,
        };

        let progress = AttemptProgress { orchestrator: self, attempt };
        let receipt = match self.sdk.initiate_transfer(signer, request, &progress).await {
            Ok(receipt) => receipt,
            Err(e) => return self.fail_attempt(attempt, format!("Transfer failed: {}", e)).await,
        };

        let recorded = self
            .with_attempt(attempt, |state| {
                state.transfer_status.as_mut().map_or(false, |status| {
                    status.record_submission(
                        receipt.tx_hash.clone(),
                        receipt.sequence.clone(),
                        receipt.emitter.clone(),
                    )
                })
            })
            .await;
        match recorded {
            None => return TransferOutcome::Superseded,
            Some(true) => info!(
                "Transfer {} confirmed on source chain, sequence {}",
                receipt.tx_hash, receipt.sequence
            ),
            Some(false) => debug!("Submission for attempt {} already recorded", attempt),
        }

        self.monitor_attestation(attempt).await
    }

    /// Query the attestation once for `attempt`; no automatic retries
    async fn monitor_attestation(&self, attempt: u64) -> TransferOutcome {
        let key = self
            .with_attempt(attempt, |state| {
                let status = state.transfer_status.as_mut()?;
                status.advance(
                    TransferStep::AwaitingAttestation.index(),
                    TransferStep::AwaitingAttestation.default_message(),
                );
                Some(AttestationKey {
                    wormhole_chain_id: self.descriptor(status.source_chain).wormhole_chain_id,
                    tx_hash: status.tx_hash.clone()?,
                    sequence: status.sequence.clone()?,
                    emitter: status.emitter.clone(),
                })
            })
            .await;
        let key = match key {
            None => return TransferOutcome::Superseded,
            Some(None) => {
                return self
                    .fail_attempt(attempt, "Transfer monitoring failed: missing transaction details".to_string())
                    .await
            }
            Some(Some(key)) => key,
        };

        match self.attestations.fetch_attestation(&key).await {
            Ok(AttestationLookup::Available(vaa)) => {
                let recorded = self
                    .with_attempt(attempt, |state| {
                        state
                            .transfer_status
                            .as_mut()
                            .map_or(false, |status| status.record_attestation(vaa))
                    })
                    .await;
                if recorded.is_none() {
                    return TransferOutcome::Superseded;
                }
                self.settle(attempt).await
            }
            Ok(AttestationLookup::NotYetAvailable) => {
                info!("VAA for sequence {} not available yet", key.sequence);
                let noted = self
                    .with_attempt(attempt, |state| state.error = Some(VAA_NOT_READY_MESSAGE.to_string()))
                    .await;
                match noted {
                    Some(()) => TransferOutcome::AwaitingAttestation,
                    None => TransferOutcome::Superseded,
                }
            }
            Err(e) => {
                self.fail_attempt(attempt, format!("Transfer monitoring failed: {}", e)).await
            }
        }
    }

    async fn settle(&self, attempt: u64) -> TransferOutcome {
        match &self.settings.settlement {
            SettlementPolicy::AssumeAfterDelay(delay) => {
                warn!(
                    "Reporting attempt {} as completed after {:?} without observing redemption on the target chain",
                    attempt, delay
                );
                tokio::time::sleep(*delay).await;
                let completed = self
                    .with_attempt(attempt, |state| {
                        let status = state.transfer_status.as_mut()?;
                        status.complete(false).then(|| status.clone())
                    })
                    .await
                    .flatten();
                match completed {
                    Some(status) => {
                        increment_counter!("bridge_transfers_completed_total");
                        info!("Transfer attempt {} completed", attempt);
                        TransferOutcome::Completed(status)
                    }
                    None => TransferOutcome::Superseded,
                }
            }
            SettlementPolicy::AwaitRedeem => {
                let status = self
                    .with_attempt(attempt, |state| state.transfer_status.clone())
                    .await
                    .flatten();
                match status {
                    Some(status) => TransferOutcome::AwaitingSettlement(status),
                    None => TransferOutcome::Superseded,
                }
            }
        }
    }

    async fn fail_attempt(&self, attempt: u64, message: String) -> TransferOutcome {
        warn!("Attempt {}: {}", attempt, message);
        let applied = self
            .with_attempt(attempt, |state| {
                state.error = Some(message.clone());
                if let Some(status) = state.transfer_status.as_mut() {
                    status.fail(message.clone());
                }
            })
            .await;
        match applied {
            Some(()) => {
                increment_counter!("bridge_transfers_failed_total");
                TransferOutcome::Failed(message)
            }
            None => TransferOutcome::Superseded,
        }
    }

    /// Re-query the attestation for a transfer left waiting on guardians
    pub async fn resume_monitoring(&self) -> TransferOutcome {
        let attempt = {
            let mut state = self.state.write().await;
            if state.transferring || state.approving {
                return TransferOutcome::Busy;
            }
            let attempt = state
                .transfer_status
                .as_ref()
                .filter(|status| status.awaiting_attestation())
                .map(|status| status.attempt);
            let Some(attempt) = attempt else {
                return TransferOutcome::NothingToResume;
            };
            state.transferring = true;
            state.error = None;
            attempt
        };
        info!("Resuming attestation lookup for attempt {}", attempt);

        let outcome = self.monitor_attestation(attempt).await;
        self.state.write().await.transferring = false;
        outcome
    }

    /// Report that the VAA was redeemed on the target chain
    pub async fn confirm_settlement(&self) -> Option<TransferStatus> {
        let mut state = self.state.write().await;
        let status = state.transfer_status.as_mut()?;
        if status.vaa.is_none() || !status.complete(true) {
            return None;
        }
        let status = status.clone();
        let _ = self.status_tx.send(status.clone());
        increment_counter!("bridge_transfers_completed_total");
        info!("Transfer attempt {} settled on {}", status.attempt, status.target_chain);
        Some(status)
    }

    /// Run `f` against the state if `attempt` still owns the live status.
    /// Returns `None` for superseded attempts.
    async fn with_attempt<R>(&self, attempt: u64, f: impl FnOnce(&mut BridgeState) -> R) -> Option<R> {
        let mut state = self.state.write().await;
        let owns_status = state
            .transfer_status
            .as_ref()
            .map_or(false, |status| status.attempt == attempt);
        if !owns_status || !self.requests.attempts.is_current(attempt) {
            debug!("Dropping result of superseded transfer attempt {}", attempt);
            increment_counter!("bridge_stale_results_dropped_total");
            return None;
        }

        let before = state.transfer_status.clone();
        let result = f(&mut state);
        if state.transfer_status != before {
            if let Some(status) = &state.transfer_status {
                let _ = self.status_tx.send(status.clone());
            }
        }
        Some(result)
    }

    // ---------------------------------------------------------------------
    // Reset & diagnostics
    // ---------------------------------------------------------------------

    /// Clear the form, error, quote and status. In-flight calls keep running
    /// but their results are dropped.
    pub async fn reset(&self) {
        self.requests.attempts.invalidate();
        self.requests.quotes.invalidate();
        let mut state = self.state.write().await;
        state.form.amount.clear();
        state.form.recipient.clear();
        state.error = None;
        state.quote = None;
        state.quote_loading = false;
        state.transfer_status = None;
        debug!("Transfer form reset");
    }

    /// Explorer link of the live transfer's source transaction
    pub async fn explorer_tx_url(&self) -> Option<String> {
        let state = self.state.read().await;
        let status = state.transfer_status.as_ref()?;
        let tx_hash = status.tx_hash.as_deref()?;
        Some(self.descriptor(status.source_chain).tx_url(tx_hash))
    }

    pub async fn diagnostics(&self) -> Diagnostics {
        let session = self.session.current().await;
        let state = self.state.read().await;
        let network_name = session
            .as_ref()
            .and_then(|s| self.registry.by_chain_id(&s.chain_id))
            .map(|d| d.name.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        Diagnostics {
            connected_address: session.as_ref().map(|s| s.address.clone()),
            balance_loading: state.balance_loading,
            sequence: state.transfer_status.as_ref().and_then(|s| s.sequence.clone()),
            vaa_ready: state.transfer_status.as_ref().map_or(false, |s| s.vaa.is_some()),
            wallet_name: session
                .as_ref()
                .map(|s| s.wallet_name.clone())
                .or_else(|| self.session.wallet_name().map(str::to_string)),
            network_name,
            provider_detected: self.session.provider_detected(),
            supported_tokens: self.sdk.get_supported_tokens(state.form.source_chain).len(),
        }
    }
}

/// Routes SDK milestones to the attempt that started the SDK call
struct AttemptProgress<'a> {
    orchestrator: &'a BridgeOrchestrator,
    attempt: u64,
}

#[async_trait]
impl ProgressReporter for AttemptProgress<'_> {
    async fn report(&self, step: u8, message: String) {
        let applied = self
            .orchestrator
            .with_attempt(self.attempt, |state| {
                state
                    .transfer_status
                    .as_mut()
                    .map_or(false, |status| status.advance(step, message))
            })
            .await;
        if applied == Some(false) {
            debug!("Ignoring out-of-order milestone {} for attempt {}", step, self.attempt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_uses_defaults() {
        let state = BridgeState::new(&OrchestratorSettings::default());
        assert_eq!(state.form.source_chain, Chain::Ethereum);
        assert_eq!(state.form.target_chain, Chain::Polygon);
        assert_eq!(state.form.token, "USDC");
        assert_eq!(state.token_balance, "0");
        assert!(state.transfer_status.is_none());
        assert!(!state.has_live_transfer());
    }

    #[test]
    fn test_live_transfer_detection() {
        let mut state = BridgeState::new(&OrchestratorSettings::default());
        state.transfer_status = Some(TransferStatus::new(1, Chain::Ethereum, Chain::Polygon));
        assert!(state.has_live_transfer());

        if let Some(status) = state.transfer_status.as_mut() {
            status.fail("Transfer failed: boom");
        }
        assert!(!state.has_live_transfer());
    }
}
