//! Integration tests cho BridgeOrchestrator.
//! Ví, SDK và prompter đều là bản giả lập; dịch vụ VAA dùng mockall.

use async_trait::async_trait;
use mockall::{mock, Sequence};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio_test::assert_ok;

use blockchain::processor::bridge_orchestrator::VAA_NOT_READY_MESSAGE;
use blockchain::{
    ApprovalOutcome, BridgeOrchestrator, GateWarning, Notice, OrchestratorSettings, PrimaryAction,
    Prompt, Prompter, SettlementPolicy, TransferOutcome,
};
use common::{
    AttestationKey, AttestationLookup, AttestationSource, BridgeError, BridgeQuote, BridgeSdk,
    Chain, ChainRegistry, ProgressReporter, SupportedToken, TransactionCall, TransactionSigner,
    TransferReceipt, TransferRequest, TransferStatus, COMPLETED_MESSAGE,
};
use wallet::{
    ProviderFlags, SessionChange, SessionManager, WalletError, WalletEvent, WalletProvider,
};

const ALICE: &str = "0x1111111111111111111111111111111111111111";
const RECIPIENT: &str = "0x000000000000000000000000000000000000dEaD";
const TX_HASH: &str = "0x5f1c7a0c6a6bd2f1d8e3a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f9";
const TOKEN_BRIDGE: &str = "0x3ee18B2214AFF97000D974cf647E7C347E8fa585";
const VAA: &str = "AQAAAAMNAHxBaW5zZXJ0ZWQgdmFh";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeWallet {
    chain: Mutex<String>,
    connect_error: Option<i64>,
    events: broadcast::Sender<WalletEvent>,
}

impl FakeWallet {
    fn on_chain(chain_id: &str) -> Self {
        let (events, _) = broadcast::channel(8);
        Self { chain: Mutex::new(chain_id.to_string()), connect_error: None, events }
    }

    fn chain(&self) -> String {
        self.chain.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn request(&self, method: &str, params: Value) -> wallet::Result<Value> {
        match method {
            "eth_requestAccounts" => match self.connect_error {
                Some(code) => Err(WalletError::Rejected { code, message: "rejected".into() }),
                None => Ok(json!([ALICE])),
            },
            "eth_accounts" => Ok(json!([ALICE])),
            "eth_chainId" => Ok(json!(self.chain())),
            "wallet_switchEthereumChain" => {
                let wanted = params[0]["chainId"].as_str().unwrap_or_default().to_string();
                *self.chain.lock().unwrap() = wanted;
                Ok(Value::Null)
            }
            "eth_sendTransaction" => Ok(json!(TX_HASH)),
            other => Err(WalletError::Rejected { code: -32601, message: format!("{} unsupported", other) }),
        }
    }

    fn flags(&self) -> ProviderFlags {
        ProviderFlags { is_metamask: true, ..Default::default() }
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

struct FakeSdk {
    balance: Mutex<String>,
    allowance: Mutex<String>,
    fail_balance: AtomicBool,
    fail_quote: AtomicBool,
    fail_transfer: bool,
    quote_requests: Mutex<Vec<TransferRequest>>,
    transfers: Mutex<Vec<TransferRequest>>,
    /// (entered, release): park `initiate_transfer` until released
    hold: Option<(Arc<Notify>, Arc<Notify>)>,
    /// same for `get_bridge_quote`
    quote_hold: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FakeSdk {
    fn with_funds(balance: &str, allowance: &str) -> Self {
        Self {
            balance: Mutex::new(balance.to_string()),
            allowance: Mutex::new(allowance.to_string()),
            fail_balance: AtomicBool::new(false),
            fail_quote: AtomicBool::new(false),
            fail_transfer: false,
            quote_requests: Mutex::new(Vec::new()),
            transfers: Mutex::new(Vec::new()),
            hold: None,
            quote_hold: None,
        }
    }

    fn quote_requests(&self) -> Vec<TransferRequest> {
        self.quote_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BridgeSdk for FakeSdk {
    async fn get_token_balance(&self, _chain: Chain, _token: &str, _owner: &str) -> common::Result<String> {
        if self.fail_balance.load(Ordering::SeqCst) {
            return Err(BridgeError::Rpc("node unavailable".into()));
        }
        Ok(self.balance.lock().unwrap().clone())
    }

    async fn check_token_allowance(&self, _chain: Chain, _token: &str, _owner: &str) -> common::Result<String> {
        Ok(self.allowance.lock().unwrap().clone())
    }

    fn get_supported_tokens(&self, _chain: Chain) -> Vec<SupportedToken> {
        ["USDC", "USDT"]
            .iter()
            .map(|symbol| SupportedToken {
                symbol: symbol.to_string(),
                name: symbol.to_string(),
                address: TOKEN_BRIDGE.to_string(),
                decimals: 6,
            })
            .collect()
    }

    async fn get_bridge_quote(&self, request: &TransferRequest) -> common::Result<BridgeQuote> {
        self.quote_requests.lock().unwrap().push(request.clone());
        if let Some((entered, release)) = &self.quote_hold {
            entered.notify_one();
            release.notified().await;
        }
        if self.fail_quote.load(Ordering::SeqCst) {
            return Err(BridgeError::Rpc("quote service down".into()));
        }
        Ok(BridgeQuote::new("0.0".into(), "ETH".into(), 19, "Wormhole Token Bridge".into()))
    }

    async fn approve_token(
        &self,
        signer: Arc<dyn TransactionSigner>,
        chain: Chain,
        _token: &str,
        amount: &str,
    ) -> common::Result<String> {
        let tx_hash = signer
            .send_transaction(TransactionCall {
                chain_id: chain.descriptor().chain_id,
                from: signer.address(),
                to: TOKEN_BRIDGE.into(),
                data: vec![0x09, 0x5e, 0xa7, 0xb3],
                value: 0,
            })
            .await?;
        *self.allowance.lock().unwrap() = amount.to_string();
        Ok(tx_hash)
    }

    async fn wait_for_transaction(&self, _chain: Chain, _tx_hash: &str) -> common::Result<()> {
        Ok(())
    }

    async fn initiate_transfer(
        &self,
        signer: Arc<dyn TransactionSigner>,
        request: &TransferRequest,
        progress: &dyn ProgressReporter,
    ) -> common::Result<TransferReceipt> {
        self.transfers.lock().unwrap().push(request.clone());
        progress.report(1, "Preparing transfer...".into()).await;

        if let Some((entered, release)) = &self.hold {
            entered.notify_one();
            release.notified().await;
        }
        if self.fail_transfer {
            return Err(BridgeError::Wallet("User denied transaction signature".into()));
        }

        let tx_hash = signer
            .send_transaction(TransactionCall {
                chain_id: request.source_chain.descriptor().chain_id,
                from: signer.address(),
                to: TOKEN_BRIDGE.into(),
                data: vec![0x0f, 0x52, 0x87, 0xb0],
                value: 0,
            })
            .await?;
        progress.report(2, "Transaction confirmed on source chain".into()).await;
        // milestone arriving late must not move the status backwards
        progress.report(1, "late milestone".into()).await;

        Ok(TransferReceipt {
            tx_hash,
            sequence: "42".into(),
            emitter: Some("0000000000000000000000003ee18b2214aff97000d974cf647e7c347e8fa585".into()),
        })
    }

    fn provider_name(&self) -> &str {
        "fake"
    }
}

mock! {
    Attestations {}

    #[async_trait]
    impl AttestationSource for Attestations {
        async fn fetch_attestation(&self, key: &AttestationKey) -> common::Result<AttestationLookup>;
    }
}

fn vaa_ready() -> MockAttestations {
    let mut attestations = MockAttestations::new();
    attestations
        .expect_fetch_attestation()
        .returning(|_| Ok(AttestationLookup::Available(VAA.into())));
    attestations
}

struct StaticPrompter {
    accept: bool,
    prompts: Mutex<Vec<Prompt>>,
    notices: Mutex<Vec<Notice>>,
    /// (entered, release): keep `confirm` open until released
    hold: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl StaticPrompter {
    fn answering(accept: bool) -> Self {
        Self { accept, prompts: Mutex::new(Vec::new()), notices: Mutex::new(Vec::new()), hold: None }
    }
}

#[async_trait]
impl Prompter for StaticPrompter {
    async fn confirm(&self, prompt: &Prompt) -> bool {
        self.prompts.lock().unwrap().push(prompt.clone());
        if let Some((entered, release)) = &self.hold {
            entered.notify_one();
            release.notified().await;
        }
        self.accept
    }

    async fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    orchestrator: Arc<BridgeOrchestrator>,
    wallet: Arc<FakeWallet>,
    sdk: Arc<FakeSdk>,
    prompter: Arc<StaticPrompter>,
}

struct Setup {
    wallet: FakeWallet,
    sdk: FakeSdk,
    attestations: MockAttestations,
    prompter: StaticPrompter,
    settings: OrchestratorSettings,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            wallet: FakeWallet::on_chain("0x1"),
            sdk: FakeSdk::with_funds("150", "200"),
            attestations: vaa_ready(),
            prompter: StaticPrompter::answering(true),
            settings: OrchestratorSettings::default(),
        }
    }
}

impl Setup {
    fn build(self) -> Harness {
        let wallet = Arc::new(self.wallet);
        let sdk = Arc::new(self.sdk);
        let prompter = Arc::new(self.prompter);
        let session = SessionManager::new(Some(wallet.clone() as Arc<dyn WalletProvider>));
        let orchestrator = BridgeOrchestrator::new(
            Arc::new(ChainRegistry::defaults()),
            Arc::new(session),
            sdk.clone(),
            Arc::new(self.attestations),
            prompter.clone(),
            self.settings,
        );
        Harness { orchestrator, wallet, sdk, prompter }
    }

    /// Connected on Ethereum with the 100 USDC form filled in
    async fn ready(self) -> Harness {
        let harness = self.build();
        assert!(harness.orchestrator.connect_wallet().await.is_some());
        harness.orchestrator.set_amount("100").await;
        harness.orchestrator.set_recipient(RECIPIENT).await;
        harness
    }
}

fn drain(rx: &mut broadcast::Receiver<TransferStatus>) -> Vec<TransferStatus> {
    let mut history = Vec::new();
    while let Ok(status) = rx.try_recv() {
        history.push(status);
    }
    history
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_happy_path_walks_all_steps_and_completes() {
    let mut attestations = MockAttestations::new();
    attestations
        .expect_fetch_attestation()
        .withf(|key| key.wormhole_chain_id == 2 && key.sequence == "42" && key.tx_hash == TX_HASH)
        .times(1)
        .returning(|_| Ok(AttestationLookup::Available(VAA.into())));
    let h = Setup { attestations, ..Default::default() }.ready().await;

    let gate = h.orchestrator.gate().await;
    assert!(gate.can_transfer());

    let mut statuses = h.orchestrator.subscribe_status();
    let outcome = h.orchestrator.transfer().await;

    let status = match outcome {
        TransferOutcome::Completed(status) => status,
        other => panic!("expected completion, got {:?}", other),
    };
    assert!(status.completed);
    assert!(!status.settlement_verified);
    assert_eq!(status.message, COMPLETED_MESSAGE);
    assert_eq!(status.vaa.as_deref(), Some(VAA));

    let history = drain(&mut statuses);
    let steps: Vec<u8> = history.iter().map(|s| s.step).collect();
    assert!(steps.windows(2).all(|w| w[0] <= w[1]), "steps went backwards: {:?}", steps);
    for step in 1..=4 {
        assert!(steps.contains(&step), "step {} never observed: {:?}", step, steps);
    }
    assert!(history.iter().all(|s| s.message != "late milestone"));
    assert!(history.last().map_or(false, |s| s.completed));

    let state = h.orchestrator.state().await;
    assert!(!state.transferring);
    assert!(state.error.is_none());
    assert_eq!(
        h.orchestrator.explorer_tx_url().await,
        Some(format!("{}/tx/{}", Chain::Ethereum.descriptor().explorer_url.trim_end_matches('/'), TX_HASH))
    );

    let prompts = h.prompter.prompts.lock().unwrap().clone();
    assert!(matches!(&prompts[..], [Prompt::ConfirmTransfer { summary }] if summary.contains("100 USDC")));
}

#[tokio::test(start_paused = true)]
async fn test_insufficient_balance_blocks_without_status() {
    let h = Setup { sdk: FakeSdk::with_funds("50", "200"), ..Default::default() }.ready().await;

    let gate = h.orchestrator.gate().await;
    assert_eq!(gate.action, PrimaryAction::Transfer);
    assert!(!gate.enabled);
    assert!(gate.has_warning(&GateWarning::InsufficientBalance {
        available: "50.0000".into(),
        token: "USDC".into(),
    }));

    let outcome = h.orchestrator.transfer().await;
    assert!(matches!(outcome, TransferOutcome::Blocked(_)));
    assert!(h.orchestrator.state().await.transfer_status.is_none());
    assert!(h.sdk.transfers.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_declined_confirmation_creates_no_status() {
    let h = Setup { prompter: StaticPrompter::answering(false), ..Default::default() }.ready().await;

    assert_eq!(h.orchestrator.transfer().await, TransferOutcome::Declined);
    assert!(h.orchestrator.state().await.transfer_status.is_none());
    assert!(h.sdk.transfers.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sdk_failure_marks_status_failed() {
    let mut sdk = FakeSdk::with_funds("150", "200");
    sdk.fail_transfer = true;
    let h = Setup { sdk, attestations: MockAttestations::new(), ..Default::default() }.ready().await;

    let outcome = h.orchestrator.transfer().await;
    let expected = "Transfer failed: User denied transaction signature";
    assert_eq!(outcome, TransferOutcome::Failed(expected.into()));

    let state = h.orchestrator.state().await;
    let status = state.transfer_status.unwrap();
    assert_eq!(status.error.as_deref(), Some(expected));
    assert_eq!(status.step, 1);
    assert!(!status.completed);
    assert_eq!(state.error.as_deref(), Some(expected));
    assert!(!state.transferring);
}

#[tokio::test(start_paused = true)]
async fn test_missing_vaa_is_resumable() {
    let mut attestations = MockAttestations::new();
    let mut seq = Sequence::new();
    attestations
        .expect_fetch_attestation()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(AttestationLookup::NotYetAvailable));
    attestations
        .expect_fetch_attestation()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(AttestationLookup::Available(VAA.into())));
    let h = Setup { attestations, ..Default::default() }.ready().await;

    assert_eq!(h.orchestrator.transfer().await, TransferOutcome::AwaitingAttestation);
    let state = h.orchestrator.state().await;
    assert_eq!(state.error.as_deref(), Some(VAA_NOT_READY_MESSAGE));
    let status = state.transfer_status.unwrap();
    assert_eq!(status.step, 3);
    assert!(status.error.is_none());
    assert!(status.awaiting_attestation());
    assert_eq!(h.orchestrator.diagnostics().await.sequence.as_deref(), Some("42"));

    let outcome = h.orchestrator.resume_monitoring().await;
    assert!(matches!(outcome, TransferOutcome::Completed(ref s) if s.completed));
    assert!(h.orchestrator.state().await.error.is_none());
    assert!(h.orchestrator.diagnostics().await.vaa_ready);

    assert_eq!(h.orchestrator.resume_monitoring().await, TransferOutcome::NothingToResume);
}

#[tokio::test(start_paused = true)]
async fn test_gate_rechecked_after_confirmation() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut prompter = StaticPrompter::answering(true);
    prompter.hold = Some((entered.clone(), release.clone()));
    let h = Setup { prompter, attestations: MockAttestations::new(), ..Default::default() }.ready().await;

    let orchestrator = h.orchestrator.clone();
    let running = tokio::spawn(async move { orchestrator.transfer().await });
    entered.notified().await;

    // balance drops while the confirmation is still open
    *h.sdk.balance.lock().unwrap() = "50".to_string();
    h.orchestrator.refresh_balances().await;
    release.notify_one();

    let report = match running.await.unwrap() {
        TransferOutcome::Blocked(report) => report,
        other => panic!("expected the transfer to be blocked, got {:?}", other),
    };
    assert!(report.has_warning(&GateWarning::InsufficientBalance {
        available: "50.0000".into(),
        token: "USDC".into(),
    }));
    assert!(h.orchestrator.state().await.transfer_status.is_none());
    assert!(h.sdk.transfers.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_attestation_error_is_terminal() {
    let mut attestations = MockAttestations::new();
    attestations
        .expect_fetch_attestation()
        .returning(|_| Err(BridgeError::Http("503 Service Unavailable".into())));
    let h = Setup { attestations, ..Default::default() }.ready().await;

    let outcome = h.orchestrator.transfer().await;
    let expected = "Transfer monitoring failed: HTTP error: 503 Service Unavailable";
    assert_eq!(outcome, TransferOutcome::Failed(expected.into()));

    let status = h.orchestrator.state().await.transfer_status.unwrap();
    assert!(status.is_terminal());
    assert_eq!(status.step, 3);
    assert_eq!(h.orchestrator.resume_monitoring().await, TransferOutcome::NothingToResume);
}

#[tokio::test(start_paused = true)]
async fn test_await_redeem_waits_for_confirmation() {
    let settings = OrchestratorSettings { settlement: SettlementPolicy::AwaitRedeem, ..Default::default() };
    let h = Setup { settings, ..Default::default() }.ready().await;

    let outcome = h.orchestrator.transfer().await;
    let status = match outcome {
        TransferOutcome::AwaitingSettlement(status) => status,
        other => panic!("expected to wait for settlement, got {:?}", other),
    };
    assert_eq!(status.step, 4);
    assert!(!status.completed);

    let settled = h.orchestrator.confirm_settlement().await.unwrap();
    assert!(settled.completed);
    assert!(settled.settlement_verified);
    assert_eq!(settled.message, COMPLETED_MESSAGE);
    assert!(h.orchestrator.confirm_settlement().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reset_discards_in_flight_attempt() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut sdk = FakeSdk::with_funds("150", "200");
    sdk.hold = Some((entered.clone(), release.clone()));
    let h = Setup { sdk, attestations: MockAttestations::new(), ..Default::default() }.ready().await;

    let orchestrator = h.orchestrator.clone();
    let running = tokio::spawn(async move { orchestrator.transfer().await });
    entered.notified().await;

    let state = h.orchestrator.state().await;
    assert!(state.transferring);
    assert_eq!(state.transfer_status.as_ref().map(|s| s.step), Some(1));
    // nothing else may start while the attempt is in flight
    assert!(matches!(h.orchestrator.transfer().await, TransferOutcome::Blocked(_)));

    h.orchestrator.reset().await;
    release.notify_one();
    assert_eq!(running.await.unwrap(), TransferOutcome::Superseded);

    let state = h.orchestrator.state().await;
    assert!(state.transfer_status.is_none());
    assert!(state.error.is_none());
    assert!(state.form.amount.is_empty());
    assert!(state.form.recipient.is_empty());
    assert!(!state.transferring);
}

// ---------------------------------------------------------------------------
// Network switch & approval
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_wrong_network_prompts_switch() {
    let h = Setup { wallet: FakeWallet::on_chain("0x89"), ..Default::default() }.ready().await;

    let gate = h.orchestrator.gate().await;
    assert!(!gate.correct_network);
    assert!(gate.has_warning(&GateWarning::WrongNetwork { chain_name: "Ethereum".into() }));

    assert_eq!(h.orchestrator.transfer().await, TransferOutcome::NetworkSwitched);
    assert_eq!(h.wallet.chain(), "0x1");
    assert!(h.orchestrator.state().await.transfer_status.is_none());
    assert_eq!(
        h.prompter.prompts.lock().unwrap().first(),
        Some(&Prompt::SwitchNetwork { chain_name: "Ethereum".into(), purpose: "initiate transfer".into() })
    );

    assert!(matches!(h.orchestrator.transfer().await, TransferOutcome::Completed(_)));
}

#[tokio::test(start_paused = true)]
async fn test_declined_switch_keeps_network() {
    let h = Setup {
        wallet: FakeWallet::on_chain("0x89"),
        prompter: StaticPrompter::answering(false),
        ..Default::default()
    }
    .ready()
    .await;

    assert_eq!(h.orchestrator.transfer().await, TransferOutcome::Declined);
    assert_eq!(h.wallet.chain(), "0x89");
    assert!(h.orchestrator.state().await.transfer_status.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_approval_unlocks_transfer() {
    let h = Setup { sdk: FakeSdk::with_funds("150", "0"), ..Default::default() }.ready().await;

    let gate = h.orchestrator.gate().await;
    assert_eq!(gate.action, PrimaryAction::Approve);
    assert!(gate.can_approve());
    assert!(matches!(h.orchestrator.transfer().await, TransferOutcome::Blocked(_)));

    let outcome = h.orchestrator.approve().await;
    assert_eq!(outcome, ApprovalOutcome::Approved { tx_hash: TX_HASH.into() });
    assert_eq!(h.orchestrator.state().await.allowance, "100");
    assert!(h.orchestrator.gate().await.can_transfer());

    let notices = h.prompter.notices.lock().unwrap().clone();
    assert!(matches!(
        &notices[..],
        [Notice::ApprovalConfirmed { tx_hash, explorer_url }]
            if tx_hash == TX_HASH && explorer_url.ends_with(TX_HASH)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_approve_without_need_is_blocked() {
    let h = Setup::default().ready().await;
    assert!(matches!(h.orchestrator.approve().await, ApprovalOutcome::Blocked(_)));
}

// ---------------------------------------------------------------------------
// Quotes, balances, form
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_quote_is_debounced_last_write_wins() {
    let h = Setup::default().build();
    h.orchestrator.connect_wallet().await.unwrap();
    h.orchestrator.set_recipient(RECIPIENT).await;

    h.orchestrator.set_amount("1").await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    h.orchestrator.set_amount("10").await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    h.orchestrator.set_amount("100").await;
    assert!(h.sdk.quote_requests().is_empty());

    tokio::time::sleep(Duration::from_secs(3)).await;
    let requests = h.sdk.quote_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, "100");
    assert_eq!(requests[0].sender, ALICE);
    assert!(h.orchestrator.state().await.quote.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_balance_failure_keeps_previous_values() {
    let h = Setup::default().ready().await;
    assert_eq!(h.orchestrator.state().await.token_balance, "150");

    h.sdk.fail_balance.store(true, Ordering::SeqCst);
    h.orchestrator.refresh_balances().await;

    let state = h.orchestrator.state().await;
    assert_eq!(state.error.as_deref(), Some("Failed to load balance: RPC error: node unavailable"));
    assert_eq!(state.token_balance, "150");
    assert_eq!(state.allowance, "200");
    assert!(!state.balance_loading);

    h.sdk.fail_balance.store(false, Ordering::SeqCst);
    *h.sdk.balance.lock().unwrap() = "175".to_string();
    h.orchestrator.refresh_balances().await;

    let state = h.orchestrator.state().await;
    assert_eq!(state.token_balance, "175");
    assert!(state.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_quote_error_cleared_by_next_quote() {
    let h = Setup::default().ready().await;

    h.sdk.fail_quote.store(true, Ordering::SeqCst);
    assert!(h.orchestrator.refresh_quote().await.is_none());
    let state = h.orchestrator.state().await;
    assert_eq!(state.error.as_deref(), Some("Failed to get quote: RPC error: quote service down"));
    assert!(!state.quote_loading);

    h.sdk.fail_quote.store(false, Ordering::SeqCst);
    assert!(h.orchestrator.refresh_quote().await.is_some());
    let state = h.orchestrator.state().await;
    assert!(state.error.is_none());
    assert!(state.quote.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_transfer_error_survives_balance_refresh() {
    let mut sdk = FakeSdk::with_funds("150", "200");
    sdk.fail_transfer = true;
    let h = Setup { sdk, attestations: MockAttestations::new(), ..Default::default() }.ready().await;

    assert!(matches!(h.orchestrator.transfer().await, TransferOutcome::Failed(_)));
    h.orchestrator.refresh_balances().await;
    assert_eq!(
        h.orchestrator.state().await.error.as_deref(),
        Some("Transfer failed: User denied transaction signature")
    );
}

#[tokio::test(start_paused = true)]
async fn test_quote_loading_settles_when_amount_cleared() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut sdk = FakeSdk::with_funds("150", "200");
    sdk.quote_hold = Some((entered.clone(), release.clone()));
    let h = Setup { sdk, ..Default::default() }.ready().await;

    // debounced fetch for "100" is now parked in the SDK
    entered.notified().await;
    assert!(h.orchestrator.state().await.quote_loading);

    h.orchestrator.set_amount("").await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    release.notify_one();
    tokio::time::sleep(Duration::from_secs(10)).await;

    let state = h.orchestrator.state().await;
    assert!(state.form.amount.is_empty());
    assert!(!state.quote_loading);
    assert!(state.quote.is_none());
    assert_eq!(h.sdk.quote_requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_form_helpers() {
    let h = Setup::default().ready().await;

    assert_eq!(h.orchestrator.max_amount().await, "148.5");
    assert_eq!(h.orchestrator.use_max_amount().await, "148.5");
    assert_eq!(h.orchestrator.state().await.form.amount, "148.5");

    assert_ok!(h.orchestrator.set_source_chain(Chain::Polygon).await);
    let form = h.orchestrator.state().await.form;
    assert_eq!((form.source_chain, form.target_chain), (Chain::Polygon, Chain::Ethereum));

    assert!(h.orchestrator.set_target_chain(Chain::Polygon).await.is_err());
    h.orchestrator.swap_chains().await;
    let form = h.orchestrator.state().await.form;
    assert_eq!((form.source_chain, form.target_chain), (Chain::Ethereum, Chain::Polygon));

    assert_ok!(h.orchestrator.set_token("usdt").await);
    assert_eq!(h.orchestrator.state().await.form.token, "USDT");
    assert!(matches!(
        h.orchestrator.set_token("DAI").await,
        Err(BridgeError::UnsupportedToken { .. })
    ));

    assert_eq!(h.orchestrator.use_own_address_as_recipient().await.as_deref(), Some(ALICE));
    assert!(!h.orchestrator.target_options().await.contains(&Chain::Ethereum));
}

// ---------------------------------------------------------------------------
// Wallet session
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_rejected_connection_sets_banner() {
    let mut wallet = FakeWallet::on_chain("0x1");
    wallet.connect_error = Some(4001);
    let h = Setup { wallet, ..Default::default() }.build();

    assert!(h.orchestrator.connect_wallet().await.is_none());
    assert_eq!(
        h.orchestrator.state().await.error.as_deref(),
        Some("Connection rejected. Please try again and approve the connection.")
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_wallet_reports_install_hint() {
    let orchestrator = BridgeOrchestrator::new(
        Arc::new(ChainRegistry::defaults()),
        Arc::new(SessionManager::new(None)),
        Arc::new(FakeSdk::with_funds("0", "0")),
        Arc::new(MockAttestations::new()),
        Arc::new(StaticPrompter::answering(true)),
        OrchestratorSettings::default(),
    );

    assert!(orchestrator.connect_wallet().await.is_none());
    let error = orchestrator.state().await.error.unwrap();
    assert!(error.starts_with("Web3 wallet not found!"));

    let diagnostics = orchestrator.diagnostics().await;
    assert!(!diagnostics.provider_detected);
    assert_eq!(diagnostics.network_name, "Unknown");
    assert_eq!(orchestrator.gate().await.action, PrimaryAction::Connect);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_clears_wallet_state() {
    let h = Setup::default().ready().await;
    assert!(matches!(h.orchestrator.transfer().await, TransferOutcome::Completed(_)));

    h.orchestrator.disconnect_wallet().await;
    let state = h.orchestrator.state().await;
    assert_eq!(state.token_balance, "0");
    assert_eq!(state.allowance, "0");
    assert!(state.quote.is_none());
    assert!(state.transfer_status.is_none());
    assert!(h.orchestrator.diagnostics().await.connected_address.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_wallet_events_drive_state() {
    let h = Setup::default().ready().await;

    let diagnostics = h.orchestrator.diagnostics().await;
    assert_eq!(diagnostics.network_name, "Ethereum");
    assert_eq!(diagnostics.wallet_name.as_deref(), Some("MetaMask"));
    assert_eq!(diagnostics.supported_tokens, 2);

    h.wallet.events.send(WalletEvent::ChainChanged("0x89".into())).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let gate = h.orchestrator.gate().await;
    assert!(!gate.correct_network);
    assert_eq!(h.orchestrator.diagnostics().await.network_name, "Polygon");

    let change = h.orchestrator.handle_wallet_event(WalletEvent::AccountsChanged(vec![])).await;
    assert_eq!(change, SessionChange::Disconnected);
    assert_eq!(h.orchestrator.state().await.token_balance, "0");
    assert_eq!(h.orchestrator.gate().await.action, PrimaryAction::Connect);
}
