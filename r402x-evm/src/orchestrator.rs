//! Execution orchestrator.
//!
//! [`Executor`] turns a service id into a settled, hook-executed transaction.
//! It walks a strict one-directional state machine:
//!
//! ```text
//! discover → match → prepare → commit → sign → submit → confirm → success | error
//! ```
//!
//! Each transition is announced to the [`EventSink`] before the corresponding
//! work starts. Any failure ends the session with a single error event; there
//! is no retry in place. A fresh attempt is a fresh session with a new salt,
//! and therefore a new commitment and a new authorization.
//!
//! The executor is transport-agnostic: the same session can be observed
//! through a direct callback ([`r402x::event::CallbackSink`]) or as a stream
//! ([`Executor::spawn`]), and the signing capability is chosen by the caller.

use std::sync::Arc;

use alloy_primitives::{Address, B256, TxHash, U256};
use futures_util::Stream;
use r402x::amount::{bips_to_percentage, format_units, parse_units};
use r402x::descriptor::{HookType, SplitRecipient, find_service};
use r402x::error::ExecutionError;
use r402x::event::{EventSink, ProgressEvent, Step, channel};
use r402x::registry::ServiceRegistry;
use r402x::session::ExecutionSession;
use serde::{Deserialize, Serialize};
use serde_json::json;
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::SettlementChain;
use crate::commitment;
use crate::hook::HookData;
use crate::networks::explorer_tx_url;
use crate::params::{
    DEFAULT_VALID_AFTER_SKEW_SECS, DEFAULT_VALIDITY_SECS, SettlementParameters, ValidityWindow,
};
use crate::signer::{SigningMode, SigningStrategy, derive_domain, sign};
use crate::submit::{self, MintSummary, RewardSummary};

/// Tunables of the settlement pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Seconds the authorization stays valid after signing.
    pub validity_seconds: u64,
    /// Seconds `validAfter` is back-dated to tolerate clock skew.
    pub valid_after_skew_seconds: u64,
    /// Stablecoin symbol used in display amounts.
    pub token_symbol: String,
    /// Stablecoin decimals.
    pub token_decimals: u8,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            validity_seconds: DEFAULT_VALIDITY_SECS,
            valid_after_skew_seconds: DEFAULT_VALID_AFTER_SKEW_SECS,
            token_symbol: "USDC".to_owned(),
            token_decimals: 6,
        }
    }
}

/// What to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Registry id of the service.
    pub service_id: String,
    /// Split recipients, for `transfer-split` services only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splits: Option<Vec<SplitRecipient>>,
}

impl ExecutionRequest {
    /// Requests execution of `service_id` without splits.
    #[must_use]
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            splits: None,
        }
    }

    /// Adds split recipients.
    #[must_use]
    pub fn with_splits(mut self, splits: Vec<SplitRecipient>) -> Self {
        self.splits = Some(splits);
        self
    }
}

/// One split recipient as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitShare {
    /// Receiving address.
    pub recipient: Address,
    /// Share in basis points.
    pub bips: u16,
    /// Share as a percentage string, e.g. `"80%"`.
    pub percentage: String,
}

/// Result of a successful execution, carried as `data.transaction` of the
/// success event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    /// Executed service.
    pub service_id: String,
    /// Hook that ran.
    pub hook_type: HookType,
    /// Settlement transaction hash.
    pub tx_hash: TxHash,
    /// Block the settlement was mined in.
    pub block_number: u64,
    /// Amount paid, e.g. `"0.1 USDC"`.
    pub amount: String,
    /// Payment recipient.
    pub pay_to: Address,
    /// Payer.
    pub payer: Address,
    /// Router commitment the payment settled under.
    pub commitment: B256,
    /// Block explorer link, when the network is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Split recipients, for `transfer-split` services.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<SplitShare>,
    /// Rewards credited by a reward-points hook.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rewards: Vec<RewardSummary>,
    /// Tokens minted by an NFT-mint hook.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub minted: Vec<MintSummary>,
}

/// Runs settlement sessions against one chain and one service registry.
#[derive(Clone)]
pub struct Executor {
    registry: Arc<dyn ServiceRegistry>,
    chain: Arc<dyn SettlementChain>,
    config: ExecutorConfig,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Creates an executor with default configuration.
    #[must_use]
    pub fn new(registry: Arc<dyn ServiceRegistry>, chain: Arc<dyn SettlementChain>) -> Self {
        Self {
            registry,
            chain,
            config: ExecutorConfig::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Returns the service registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<dyn ServiceRegistry> {
        &self.registry
    }

    /// Runs one session to completion, reporting every transition to `sink`.
    ///
    /// The sink always receives exactly one terminal event, also on failure.
    ///
    /// # Errors
    ///
    /// Returns the [`ExecutionError`] that terminated the session.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(service_id = %request.service_id, mode = ?signer.mode())))]
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
        signer: &dyn SigningStrategy,
        sink: &dyn EventSink,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let mut session = ExecutionSession::new(sink);
        let result = self.run(&mut session, request, signer).await;
        match &result {
            Ok(outcome) => session.succeed(
                format!(
                    "Paid {} to {} and executed {} hook",
                    outcome.amount, outcome.pay_to, outcome.hook_type
                ),
                json!({ "transaction": outcome }),
            ),
            Err(e) => session.fail(e),
        }
        result
    }

    /// Runs one session on a background task and returns its events as a
    /// stream ending with the terminal event.
    ///
    /// Dropping the stream does not cancel the session.
    pub fn spawn(
        self: &Arc<Self>,
        request: ExecutionRequest,
        signer: Arc<dyn SigningStrategy>,
    ) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        let (sink, rx) = channel();
        let executor = Arc::clone(self);
        tokio::spawn(async move {
            let _ = executor.execute(&request, signer.as_ref(), &sink).await;
        });
        futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }

    async fn run(
        &self,
        session: &mut ExecutionSession<'_>,
        request: &ExecutionRequest,
        signer: &dyn SigningStrategy,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        session.advance(Step::Discover, "Fetching service registry");
        let services = self
            .registry
            .services()
            .await
            .map_err(|e| ExecutionError::Discovery(e.to_string()))?;

        session.advance(
            Step::Match,
            format!("Looking up service '{}'", request.service_id),
        );
        let service = find_service(&services, &request.service_id)
            .cloned()
            .ok_or_else(|| ExecutionError::ServiceNotFound(request.service_id.clone()))?;

        session.advance(
            Step::Prepare,
            format!("Preparing settlement for '{}'", service.title),
        );
        service.validate_addresses()?;
        let splits = request.splits.as_deref();
        let hook_data = HookData::for_service(&service, splits)?;
        let decimals = self.config.token_decimals;
        let value = parse_units(&service.defaults.payment_amount, decimals)?;
        let facilitator_fee = parse_units(&service.defaults.facilitator_fee, decimals)?;
        let payer = signer.address();
        let balance = self
            .chain
            .balance_of(service.stablecoin_address, payer)
            .await?;
        if balance < value {
            return Err(ExecutionError::InsufficientFunds {
                required: self.display(value),
                available: self.display(balance),
            });
        }
        let params = SettlementParameters::builder(service.stablecoin_address, payer, value)
            .pay_to(service.defaults.pay_to)
            .facilitator_fee(facilitator_fee)
            .hook(service.hook_address, &hook_data)
            .window(ValidityWindow::starting_now(
                self.config.valid_after_skew_seconds,
                self.config.validity_seconds,
            ))
            .build();

        session.advance(Step::Commit, "Calculating commitment");
        let router = service.settlement_router_address;
        let settlement = commitment::calculate(self.chain.as_ref(), router, params).await?;

        let mode = signer.mode();
        session.advance(
            Step::Sign,
            match mode {
                SigningMode::HeldKey => "Signing transfer authorization",
                SigningMode::DelegatedWallet => "Requesting transfer authorization from wallet",
            },
        );
        let domain = derive_domain(
            self.chain.as_ref(),
            signer,
            service.stablecoin_address,
            service.chain_id,
        )
        .await?;
        if mode == SigningMode::DelegatedWallet {
            session.note(
                "Waiting for wallet approval",
                Some(json!({ "commitment": settlement.commitment() })),
            );
        }
        let authorization = sign(signer, domain, &settlement).await?;

        session.advance(Step::Submit, "Submitting settlement transaction");
        let tx_hash =
            submit::send_settlement(self.chain.as_ref(), &settlement, &authorization).await?;

        session.advance(
            Step::Confirm,
            format!("Waiting for confirmation of {tx_hash}"),
        );
        let receipt = submit::await_confirmation(self.chain.as_ref(), tx_hash).await?;
        let details = submit::parse_details(&receipt, router);

        let splits = match &hook_data {
            HookData::TransferSplit(splits) => splits
                .iter()
                .map(|split| SplitShare {
                    recipient: split.recipient,
                    bips: split.bips,
                    percentage: bips_to_percentage(split.bips),
                })
                .collect(),
            _ => Vec::new(),
        };
        Ok(ExecutionOutcome {
            service_id: service.id,
            hook_type: hook_data.hook_type(),
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            amount: self.display(value),
            pay_to: service.defaults.pay_to,
            payer,
            commitment: settlement.commitment(),
            explorer_url: explorer_tx_url(service.chain_id, receipt.tx_hash),
            splits,
            rewards: details.rewards,
            minted: details.minted,
        })
    }

    fn display(&self, value: U256) -> String {
        format!(
            "{} {}",
            format_units(value, self.config.token_decimals),
            self.config.token_symbol
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use alloy_primitives::{Log, address};
    use alloy_signer_local::PrivateKeySigner;
    use alloy_sol_types::SolEvent;
    use futures_util::StreamExt;
    use r402x::descriptor::{ServiceDefaults, ServiceDescriptor};
    use r402x::error::ErrorCategory;
    use r402x::event::{CallbackSink, EventKind};
    use r402x::registry::{RegistryError, StaticRegistry};

    use crate::contract::{INftMintHook, IRewardHook};
    use crate::signer::{DelegatedSigner, HeldKeySigner};
    use crate::testing::{MockChain, ROUTER, USDC};

    const NFT: Address = address!("1111111111111111111111111111111111111111");
    const POINTS: Address = address!("3333333333333333333333333333333333333333");
    const HOOK: Address = address!("2222222222222222222222222222222222222222");
    const MERCHANT: Address = address!("cccccccccccccccccccccccccccccccccccccccc");
    const ALICE: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const BOB: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

    fn service(id: &str, hook_type: HookType) -> ServiceDescriptor {
        let supporting_contracts = match hook_type {
            HookType::NftMint => HashMap::from([("nftContract".to_owned(), NFT)]),
            HookType::RewardPoints => HashMap::from([("rewardToken".to_owned(), POINTS)]),
            HookType::TransferSplit => HashMap::new(),
        };
        ServiceDescriptor {
            id: id.to_owned(),
            title: format!("Service {id}"),
            hook_type,
            hook_address: HOOK,
            network: "base-sepolia".to_owned(),
            chain_id: 84532,
            settlement_router_address: ROUTER,
            stablecoin_address: USDC,
            supporting_contracts,
            defaults: ServiceDefaults {
                payment_amount: "0.1".to_owned(),
                facilitator_fee: "0".to_owned(),
                pay_to: MERCHANT,
            },
        }
    }

    struct Harness {
        executor: Executor,
        chain: Arc<MockChain>,
        key: PrivateKeySigner,
    }

    fn harness(services: Vec<ServiceDescriptor>, chain_id: u64) -> Harness {
        let key = PrivateKeySigner::random();
        let chain = Arc::new(MockChain::new(chain_id));
        chain.fund(key.address(), U256::from(1_000_000u64));
        let executor = Executor::new(Arc::new(StaticRegistry::new(services)), chain.clone());
        Harness {
            executor,
            chain,
            key,
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressEvent>>);

    impl Recorder {
        fn sink(self: &Arc<Self>) -> CallbackSink<impl Fn(&ProgressEvent) + Send + Sync> {
            let recorder = Arc::clone(self);
            CallbackSink::new(move |event: &ProgressEvent| {
                recorder.0.lock().unwrap().push(event.clone());
            })
        }

        fn events(&self) -> Vec<ProgressEvent> {
            self.0.lock().unwrap().clone()
        }

        fn steps(&self) -> Vec<Step> {
            let mut steps: Vec<Step> = self.events().iter().filter_map(|e| e.step).collect();
            steps.dedup();
            steps
        }
    }

    const ALL_STEPS: [Step; 7] = [
        Step::Discover,
        Step::Match,
        Step::Prepare,
        Step::Commit,
        Step::Sign,
        Step::Submit,
        Step::Confirm,
    ];

    #[tokio::test]
    async fn test_nft_mint_scenario() {
        let h = harness(vec![service("badge", HookType::NftMint)], 84532);
        h.chain.emit_on_settle(Log {
            address: HOOK,
            data: INftMintHook::NftMinted {
                recipient: h.key.address(),
                nftContract: NFT,
                tokenId: U256::from(1u8),
            }
            .encode_log_data(),
        });
        let recorder = Arc::new(Recorder::default());
        let signer = HeldKeySigner::new(h.key.clone());

        let outcome = h
            .executor
            .execute(&ExecutionRequest::new("badge"), &signer, &recorder.sink())
            .await
            .unwrap();

        assert_eq!(recorder.steps(), ALL_STEPS);
        let events = recorder.events();
        let last = events.last().unwrap();
        assert_eq!(last.kind, EventKind::Success);
        let data = last.data.as_ref().unwrap();
        assert_eq!(data["transaction"]["amount"], "0.1 USDC");
        assert_eq!(data["transaction"]["payTo"], json!(MERCHANT));
        assert!(
            data["transaction"]["explorerUrl"]
                .as_str()
                .unwrap()
                .starts_with("https://sepolia.basescan.org/tx/0x")
        );
        assert_eq!(outcome.minted.len(), 1);
        assert!(h.chain.is_settled(outcome.commitment));
    }

    #[tokio::test]
    async fn test_reward_points_scenario() {
        let h = harness(vec![service("loyalty", HookType::RewardPoints)], 84532);
        h.chain.emit_on_settle(Log {
            address: HOOK,
            data: IRewardHook::RewardsDistributed {
                recipient: h.key.address(),
                rewardToken: POINTS,
                points: U256::from(1_000u64),
            }
            .encode_log_data(),
        });
        let recorder = Arc::new(Recorder::default());
        let signer = HeldKeySigner::new(h.key.clone());

        let outcome = h
            .executor
            .execute(&ExecutionRequest::new("loyalty"), &signer, &recorder.sink())
            .await
            .unwrap();

        assert_eq!(recorder.steps(), ALL_STEPS);
        assert_eq!(outcome.hook_type, HookType::RewardPoints);
        assert_eq!(
            outcome.rewards,
            [RewardSummary {
                recipient: h.key.address(),
                reward_token: POINTS,
                points: "1000".into(),
            }]
        );
        assert!(outcome.minted.is_empty());
        let events = recorder.events();
        let transaction = &events.last().unwrap().data.as_ref().unwrap()["transaction"];
        assert_eq!(transaction["hookType"], "reward-points");
        assert_eq!(transaction["rewards"][0]["points"], "1000");
    }

    #[tokio::test]
    async fn test_split_payment_reports_percentages() {
        let h = harness(vec![service("split", HookType::TransferSplit)], 84532);
        let recorder = Arc::new(Recorder::default());
        let signer = HeldKeySigner::new(h.key.clone());
        let request = ExecutionRequest::new("split").with_splits(vec![
            SplitRecipient::new(ALICE, 8000),
            SplitRecipient::new(BOB, 2000),
        ]);

        h.executor
            .execute(&request, &signer, &recorder.sink())
            .await
            .unwrap();

        let events = recorder.events();
        let splits = &events.last().unwrap().data.as_ref().unwrap()["transaction"]["splits"];
        assert_eq!(splits[0]["percentage"], "80%");
        assert_eq!(splits[1]["percentage"], "20%");
    }

    #[tokio::test]
    async fn test_user_rejection_stops_before_submission() {
        let h = harness(vec![service("badge", HookType::NftMint)], 84532);
        let (signer, mut requests) = DelegatedSigner::channel(h.key.address(), 84532, 1);
        tokio::spawn(async move {
            let request = requests.recv().await.unwrap();
            request.reject("User denied message signature");
        });
        let recorder = Arc::new(Recorder::default());

        let err = h
            .executor
            .execute(&ExecutionRequest::new("badge"), &signer, &recorder.sink())
            .await
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::UserRejected);
        let events = recorder.events();
        let last = events.last().unwrap();
        assert_eq!(last.kind, EventKind::Error);
        assert_eq!(last.step, Some(Step::Sign));
        assert!(last.message.contains("rejected"));
        assert_eq!(last.data.as_ref().unwrap()["category"], "user_rejected");
        assert_eq!(h.chain.sent(), 0);
    }

    #[tokio::test]
    async fn test_expired_authorization_is_an_onchain_revert() {
        let h = harness(vec![service("badge", HookType::NftMint)], 84532);
        let executor = h.executor.clone().with_config(ExecutorConfig {
            validity_seconds: 0,
            ..ExecutorConfig::default()
        });
        let recorder = Arc::new(Recorder::default());
        let signer = HeldKeySigner::new(h.key.clone());

        let err = executor
            .execute(&ExecutionRequest::new("badge"), &signer, &recorder.sink())
            .await
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::OnchainRevert);
        assert!(err.to_string().contains("expired"));
        assert_eq!(recorder.events().last().unwrap().step, Some(Step::Submit));
    }

    #[tokio::test]
    async fn test_chain_mismatch_never_prompts_wallet() {
        let h = harness(vec![service("badge", HookType::NftMint)], 8453);
        let (signer, mut requests) = DelegatedSigner::channel(h.key.address(), 84532, 1);
        let recorder = Arc::new(Recorder::default());

        let err = h
            .executor
            .execute(&ExecutionRequest::new("badge"), &signer, &recorder.sink())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ExecutionError::ChainMismatch {
                expected: 84532,
                actual: 8453,
            }
        );
        assert_eq!(err.category(), ErrorCategory::ChainMismatch);
        assert!(requests.try_recv().is_err());
        assert_eq!(recorder.events().last().unwrap().step, Some(Step::Sign));
    }

    #[tokio::test]
    async fn test_wallet_on_other_network_is_never_prompted() {
        let h = harness(vec![service("badge", HookType::NftMint)], 84532);
        let (signer, mut requests) = DelegatedSigner::channel(h.key.address(), 8453, 1);
        let recorder = Arc::new(Recorder::default());

        let err = h
            .executor
            .execute(&ExecutionRequest::new("badge"), &signer, &recorder.sink())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ExecutionError::ChainMismatch {
                expected: 84532,
                actual: 8453,
            }
        );
        assert!(requests.try_recv().is_err());
        assert_eq!(recorder.events().last().unwrap().step, Some(Step::Sign));
        assert_eq!(h.chain.sent(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_funds_fails_before_commitment() {
        let h = harness(vec![service("badge", HookType::NftMint)], 84532);
        let signer = HeldKeySigner::new(PrivateKeySigner::random());
        let recorder = Arc::new(Recorder::default());

        let err = h
            .executor
            .execute(&ExecutionRequest::new("badge"), &signer, &recorder.sink())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ExecutionError::InsufficientFunds {
                required: "0.1 USDC".into(),
                available: "0 USDC".into(),
            }
        );
        assert_eq!(h.chain.commitment_calls(), 0);
        assert_eq!(recorder.events().last().unwrap().step, Some(Step::Prepare));
    }

    #[tokio::test]
    async fn test_missing_supporting_contract_is_a_validation_error() {
        let mut broken = service("badge", HookType::NftMint);
        broken.supporting_contracts.clear();
        let h = harness(vec![broken], 84532);
        let signer = HeldKeySigner::new(h.key.clone());
        let recorder = Arc::new(Recorder::default());

        let err = h
            .executor
            .execute(&ExecutionRequest::new("badge"), &signer, &recorder.sink())
            .await
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(recorder.events().last().unwrap().step, Some(Step::Prepare));
        assert_eq!(h.chain.commitment_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_service_is_a_discovery_error() {
        let h = harness(vec![service("badge", HookType::NftMint)], 84532);
        let signer = HeldKeySigner::new(h.key.clone());
        let recorder = Arc::new(Recorder::default());

        let err = h
            .executor
            .execute(&ExecutionRequest::new("nope"), &signer, &recorder.sink())
            .await
            .unwrap_err();

        assert_eq!(err, ExecutionError::ServiceNotFound("nope".into()));
        assert_eq!(recorder.steps(), [Step::Discover, Step::Match]);
    }

    struct DownRegistry;

    impl ServiceRegistry for DownRegistry {
        fn services(
            &self,
        ) -> std::pin::Pin<
            Box<
                dyn std::future::Future<
                        Output = Result<Vec<ServiceDescriptor>, RegistryError>,
                    > + Send
                    + '_,
            >,
        > {
            Box::pin(async { Err(RegistryError::Transport("connection refused".into())) })
        }
    }

    #[tokio::test]
    async fn test_registry_outage_is_a_discovery_error() {
        let chain = Arc::new(MockChain::new(84532));
        let executor = Executor::new(Arc::new(DownRegistry), chain);
        let signer = HeldKeySigner::new(PrivateKeySigner::random());
        let recorder = Arc::new(Recorder::default());

        let err = executor
            .execute(&ExecutionRequest::new("badge"), &signer, &recorder.sink())
            .await
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Discovery);
        assert_eq!(recorder.events().len(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_new_sessions_with_new_commitments() {
        let h = harness(vec![service("badge", HookType::NftMint)], 84532);
        let signer = HeldKeySigner::new(h.key.clone());
        let recorder = Arc::new(Recorder::default());
        let request = ExecutionRequest::new("badge");

        let first = h
            .executor
            .execute(&request, &signer, &recorder.sink())
            .await
            .unwrap();
        let second = h
            .executor
            .execute(&request, &signer, &recorder.sink())
            .await
            .unwrap();

        assert_ne!(first.commitment, second.commitment);
        assert_eq!(h.chain.sent(), 2);
    }

    #[tokio::test]
    async fn test_spawn_streams_events_until_terminal() {
        let h = harness(vec![service("split", HookType::TransferSplit)], 84532);
        let executor = Arc::new(h.executor);
        let signer: Arc<dyn SigningStrategy> = Arc::new(HeldKeySigner::new(h.key.clone()));

        let events: Vec<ProgressEvent> = executor
            .spawn(ExecutionRequest::new("split"), signer)
            .collect()
            .await;

        assert_eq!(events.len(), ALL_STEPS.len() + 1);
        assert_eq!(events.last().unwrap().kind, EventKind::Success);
        assert!(events[..ALL_STEPS.len()].iter().all(|e| e.kind == EventKind::Progress));
    }
}
