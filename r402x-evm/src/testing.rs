//! In-memory settlement chain for unit tests.
//!
//! Mirrors the router's observable behavior: commitments are a pure function
//! of the parameters, `settleAndExecute` checks the validity window, the
//! commitment, the payer's EIP-712 signature and balance, and each commitment
//! settles at most once.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use alloy_primitives::{Address, B256, Bytes, Log, Signature, TxHash, U256, address, keccak256};
use alloy_sol_types::{SolCall, SolEvent};
use r402x::timestamp::UnixTimestamp;

use crate::chain::{ChainError, ChainFuture, SettlementChain, SettlementReceipt, TokenDomain};
use crate::contract::ISettlementRouter;
use crate::params::SettlementParameters;
use crate::signer::{AuthorizationDomain, TransferAuthorization, TypedAuthorization};

pub(crate) const ROUTER: Address = address!("817e4f0ee2fbdaac426f1178e149f7dc98873ecb");
pub(crate) const USDC: Address = address!("036CbD53842c5426634e7929541eC2318f3dCF7e");

#[derive(Default)]
struct State {
    balances: HashMap<Address, U256>,
    settled: HashSet<B256>,
    receipts: HashMap<TxHash, SettlementReceipt>,
    hook_logs: Vec<Log>,
    commitment_calls: usize,
    sent: usize,
    fail_commitment: Option<ChainError>,
    block: u64,
}

pub(crate) struct MockChain {
    chain_id: u64,
    state: Mutex<State>,
}

impl MockChain {
    pub(crate) fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: Mutex::new(State {
                block: 1000,
                ..State::default()
            }),
        }
    }

    pub(crate) fn fund(&self, owner: Address, amount: U256) {
        self.state.lock().unwrap().balances.insert(owner, amount);
    }

    pub(crate) fn emit_on_settle(&self, log: Log) {
        self.state.lock().unwrap().hook_logs.push(log);
    }

    pub(crate) fn fail_commitment_with(&self, error: ChainError) {
        self.state.lock().unwrap().fail_commitment = Some(error);
    }

    pub(crate) fn commitment_calls(&self) -> usize {
        self.state.lock().unwrap().commitment_calls
    }

    pub(crate) fn sent(&self) -> usize {
        self.state.lock().unwrap().sent
    }

    pub(crate) fn is_settled(&self, commitment: B256) -> bool {
        self.state.lock().unwrap().settled.contains(&commitment)
    }

    fn commitment_of(&self, router: Address, params: &SettlementParameters) -> B256 {
        let call = ISettlementRouter::calculateCommitmentCall {
            token: params.token(),
            from: params.from(),
            value: params.value(),
            validAfter: U256::from(params.valid_after().as_secs()),
            validBefore: U256::from(params.valid_before().as_secs()),
            salt: params.salt(),
            payTo: params.pay_to(),
            facilitatorFee: params.facilitator_fee(),
            hook: params.hook(),
            hookData: params.hook_data().clone(),
        };
        let mut preimage = call.abi_encode();
        preimage.extend_from_slice(router.as_slice());
        preimage.extend_from_slice(&self.chain_id.to_be_bytes());
        keccak256(preimage)
    }

    fn settle(
        &self,
        router: Address,
        params: &SettlementParameters,
        nonce: B256,
        signature: &Bytes,
    ) -> Result<TxHash, ChainError> {
        let now = UnixTimestamp::now();
        if params.valid_before() <= now {
            return Err(ChainError::Revert(
                "FiatTokenV2: authorization is expired".into(),
            ));
        }
        if params.valid_after() >= now {
            return Err(ChainError::Revert(
                "FiatTokenV2: authorization is not yet valid".into(),
            ));
        }
        let commitment = self.commitment_of(router, params);
        if nonce != commitment {
            return Err(ChainError::Revert(
                "commitment does not match settlement parameters".into(),
            ));
        }

        let typed = TypedAuthorization {
            domain: AuthorizationDomain {
                name: "USDC".into(),
                version: "2".into(),
                chain_id: self.chain_id,
                verifying_contract: params.token(),
            },
            message: TransferAuthorization {
                from: params.from(),
                to: router,
                value: params.value(),
                valid_after: params.valid_after(),
                valid_before: params.valid_before(),
                nonce,
            },
        };
        let recovered = Signature::from_raw(signature)
            .ok()
            .and_then(|sig| sig.recover_address_from_prehash(&typed.signing_hash()).ok());
        if recovered != Some(params.from()) {
            return Err(ChainError::Revert("FiatTokenV2: invalid signature".into()));
        }

        let mut state = self.state.lock().unwrap();
        if state.settled.contains(&commitment) {
            return Err(ChainError::Revert("commitment already settled".into()));
        }
        let balance = state.balances.get(&params.from()).copied().unwrap_or_default();
        if balance < params.value() {
            return Err(ChainError::Revert(
                "ERC20: transfer amount exceeds balance".into(),
            ));
        }
        state.balances.insert(params.from(), balance - params.value());
        state.settled.insert(commitment);
        state.sent += 1;
        state.block += 1;

        let tx_hash = keccak256(commitment);
        let settled = ISettlementRouter::Settled {
            contextKey: commitment,
            payer: params.from(),
            token: params.token(),
            amount: params.value(),
            hook: params.hook(),
            salt: params.salt(),
            payTo: params.pay_to(),
            facilitatorFee: params.facilitator_fee(),
        };
        let mut logs = vec![Log {
            address: router,
            data: settled.encode_log_data(),
        }];
        logs.extend(state.hook_logs.iter().cloned());
        let receipt = SettlementReceipt {
            tx_hash,
            block_number: state.block,
            success: true,
            logs,
        };
        state.receipts.insert(tx_hash, receipt);
        Ok(tx_hash)
    }
}

impl SettlementChain for MockChain {
    fn chain_id(&self) -> ChainFuture<'_, u64> {
        Box::pin(async move { Ok(self.chain_id) })
    }

    fn token_domain(&self, _token: Address) -> ChainFuture<'_, TokenDomain> {
        Box::pin(async move {
            Ok(TokenDomain {
                name: "USDC".into(),
                version: "2".into(),
            })
        })
    }

    fn balance_of(&self, _token: Address, owner: Address) -> ChainFuture<'_, U256> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Ok(state.balances.get(&owner).copied().unwrap_or_default())
        })
    }

    fn calculate_commitment<'a>(
        &'a self,
        router: Address,
        params: &'a SettlementParameters,
    ) -> ChainFuture<'a, B256> {
        Box::pin(async move {
            {
                let mut state = self.state.lock().unwrap();
                state.commitment_calls += 1;
                if let Some(error) = state.fail_commitment.clone() {
                    return Err(error);
                }
            }
            Ok(self.commitment_of(router, params))
        })
    }

    fn send_settlement<'a>(
        &'a self,
        router: Address,
        params: &'a SettlementParameters,
        nonce: B256,
        signature: &'a Bytes,
    ) -> ChainFuture<'a, TxHash> {
        Box::pin(async move { self.settle(router, params, nonce, signature) })
    }

    fn wait_for_receipt(&self, tx_hash: TxHash) -> ChainFuture<'_, SettlementReceipt> {
        Box::pin(async move {
            self.state
                .lock()
                .unwrap()
                .receipts
                .get(&tx_hash)
                .cloned()
                .ok_or_else(|| ChainError::Transport(format!("unknown transaction {tx_hash}")))
        })
    }
}
