use alloy::{
    network::{Ethereum, TransactionBuilder as _},
    providers::{DynProvider, Provider as _},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use anyhow::Context as _;

use crate::{
    assertions::{AssertingProvider as _, AssertionFailure, RevertMatcher, TxAssertion},
    contracts::Matchers::MatchersInstance,
    utils::Node,
};

/// Explicit gas limit makes the provider skip gas estimation, so a reverting
/// transaction gets mined and the revert only shows up in the receipt.
pub(crate) const MINED_GAS_LIMIT: u64 = 1_000_000;

pub(crate) type MatchersContract = MatchersInstance<(), DynProvider<Ethereum>>;

/// `Matchers` methods exercised by the suites.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Method {
    Succeeds,
    RevertsWithoutReasonString,
    RevertsWith(&'static str),
    PanicAssert,
    RevertWithSomeCustomError,
}

impl Method {
    pub(crate) fn request(self, matchers: &MatchersContract) -> TransactionRequest {
        match self {
            Self::Succeeds => matchers.succeeds().into_transaction_request(),
            Self::RevertsWithoutReasonString => {
                matchers.revertsWithoutReasonString().into_transaction_request()
            }
            Self::RevertsWith(reason) => matchers
                .revertsWith(reason.to_string())
                .into_transaction_request(),
            Self::PanicAssert => matchers.panicAssert().into_transaction_request(),
            Self::RevertWithSomeCustomError => {
                matchers.revertWithSomeCustomError().into_transaction_request()
            }
        }
    }
}

/// Ways of invoking a method; every assertion is checked against each of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallMode {
    /// Sent transaction, reverts are caught during gas estimation.
    Transaction,
    /// Sent transaction with a fixed gas limit, reverts end up in the receipt.
    MinedTransaction,
    /// `eth_call`.
    StaticCall,
    /// `eth_estimateGas`.
    EstimateGas,
}

impl CallMode {
    pub(crate) const ALL: [CallMode; 4] = [
        CallMode::Transaction,
        CallMode::MinedTransaction,
        CallMode::StaticCall,
        CallMode::EstimateGas,
    ];
}

/// Funded account connected to a node, able to deploy `Matchers` and run assertions.
#[derive(Debug, Clone)]
pub(crate) struct Fixture {
    node: Node,
    alice: PrivateKeySigner,
    provider: DynProvider<Ethereum>,
}

impl Fixture {
    pub(crate) async fn new(node: Node) -> anyhow::Result<Self> {
        let alice = PrivateKeySigner::random();
        let provider = node.provider(alice.clone())?;
        node.fund(&provider, alice.address())
            .await
            .context("Can't fund test account")?;
        Ok(Self {
            node,
            alice,
            provider,
        })
    }

    pub(crate) fn node(&self) -> &Node {
        &self.node
    }

    pub(crate) fn provider(&self) -> &DynProvider<Ethereum> {
        &self.provider
    }

    /// Fresh contract for every case, so cases don't observe each other's state.
    pub(crate) async fn deploy_matchers(&self) -> anyhow::Result<MatchersContract> {
        tracing::debug!(deployer = %self.alice.address(), "Deploying Matchers");
        self.node.deploy_matchers(&self.provider).await
    }

    pub(crate) async fn check(
        &self,
        request: TransactionRequest,
        mode: CallMode,
        matcher: &RevertMatcher,
    ) -> anyhow::Result<()> {
        match mode {
            CallMode::Transaction => {
                self.provider
                    .send_with_assertions(request, [TxAssertion::matching(matcher.clone())])
                    .await
            }
            CallMode::MinedTransaction => {
                self.provider
                    .send_with_assertions(
                        request.with_gas_limit(MINED_GAS_LIMIT),
                        [TxAssertion::matching(matcher.clone())],
                    )
                    .await
            }
            CallMode::StaticCall => matcher.check_result(self.provider.call(request).await),
            CallMode::EstimateGas => {
                matcher.check_result(self.provider.estimate_gas(request).await)
            }
        }
    }

    pub(crate) async fn run_successful_asserts(
        &self,
        matchers: &MatchersContract,
        method: Method,
        matcher: RevertMatcher,
    ) -> anyhow::Result<()> {
        for mode in CallMode::ALL {
            self.check(method.request(matchers), mode, &matcher)
                .await
                .with_context(|| format!("{method:?} via {mode:?} with {matcher:?}"))?;
        }
        Ok(())
    }

    pub(crate) async fn run_failed_asserts(
        &self,
        matchers: &MatchersContract,
        method: Method,
        matcher: RevertMatcher,
        reason: &str,
    ) -> anyhow::Result<()> {
        for mode in CallMode::ALL {
            let Err(err) = self.check(method.request(matchers), mode, &matcher).await else {
                anyhow::bail!(
                    "{method:?} via {mode:?}: expected assertion to fail with \"{reason}\", but it passed"
                );
            };
            match AssertionFailure::find(&err) {
                Some(failure) if failure.0 == reason => {}
                Some(failure) => anyhow::bail!(
                    "{method:?} via {mode:?}: expected assertion to fail with \"{reason}\", but it failed with \"{failure}\""
                ),
                None => {
                    return Err(err.context(format!(
                        "{method:?} via {mode:?}: expected an assertion failure"
                    )));
                }
            }
        }
        Ok(())
    }
}
