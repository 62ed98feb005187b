use alloy::{network::TransactionBuilder as _, primitives::U256};

use crate::{
    assertions::{AssertingProvider as _, RevertMatcher, TxAssertion},
    harness::Suite,
    suites::{
        TestConfig,
        helpers::{Fixture, MINED_GAS_LIMIT, Method},
    },
    utils::Node,
};

const ASSERTION_ERROR: u64 = 0x01;
const ARITHMETIC_OVERFLOW: u64 = 0x11;

/// `reverted`, `revertedWith` and `revertedWithPanic` checks against the same contract.
#[derive(Debug, Clone)]
pub(crate) struct RevertMatchers {
    fixture: Fixture,
}

impl RevertMatchers {
    pub(crate) fn spawned() -> Suite<Self> {
        Self::with_cases(Suite::<Self>::new(
            "Revert matchers (spawned anvil)",
            |config| Box::pin(Self::new_spawned(config)),
        ))
    }

    pub(crate) fn connected() -> Suite<Self> {
        Self::with_cases(Suite::<Self>::new(
            "Revert matchers (connected node)",
            |config| Box::pin(Self::new_connected(config)),
        ))
    }

    async fn new_spawned(_config: &TestConfig) -> anyhow::Result<Self> {
        let fixture = Fixture::new(Node::spawn()?).await?;
        Ok(Self { fixture })
    }

    async fn new_connected(config: &TestConfig) -> anyhow::Result<Self> {
        let fixture = Fixture::new(Node::connect(&config.rpc_url)).await?;
        Ok(Self { fixture })
    }

    fn with_cases(suite: Suite<Self>) -> Suite<Self> {
        suite
            .case("reverted: successful asserts", |t| {
                Box::pin(t.reverted_successful_asserts())
            })
            .case("reverted: failed asserts", |t| {
                Box::pin(t.reverted_failed_asserts())
            })
            .case("revertedWith: successful asserts", |t| {
                Box::pin(t.reverted_with_successful_asserts())
            })
            .case("revertedWith: failed asserts", |t| {
                Box::pin(t.reverted_with_failed_asserts())
            })
            .case("revertedWithPanic: successful asserts", |t| {
                Box::pin(t.reverted_with_panic_successful_asserts())
            })
            .case("revertedWithPanic: failed asserts", |t| {
                Box::pin(t.reverted_with_panic_failed_asserts())
            })
            .case("transaction assertions", |t| {
                Box::pin(t.transaction_assertions())
            })
    }

    async fn reverted_successful_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_successful_asserts(&matchers, Method::Succeeds, RevertMatcher::any().not())
            .await?;
        for method in [
            Method::RevertsWithoutReasonString,
            Method::RevertsWith("some reason"),
            Method::PanicAssert,
            Method::RevertWithSomeCustomError,
        ] {
            self.fixture
                .run_successful_asserts(&matchers, method, RevertMatcher::any())
                .await?;
        }
        Ok(())
    }

    async fn reverted_failed_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::Succeeds,
                RevertMatcher::any(),
                "Expected transaction to be reverted",
            )
            .await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::RevertsWithoutReasonString,
                RevertMatcher::any().not(),
                "Expected transaction NOT to be reverted",
            )
            .await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::RevertsWith("some reason"),
                RevertMatcher::any().not(),
                "Expected transaction NOT to be reverted, but it reverted with reason 'some reason'",
            )
            .await
    }

    async fn reverted_with_successful_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_successful_asserts(
                &matchers,
                Method::RevertsWith("some reason"),
                RevertMatcher::with_reason("some reason"),
            )
            .await?;
        self.fixture
            .run_successful_asserts(
                &matchers,
                Method::RevertsWith("some reason"),
                RevertMatcher::with_reason("another reason").not(),
            )
            .await
    }

    async fn reverted_with_failed_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::RevertsWith("some reason"),
                RevertMatcher::with_reason("another reason"),
                "Expected transaction to be reverted with reason 'another reason', but it reverted with reason 'some reason'",
            )
            .await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::RevertsWithoutReasonString,
                RevertMatcher::with_reason("some reason"),
                "Expected transaction to be reverted with reason 'some reason', but it reverted without a reason",
            )
            .await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::RevertsWith("some reason"),
                RevertMatcher::with_reason("some reason").not(),
                "Expected transaction NOT to be reverted with reason 'some reason', but it was",
            )
            .await
    }

    async fn reverted_with_panic_successful_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_successful_asserts(&matchers, Method::PanicAssert, RevertMatcher::with_panic(None))
            .await?;
        self.fixture
            .run_successful_asserts(
                &matchers,
                Method::PanicAssert,
                RevertMatcher::with_panic(Some(U256::from(ASSERTION_ERROR))),
            )
            .await?;
        self.fixture
            .run_successful_asserts(
                &matchers,
                Method::RevertWithSomeCustomError,
                RevertMatcher::with_panic(None).not(),
            )
            .await
    }

    async fn reverted_with_panic_failed_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::PanicAssert,
                RevertMatcher::with_panic(Some(U256::from(ARITHMETIC_OVERFLOW))),
                "Expected transaction to be reverted with panic code 0x11 (Arithmetic operation underflowed or overflowed outside of an unchecked block), but it reverted with panic code 0x01 (Assertion error)",
            )
            .await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::Succeeds,
                RevertMatcher::with_panic(None),
                "Expected transaction to be reverted with some panic code, but it didn't revert",
            )
            .await
    }

    /// Assertions attached directly to a submitted transaction.
    async fn transaction_assertions(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        let provider = self.fixture.provider();
        let cases = [
            (Method::Succeeds, TxAssertion::should_succeed()),
            (Method::RevertWithSomeCustomError, TxAssertion::should_revert()),
            (
                Method::RevertsWithoutReasonString,
                TxAssertion::should_revert_without_reason_string(),
            ),
            (
                Method::RevertsWith("some reason"),
                TxAssertion::should_revert_with("some reason"),
            ),
            (
                Method::PanicAssert,
                TxAssertion::should_revert_with_panic(Some(U256::from(ASSERTION_ERROR))),
            ),
        ];
        for (method, assertion) in cases {
            tracing::info!(?method, ?assertion, "Sending transaction with assertion");
            let tx = method.request(&matchers).with_gas_limit(MINED_GAS_LIMIT);
            provider.send_with_assertions(tx, [assertion]).await?;
        }
        Ok(())
    }
}
