use alloy::{network::TransactionBuilder as _, signers::local::PrivateKeySigner};
use anyhow::Context as _;

use crate::{
    assertions::{AssertingProvider as _, AssertionFailure, RevertMatcher, TxAssertion},
    harness::Suite,
    suites::{
        TestConfig,
        helpers::{Fixture, MINED_GAS_LIMIT, Method},
    },
    utils::Node,
};

/// Key of an account that almost surely holds no funds.
const UNFUNDED_PK: &str = "0xc5c587cc6e48e9692aee0bf07474118e6d830c11905f7ec7ff32c09c99eba5f9";

#[derive(Debug, Clone)]
pub(crate) struct RevertedWithoutReasonString {
    fixture: Fixture,
}

impl RevertedWithoutReasonString {
    pub(crate) fn spawned() -> Suite<Self> {
        Self::with_cases(Suite::<Self>::new(
            "Reverted without reason string (spawned anvil)",
            |config| Box::pin(Self::new_spawned(config)),
        ))
    }

    pub(crate) fn connected() -> Suite<Self> {
        Self::with_cases(Suite::<Self>::new(
            "Reverted without reason string (connected node)",
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
            .case(
                "calling a method that succeeds: successful asserts",
                |t| Box::pin(t.succeeds_successful_asserts()),
            )
            .case(
                "calling a method that succeeds: failed asserts",
                |t| Box::pin(t.succeeds_failed_asserts()),
            )
            .case(
                "calling a method that reverts without a reason string: successful asserts",
                |t| Box::pin(t.without_reason_successful_asserts()),
            )
            .case(
                "calling a method that reverts without a reason string: failed asserts",
                |t| Box::pin(t.without_reason_failed_asserts()),
            )
            .case(
                "calling a method that reverts with a reason string: successful asserts",
                |t| Box::pin(t.with_reason_successful_asserts()),
            )
            .case(
                "calling a method that reverts with a reason string: failed asserts",
                |t| Box::pin(t.with_reason_failed_asserts()),
            )
            .case(
                "calling a method that reverts with a panic code: successful asserts",
                |t| Box::pin(t.panic_successful_asserts()),
            )
            .case(
                "calling a method that reverts with a panic code: failed asserts",
                |t| Box::pin(t.panic_failed_asserts()),
            )
            .case(
                "calling a method that reverts with a custom error: successful asserts",
                |t| Box::pin(t.custom_error_successful_asserts()),
            )
            .case(
                "calling a method that reverts with a custom error: failed asserts",
                |t| Box::pin(t.custom_error_failed_asserts()),
            )
            .case(
                "invalid values: non-RPC errors as subject",
                |t| Box::pin(t.non_rpc_errors_as_subject()),
            )
            .case(
                "invalid values: errors that are not related to a reverted transaction",
                |t| Box::pin(t.errors_not_related_to_revert()),
            )
    }

    async fn succeeds_successful_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_successful_asserts(
                &matchers,
                Method::Succeeds,
                RevertMatcher::without_reason_string().not(),
            )
            .await
    }

    async fn succeeds_failed_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::Succeeds,
                RevertMatcher::without_reason_string(),
                "Expected transaction to be reverted without a reason string, but it didn't revert",
            )
            .await
    }

    async fn without_reason_successful_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_successful_asserts(
                &matchers,
                Method::RevertsWithoutReasonString,
                RevertMatcher::without_reason_string(),
            )
            .await
    }

    async fn without_reason_failed_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::RevertsWithoutReasonString,
                RevertMatcher::without_reason_string().not(),
                "Expected transaction NOT to be reverted without a reason string, but it was",
            )
            .await
    }

    async fn with_reason_successful_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_successful_asserts(
                &matchers,
                Method::RevertsWith("some reason"),
                RevertMatcher::without_reason_string().not(),
            )
            .await
    }

    async fn with_reason_failed_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::RevertsWith("some reason"),
                RevertMatcher::without_reason_string(),
                "Expected transaction to be reverted without a reason string, but it reverted with reason 'some reason'",
            )
            .await
    }

    async fn panic_successful_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_successful_asserts(
                &matchers,
                Method::PanicAssert,
                RevertMatcher::without_reason_string().not(),
            )
            .await
    }

    async fn panic_failed_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::PanicAssert,
                RevertMatcher::without_reason_string(),
                "Expected transaction to be reverted without a reason string, but it reverted with panic code 0x01 (Assertion error)",
            )
            .await
    }

    async fn custom_error_successful_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_successful_asserts(
                &matchers,
                Method::RevertWithSomeCustomError,
                RevertMatcher::without_reason_string().not(),
            )
            .await
    }

    async fn custom_error_failed_asserts(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        self.fixture
            .run_failed_asserts(
                &matchers,
                Method::RevertWithSomeCustomError,
                RevertMatcher::without_reason_string(),
                "Expected transaction to be reverted without a reason string, but it reverted with a custom error",
            )
            .await
    }

    async fn non_rpc_errors_as_subject(&self) -> anyhow::Result<()> {
        let subject: Result<(), anyhow::Error> = Err(anyhow::anyhow!("not a transaction error"));
        let err = RevertMatcher::without_reason_string()
            .check_result(subject)
            .err()
            .context("Assertion on a non-RPC error should fail")?;
        let failure = AssertionFailure::find(&err).context("Expected an assertion failure")?;
        anyhow::ensure!(
            failure.0.starts_with("Expected an RPC error"),
            "Unexpected assertion failure: {failure}"
        );
        Ok(())
    }

    async fn errors_not_related_to_revert(&self) -> anyhow::Result<()> {
        let matchers = self.fixture.deploy_matchers().await?;
        let signer: PrivateKeySigner = UNFUNDED_PK.parse().context("Invalid private key")?;
        let provider = self.fixture.node().provider(signer)?;

        // Fails because of lack of funds, not because of a revert.
        let tx = Method::RevertsWithoutReasonString
            .request(&matchers)
            .with_gas_limit(MINED_GAS_LIMIT);
        let err = provider
            .send_with_assertions(tx, [TxAssertion::should_not_revert_without_reason_string()])
            .await
            .err()
            .context("Transaction from an unfunded account should fail")?;

        anyhow::ensure!(
            AssertionFailure::find(&err).is_none(),
            "Expected the provider error to be propagated, got an assertion failure: {err:#}"
        );
        let message = format!("{err:#}").to_lowercase();
        anyhow::ensure!(
            message.contains("insufficient funds") || message.contains("enough funds"),
            "Expected an out-of-funds error, got: {err:#}"
        );
        Ok(())
    }
}
