use alloy::{
    eips::BlockId,
    network::Ethereum,
    primitives::U256,
    providers::Provider,
    rpc::types::{TransactionReceipt, TransactionRequest},
    transports::{RpcError, TransportErrorKind},
};
use anyhow::Context as _;

use crate::{
    assertions::{Assertion, RevertMatcher, TxAssertion, TxOutcome},
    revert::{ProviderError, RevertKind, RevertSubject as _},
};

#[derive(Debug, Clone)]
pub struct ShouldRevert {
    matcher: RevertMatcher,
    request: Option<TransactionRequest>,
}

impl ShouldRevert {
    /// Receipts don't carry revert data, so the failed transaction is re-executed
    /// with `eth_call` on top of the state it was executed against.
    async fn replay(
        &self,
        provider: &dyn Provider<Ethereum>,
        receipt: &TransactionReceipt,
    ) -> anyhow::Result<RevertKind> {
        let request = self
            .request
            .clone()
            .context("Transaction request was not recorded before submission")?
            .from(receipt.from);
        let mut call = provider.call(request);
        if let Some(block) = replay_block(receipt) {
            call = call.block(block);
        }

        match call.await {
            Ok(_) => {
                tracing::warn!(
                    tx_hash = ?receipt.transaction_hash,
                    "Failed transaction did not revert on replay, assuming empty revert data"
                );
                Ok(RevertKind::Empty)
            }
            Err(err) => match err.revert_kind() {
                Some(kind) => Ok(kind),
                None => Err(anyhow::Error::from(err)
                    .context("Replay of a failed transaction returned a non-revert error")),
            },
        }
    }
}

/// Parent of the inclusion block. The state at the inclusion block already has the
/// transaction applied, nonce bump included.
fn replay_block(receipt: &TransactionReceipt) -> Option<BlockId> {
    receipt
        .block_number
        .map(|number| BlockId::number(number.saturating_sub(1)))
}

#[async_trait::async_trait]
impl Assertion for ShouldRevert {
    async fn before_submission(
        &mut self,
        _provider: &dyn Provider<Ethereum>,
        request: &TransactionRequest,
    ) -> anyhow::Result<()> {
        self.request = Some(request.clone());
        Ok(())
    }

    async fn on_failed_send(
        &mut self,
        _provider: &dyn Provider<Ethereum>,
        err: &RpcError<TransportErrorKind>,
    ) -> anyhow::Result<()> {
        // Gas estimation executes the transaction, so most reverts surface here.
        let Some(kind) = err.revert_kind() else {
            return Err(ProviderError::from(err).into());
        };
        tracing::debug!(?kind, "Transaction reverted before submission");
        self.matcher.check_outcome(&TxOutcome::Reverted(kind))?;
        Ok(())
    }

    async fn on_receipt(
        &mut self,
        provider: &dyn Provider<Ethereum>,
        receipt: TransactionReceipt,
    ) -> anyhow::Result<()> {
        let outcome = if receipt.status() {
            TxOutcome::Succeeded
        } else {
            let kind = self.replay(provider, &receipt).await?;
            if let Some(selector) = kind.custom_selector() {
                tracing::debug!(selector = %hex::encode(selector), "Reverted with a custom error");
            }
            TxOutcome::Reverted(kind)
        };
        self.matcher.check_outcome(&outcome)?;
        Ok(())
    }
}

impl TxAssertion {
    pub fn matching(matcher: RevertMatcher) -> Self {
        Self(Box::new(ShouldRevert {
            matcher,
            request: None,
        }))
    }

    pub fn should_revert() -> Self {
        Self::matching(RevertMatcher::any())
    }

    pub fn should_succeed() -> Self {
        Self::matching(RevertMatcher::any().not())
    }

    pub fn should_revert_without_reason_string() -> Self {
        Self::matching(RevertMatcher::without_reason_string())
    }

    pub fn should_not_revert_without_reason_string() -> Self {
        Self::matching(RevertMatcher::without_reason_string().not())
    }

    pub fn should_revert_with(reason: impl Into<String>) -> Self {
        Self::matching(RevertMatcher::with_reason(reason))
    }

    pub fn should_revert_with_panic(code: Option<U256>) -> Self {
        Self::matching(RevertMatcher::with_panic(code))
    }
}
