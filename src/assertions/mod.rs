use alloy::{
    network::Ethereum,
    providers::{PendingTransactionError, Provider},
    rpc::types::{TransactionReceipt, TransactionRequest},
    transports::{RpcError, TransportErrorKind},
};
use anyhow::Context as _;

use crate::revert::ProviderError;

mod revert_matcher;
mod should_revert;

pub use revert_matcher::{RevertMatcher, TxOutcome};

/// Raised when an assertion does not hold.
///
/// Kept distinct from errors reported by the node, so that callers can tell a failed
/// check apart from a transaction that could not be processed at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct AssertionFailure(pub String);

impl AssertionFailure {
    /// Finds an assertion failure anywhere in the error chain.
    pub fn find(err: &anyhow::Error) -> Option<&Self> {
        err.chain().find_map(|cause| cause.downcast_ref::<Self>())
    }
}

#[derive(Debug)]
pub struct TxAssertion(Box<dyn Assertion>);

#[async_trait::async_trait]
pub trait Assertion: Send + Sync + 'static + std::fmt::Debug {
    async fn before_submission(
        &mut self,
        _provider: &dyn Provider<Ethereum>,
        _request: &TransactionRequest,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_failed_send(
        &mut self,
        _provider: &dyn Provider<Ethereum>,
        err: &RpcError<TransportErrorKind>,
    ) -> anyhow::Result<()> {
        Err(ProviderError::from(err).into())
    }

    async fn on_get_receipt_failure(
        &mut self,
        _provider: &dyn Provider<Ethereum>,
        err: &PendingTransactionError,
    ) -> anyhow::Result<()> {
        anyhow::bail!("Failed to get transaction receipt: {}", err.to_string());
    }

    async fn on_receipt(
        &mut self,
        _provider: &dyn Provider<Ethereum>,
        _receipt: TransactionReceipt,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
pub trait AssertingProvider: Provider<Ethereum> + Sized {
    async fn send_with_assertions(
        &self,
        request: impl Into<TransactionRequest> + Send + Sync + 'static,
        assertions: impl IntoIterator<Item = TxAssertion> + Send + Sync + 'static,
    ) -> anyhow::Result<()> {
        let provider = self;
        let request = request.into();
        let mut assertions = assertions.into_iter().collect::<Vec<_>>();
        for assertion in &mut assertions {
            assertion
                .0
                .before_submission(provider, &request)
                .await
                .with_context(|| format!("{assertion:?}::before_submission"))?;
        }

        let pending_tx = match provider.send_transaction(request).await {
            Ok(hash) => hash,
            Err(err) => {
                tracing::debug!(%err, "Transaction submission failed");
                for assertion in &mut assertions {
                    assertion
                        .0
                        .on_failed_send(provider, &err)
                        .await
                        .with_context(|| format!("{assertion:?}::on_failed_send"))?;
                }
                return Ok(());
            }
        };
        tracing::info!("Submitted tx: {:?}", pending_tx.tx_hash());

        let receipt = match pending_tx.get_receipt().await {
            Ok(receipt) => receipt,
            Err(err) => {
                for assertion in &mut assertions {
                    assertion
                        .0
                        .on_get_receipt_failure(provider, &err)
                        .await
                        .with_context(|| format!("{assertion:?}::on_get_receipt_failure"))?;
                }
                return Ok(());
            }
        };
        tracing::debug!(?receipt, "Transaction receipt received");

        for assertion in &mut assertions {
            assertion
                .0
                .on_receipt(provider, receipt.clone())
                .await
                .with_context(|| format!("{assertion:?}::on_receipt"))?;
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl<P: Provider<Ethereum> + Send + Sync + 'static> AssertingProvider for P {}
