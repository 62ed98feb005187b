use std::fmt;

use alloy::primitives::U256;

use crate::{
    assertions::AssertionFailure,
    revert::{RevertKind, RevertSubject, format_panic_code, panic_description},
};

/// What happened to a transaction or call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Succeeded,
    Reverted(RevertKind),
}

impl TxOutcome {
    fn description(&self) -> String {
        match self {
            Self::Succeeded => "it didn't revert".to_string(),
            Self::Reverted(kind) => format!("it reverted {kind}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertExpectation {
    /// Any revert, regardless of its payload.
    Any,
    /// A revert with empty revert data.
    WithoutReasonString,
    /// An `Error(string)` revert with the exact reason.
    WithReason(String),
    /// A `Panic(uint256)` revert, optionally with a specific code.
    WithPanic(Option<U256>),
}

impl RevertExpectation {
    fn matches(&self, kind: &RevertKind) -> bool {
        match (self, kind) {
            (Self::Any, _) => true,
            (Self::WithoutReasonString, RevertKind::Empty) => true,
            (Self::WithReason(expected), RevertKind::Reason(actual)) => expected == actual,
            (Self::WithPanic(None), RevertKind::Panic(_)) => true,
            (Self::WithPanic(Some(expected)), RevertKind::Panic(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl fmt::Display for RevertExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "reverted"),
            Self::WithoutReasonString => write!(f, "reverted without a reason string"),
            Self::WithReason(reason) => write!(f, "reverted with reason '{reason}'"),
            Self::WithPanic(None) => write!(f, "reverted with some panic code"),
            Self::WithPanic(Some(code)) => write!(
                f,
                "reverted with panic code {} ({})",
                format_panic_code(*code),
                panic_description(*code)
            ),
        }
    }
}

/// Checks the outcome of a transaction against a revert expectation.
///
/// `RevertMatcher::without_reason_string()` passes only for reverts with empty data;
/// `.not()` inverts the check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertMatcher {
    expectation: RevertExpectation,
    negated: bool,
}

impl RevertMatcher {
    pub fn new(expectation: RevertExpectation) -> Self {
        Self {
            expectation,
            negated: false,
        }
    }

    pub fn any() -> Self {
        Self::new(RevertExpectation::Any)
    }

    pub fn without_reason_string() -> Self {
        Self::new(RevertExpectation::WithoutReasonString)
    }

    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self::new(RevertExpectation::WithReason(reason.into()))
    }

    pub fn with_panic(code: Option<U256>) -> Self {
        Self::new(RevertExpectation::WithPanic(code))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn check_outcome(&self, outcome: &TxOutcome) -> Result<(), AssertionFailure> {
        let matched = match outcome {
            TxOutcome::Succeeded => false,
            TxOutcome::Reverted(kind) => self.expectation.matches(kind),
        };
        match (matched, self.negated) {
            (true, false) | (false, true) => Ok(()),
            (false, false) => Err(self.positive_failure(outcome)),
            (true, true) => Err(self.negated_failure(outcome)),
        }
    }

    /// Checks the result of an RPC interaction (`eth_call`, `eth_estimateGas`,
    /// contract calls, ...).
    ///
    /// Errors that are not caused by a revert are returned as is, so that e.g. an
    /// out-of-funds sender fails the caller instead of satisfying a negated matcher.
    /// The same goes for client-side `alloy` errors such as ABI decoding failures.
    pub fn check_result<T, E>(&self, result: Result<T, E>) -> anyhow::Result<()>
    where
        E: RevertSubject + fmt::Display + Into<anyhow::Error>,
    {
        let outcome = match result {
            Ok(_) => TxOutcome::Succeeded,
            Err(err) => {
                if !err.is_provider_error() {
                    return Err(AssertionFailure(format!(
                        "Expected an RPC error, but got: {err}"
                    ))
                    .into());
                }
                match err.revert_kind() {
                    Some(kind) => TxOutcome::Reverted(kind),
                    None => return Err(err.into()),
                }
            }
        };
        tracing::debug!(matcher = ?self, ?outcome, "Checking outcome");
        self.check_outcome(&outcome)?;
        Ok(())
    }

    fn positive_failure(&self, outcome: &TxOutcome) -> AssertionFailure {
        let message = match (&self.expectation, outcome) {
            (RevertExpectation::Any, _) => "Expected transaction to be reverted".to_string(),
            (expectation, outcome) => format!(
                "Expected transaction to be {expectation}, but {}",
                outcome.description()
            ),
        };
        AssertionFailure(message)
    }

    fn negated_failure(&self, outcome: &TxOutcome) -> AssertionFailure {
        let message = match (&self.expectation, outcome) {
            (RevertExpectation::Any, TxOutcome::Reverted(RevertKind::Empty)) => {
                "Expected transaction NOT to be reverted".to_string()
            }
            (RevertExpectation::Any, outcome) => format!(
                "Expected transaction NOT to be reverted, but {}",
                outcome.description()
            ),
            (expectation, _) => format!("Expected transaction NOT to be {expectation}, but it was"),
        };
        AssertionFailure(message)
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        contract::Error as ContractError,
        primitives::Bytes,
        providers::PendingTransactionError,
        transports::{RpcError, TransportErrorKind},
    };

    use super::*;
    use crate::revert::{
        ProviderError,
        tests::{error_response, panic_data, reason_data},
    };

    fn reverted(kind: RevertKind) -> TxOutcome {
        TxOutcome::Reverted(kind)
    }

    fn custom() -> RevertKind {
        RevertKind::Custom(Bytes::from_static(&[0x0b, 0xd3, 0xd3, 0x9c]))
    }

    fn failure(matcher: &RevertMatcher, outcome: TxOutcome) -> String {
        matcher.check_outcome(&outcome).unwrap_err().0
    }

    #[test]
    fn without_reason_string_messages() {
        let matcher = RevertMatcher::without_reason_string();
        assert_eq!(matcher.check_outcome(&reverted(RevertKind::Empty)), Ok(()));
        assert_eq!(
            failure(&matcher, TxOutcome::Succeeded),
            "Expected transaction to be reverted without a reason string, but it didn't revert"
        );
        assert_eq!(
            failure(&matcher, reverted(RevertKind::Reason("some reason".into()))),
            "Expected transaction to be reverted without a reason string, but it reverted with reason 'some reason'"
        );
        assert_eq!(
            failure(&matcher, reverted(RevertKind::Panic(U256::from(1)))),
            "Expected transaction to be reverted without a reason string, but it reverted with panic code 0x01 (Assertion error)"
        );
        assert_eq!(
            failure(&matcher, reverted(custom())),
            "Expected transaction to be reverted without a reason string, but it reverted with a custom error"
        );
    }

    #[test]
    fn negated_without_reason_string() {
        let matcher = RevertMatcher::without_reason_string().not();
        assert_eq!(matcher.check_outcome(&TxOutcome::Succeeded), Ok(()));
        assert_eq!(
            matcher.check_outcome(&reverted(RevertKind::Reason("x".into()))),
            Ok(())
        );
        assert_eq!(
            matcher.check_outcome(&reverted(RevertKind::Panic(U256::from(1)))),
            Ok(())
        );
        assert_eq!(matcher.check_outcome(&reverted(custom())), Ok(()));
        assert_eq!(
            failure(&matcher, reverted(RevertKind::Empty)),
            "Expected transaction NOT to be reverted without a reason string, but it was"
        );
        assert_eq!(matcher.not(), RevertMatcher::without_reason_string());
    }

    #[test]
    fn reverted_messages() {
        let matcher = RevertMatcher::any();
        assert_eq!(matcher.check_outcome(&reverted(custom())), Ok(()));
        assert_eq!(
            failure(&matcher, TxOutcome::Succeeded),
            "Expected transaction to be reverted"
        );

        let matcher = matcher.not();
        assert_eq!(matcher.check_outcome(&TxOutcome::Succeeded), Ok(()));
        assert_eq!(
            failure(&matcher, reverted(RevertKind::Empty)),
            "Expected transaction NOT to be reverted"
        );
        assert_eq!(
            failure(&matcher, reverted(RevertKind::Reason("some reason".into()))),
            "Expected transaction NOT to be reverted, but it reverted with reason 'some reason'"
        );
    }

    #[test]
    fn with_reason_messages() {
        let matcher = RevertMatcher::with_reason("some reason");
        assert_eq!(
            matcher.check_outcome(&reverted(RevertKind::Reason("some reason".into()))),
            Ok(())
        );
        assert_eq!(
            failure(&matcher, reverted(RevertKind::Reason("other".into()))),
            "Expected transaction to be reverted with reason 'some reason', but it reverted with reason 'other'"
        );
        assert_eq!(
            failure(&matcher, reverted(RevertKind::Empty)),
            "Expected transaction to be reverted with reason 'some reason', but it reverted without a reason"
        );
        assert_eq!(
            failure(
                &matcher.not(),
                reverted(RevertKind::Reason("some reason".into()))
            ),
            "Expected transaction NOT to be reverted with reason 'some reason', but it was"
        );
    }

    #[test]
    fn with_panic_messages() {
        let matcher = RevertMatcher::with_panic(None);
        assert_eq!(
            matcher.check_outcome(&reverted(RevertKind::Panic(U256::from(0x12)))),
            Ok(())
        );
        assert_eq!(
            failure(&matcher, TxOutcome::Succeeded),
            "Expected transaction to be reverted with some panic code, but it didn't revert"
        );

        let matcher = RevertMatcher::with_panic(Some(U256::from(0x11)));
        assert_eq!(
            failure(&matcher, reverted(RevertKind::Panic(U256::from(0x01)))),
            "Expected transaction to be reverted with panic code 0x11 (Arithmetic operation underflowed or overflowed outside of an unchecked block), but it reverted with panic code 0x01 (Assertion error)"
        );
        assert_eq!(
            failure(&matcher.not(), reverted(RevertKind::Panic(U256::from(0x11)))),
            "Expected transaction NOT to be reverted with panic code 0x11 (Arithmetic operation underflowed or overflowed outside of an unchecked block), but it was"
        );
    }

    #[test]
    fn check_result_classifies_rpc_errors() {
        let matcher = RevertMatcher::without_reason_string();
        matcher
            .check_result(Err::<(), _>(error_response("execution reverted", None)))
            .unwrap();

        let err = matcher
            .check_result(Err::<(), _>(error_response(
                "execution reverted: some reason",
                Some(&reason_data("some reason")),
            )))
            .unwrap_err();
        assert_eq!(
            AssertionFailure::find(&err).map(|f| f.0.as_str()),
            Some(
                "Expected transaction to be reverted without a reason string, but it reverted with reason 'some reason'"
            )
        );

        matcher
            .clone()
            .not()
            .check_result(Err::<(), _>(error_response(
                "execution reverted",
                Some(&panic_data(1)),
            )))
            .unwrap();

        let err = matcher.check_result(Ok::<_, RpcError<TransportErrorKind>>(())).unwrap_err();
        assert!(AssertionFailure::find(&err).is_some());
    }

    #[test]
    fn check_result_propagates_unrelated_errors() {
        let matcher = RevertMatcher::without_reason_string().not();
        let err = matcher
            .check_result(Err::<(), _>(error_response(
                "sender doesn't have enough funds to send tx",
                None,
            )))
            .unwrap_err();
        assert!(AssertionFailure::find(&err).is_none());
        assert!(err.to_string().contains("enough funds"));
    }

    #[test]
    fn check_result_rejects_non_rpc_errors() {
        let matcher = RevertMatcher::without_reason_string();
        let err = matcher
            .check_result(Err::<(), _>(anyhow::anyhow!("not an RPC error")))
            .unwrap_err();
        assert_eq!(
            AssertionFailure::find(&err).map(|f| f.0.as_str()),
            Some("Expected an RPC error, but got: not an RPC error")
        );
    }

    #[test]
    fn check_result_propagates_client_side_errors() {
        let matcher = RevertMatcher::without_reason_string().not();

        let err = matcher
            .check_result(Err::<(), _>(ContractError::UnknownFunction(
                "missing".to_string(),
            )))
            .unwrap_err();
        assert!(AssertionFailure::find(&err).is_none());
        assert!(matches!(
            err.downcast_ref::<ContractError>(),
            Some(ContractError::UnknownFunction(_))
        ));

        let err = matcher
            .check_result(Err::<(), _>(PendingTransactionError::FailedToRegister))
            .unwrap_err();
        assert!(AssertionFailure::find(&err).is_none());
        assert!(matches!(
            err.downcast_ref::<PendingTransactionError>(),
            Some(PendingTransactionError::FailedToRegister)
        ));

        let provider_error = ProviderError {
            code: Some(-32000),
            message: "nonce too low".to_string(),
        };
        let err = matcher
            .check_result(Err::<(), _>(
                anyhow::Error::from(provider_error.clone()).context("send"),
            ))
            .unwrap_err();
        assert!(AssertionFailure::find(&err).is_none());
        assert_eq!(err.downcast_ref::<ProviderError>(), Some(&provider_error));
    }
}
