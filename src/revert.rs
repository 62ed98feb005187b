use std::fmt;

use alloy::{
    contract::Error as ContractError,
    primitives::{Bytes, U256},
    providers::PendingTransactionError,
    sol_types::{Panic, Revert, SolError},
    transports::{RpcError, TransportErrorKind},
};

/// Classified revert payload of a failed EVM execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertKind {
    /// `revert()` or `require(cond)` without any data attached.
    Empty,
    /// `Error(string)` payload.
    Reason(String),
    /// `Panic(uint256)` payload.
    Panic(U256),
    /// Anything else, usually a user-defined error.
    Custom(Bytes),
}

impl RevertKind {
    pub fn decode(data: &[u8]) -> Self {
        if data.is_empty() {
            return Self::Empty;
        }
        if data.starts_with(&Revert::SELECTOR) {
            if let Ok(revert) = Revert::abi_decode(data, true) {
                return Self::Reason(revert.reason);
            }
        } else if data.starts_with(&Panic::SELECTOR) {
            if let Ok(panic) = Panic::abi_decode(data, true) {
                return Self::Panic(panic.code);
            }
        }
        Self::Custom(Bytes::copy_from_slice(data))
    }

    /// Four-byte selector of a custom error, if the payload is long enough to have one.
    pub fn custom_selector(&self) -> Option<[u8; 4]> {
        match self {
            Self::Custom(data) => data.get(..4)?.try_into().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for RevertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "without a reason"),
            Self::Reason(reason) => write!(f, "with reason '{reason}'"),
            Self::Panic(code) => write!(
                f,
                "with panic code {} ({})",
                format_panic_code(*code),
                panic_description(*code)
            ),
            Self::Custom(_) => write!(f, "with a custom error"),
        }
    }
}

pub fn format_panic_code(code: U256) -> String {
    match u64::try_from(code) {
        Ok(code) => format!("0x{code:02x}"),
        Err(_) => format!("{code:#x}"),
    }
}

pub fn panic_description(code: U256) -> &'static str {
    let Ok(code) = u64::try_from(code) else {
        return "Unknown panic code";
    };
    match code {
        0x00 => "Generic compiler inserted panic",
        0x01 => "Assertion error",
        0x11 => "Arithmetic operation underflowed or overflowed outside of an unchecked block",
        0x12 => "Division or modulo division by zero",
        0x21 => "Tried to convert a value into an enum, but the value was too big or negative",
        0x22 => "Incorrectly encoded storage byte array",
        0x31 => ".pop() was called on an empty array",
        0x32 => "Array accessed at an out-of-bounds or negative index",
        0x41 => "Too much memory was allocated, or an array was created that is too large",
        0x51 => "Called a zero-initialized variable of internal function type",
        _ => "Unknown panic code",
    }
}

/// Extracts revert data from an RPC error.
///
/// Returns `None` when the error is not caused by a reverted execution (transport
/// failures, insufficient funds, nonce errors and so on). A revert response without
/// a data field is treated as a revert with empty data.
pub fn revert_data(err: &RpcError<TransportErrorKind>) -> Option<Bytes> {
    let RpcError::ErrorResp(payload) = err else {
        return None;
    };
    if !payload.message.to_lowercase().contains("revert") {
        return None;
    }
    Some(payload.as_revert_data().unwrap_or_default())
}

/// Node-side failure that is not a revert, e.g. an out-of-funds sender.
///
/// `RpcError` is not `Clone`, so hooks that only see a reference keep its code and
/// message in this form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Transaction submission failed: {message}")]
pub struct ProviderError {
    /// JSON-RPC error code, absent for transport-level failures.
    pub code: Option<i64>,
    pub message: String,
}

impl From<&RpcError<TransportErrorKind>> for ProviderError {
    fn from(err: &RpcError<TransportErrorKind>) -> Self {
        match err {
            RpcError::ErrorResp(payload) => Self {
                code: Some(payload.code),
                message: payload.message.to_string(),
            },
            other => Self {
                code: None,
                message: other.to_string(),
            },
        }
    }
}

/// An error value that may wrap a JSON-RPC error returned by the node.
pub trait RevertSubject {
    fn rpc_error(&self) -> Option<&RpcError<TransportErrorKind>>;

    /// Whether the error comes from the client or the node at all. Such errors are
    /// propagated when they are not reverts.
    fn is_provider_error(&self) -> bool {
        self.rpc_error().is_some()
    }

    /// `Some` if the error is a revert, `None` if it's unrelated to a reverted execution.
    fn revert_kind(&self) -> Option<RevertKind> {
        self.rpc_error()
            .and_then(revert_data)
            .map(|data| RevertKind::decode(&data))
    }
}

impl RevertSubject for RpcError<TransportErrorKind> {
    fn rpc_error(&self) -> Option<&RpcError<TransportErrorKind>> {
        Some(self)
    }
}

impl RevertSubject for ContractError {
    fn rpc_error(&self) -> Option<&RpcError<TransportErrorKind>> {
        match self {
            ContractError::TransportError(err) => Some(err),
            _ => None,
        }
    }

    fn is_provider_error(&self) -> bool {
        true
    }
}

impl RevertSubject for PendingTransactionError {
    fn rpc_error(&self) -> Option<&RpcError<TransportErrorKind>> {
        match self {
            PendingTransactionError::TransportError(err) => Some(err),
            _ => None,
        }
    }

    fn is_provider_error(&self) -> bool {
        true
    }
}

impl RevertSubject for anyhow::Error {
    fn rpc_error(&self) -> Option<&RpcError<TransportErrorKind>> {
        self.chain().find_map(|cause| {
            cause
                .downcast_ref::<RpcError<TransportErrorKind>>()
                .or_else(|| {
                    cause
                        .downcast_ref::<ContractError>()
                        .and_then(RevertSubject::rpc_error)
                })
                .or_else(|| {
                    cause
                        .downcast_ref::<PendingTransactionError>()
                        .and_then(RevertSubject::rpc_error)
                })
        })
    }

    fn is_provider_error(&self) -> bool {
        self.chain().any(|cause| {
            cause.is::<RpcError<TransportErrorKind>>()
                || cause.is::<ContractError>()
                || cause.is::<PendingTransactionError>()
                || cause.is::<ProviderError>()
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn error_payload(message: &str, data: Option<&[u8]>) -> serde_json::Value {
        let mut payload = serde_json::json!({ "code": 3, "message": message });
        if let Some(data) = data {
            payload["data"] = format!("0x{}", hex::encode(data)).into();
        }
        payload
    }

    pub(crate) fn error_response(message: &str, data: Option<&[u8]>) -> RpcError<TransportErrorKind> {
        RpcError::ErrorResp(serde_json::from_value(error_payload(message, data)).unwrap())
    }

    pub(crate) fn reason_data(reason: &str) -> Vec<u8> {
        Revert {
            reason: reason.to_string(),
        }
        .abi_encode()
    }

    pub(crate) fn panic_data(code: u64) -> Vec<u8> {
        Panic {
            code: U256::from(code),
        }
        .abi_encode()
    }

    #[test]
    fn decodes_payloads() {
        assert_eq!(RevertKind::decode(&[]), RevertKind::Empty);
        assert_eq!(
            RevertKind::decode(&reason_data("some reason")),
            RevertKind::Reason("some reason".to_string())
        );
        assert_eq!(
            RevertKind::decode(&panic_data(0x01)),
            RevertKind::Panic(U256::from(1))
        );

        let custom = hex::decode("0bd3d39c").unwrap();
        let kind = RevertKind::decode(&custom);
        assert_eq!(kind, RevertKind::Custom(custom.clone().into()));
        assert_eq!(kind.custom_selector(), Some([0x0b, 0xd3, 0xd3, 0x9c]));
    }

    #[test]
    fn malformed_payloads_are_custom_errors() {
        let short = [0x08, 0xc3, 0x79];
        assert!(matches!(RevertKind::decode(&short), RevertKind::Custom(_)));
        assert_eq!(RevertKind::decode(&short).custom_selector(), None);

        // Right selector, but the body is not a valid `string` encoding.
        let mut truncated = reason_data("some reason");
        truncated.truncate(40);
        assert!(matches!(
            RevertKind::decode(&truncated),
            RevertKind::Custom(_)
        ));
    }

    #[test]
    fn panic_codes_are_described() {
        assert_eq!(format_panic_code(U256::from(0x01)), "0x01");
        assert_eq!(format_panic_code(U256::from(0x32)), "0x32");
        assert_eq!(panic_description(U256::from(0x01)), "Assertion error");
        assert_eq!(
            panic_description(U256::from(0x12)),
            "Division or modulo division by zero"
        );
        assert_eq!(panic_description(U256::from(0x99)), "Unknown panic code");
        assert_eq!(panic_description(U256::MAX), "Unknown panic code");
        assert_eq!(
            RevertKind::Panic(U256::from(1)).to_string(),
            "with panic code 0x01 (Assertion error)"
        );
    }

    #[test]
    fn extracts_revert_data_from_rpc_errors() {
        let reason = reason_data("some reason");
        let err = error_response("execution reverted: some reason", Some(&reason));
        assert_eq!(revert_data(&err), Some(Bytes::from(reason)));
        assert_eq!(
            err.revert_kind(),
            Some(RevertKind::Reason("some reason".to_string()))
        );

        let err = error_response("execution reverted", None);
        assert_eq!(err.revert_kind(), Some(RevertKind::Empty));
    }

    #[test]
    fn non_revert_errors_are_not_classified() {
        let err = error_response("insufficient funds for gas * price + value", None);
        assert_eq!(revert_data(&err), None);
        assert_eq!(err.revert_kind(), None);

        let err: RpcError<TransportErrorKind> = RpcError::Transport(TransportErrorKind::BackendGone);
        assert_eq!(err.revert_kind(), None);
    }

    #[test]
    fn finds_rpc_errors_in_anyhow_chain() {
        let err = anyhow::Error::from(error_response("execution reverted", None))
            .context("Failed to send transaction");
        assert!(err.rpc_error().is_some());
        assert_eq!(err.revert_kind(), Some(RevertKind::Empty));

        let err = anyhow::anyhow!("not an RPC error");
        assert!(err.rpc_error().is_none());
    }

    #[test]
    fn finds_rpc_errors_in_contract_errors() {
        let err = ContractError::TransportError(error_response(
            "execution reverted",
            Some(&panic_data(0x11)),
        ));
        assert_eq!(err.revert_kind(), Some(RevertKind::Panic(U256::from(0x11))));
    }

    #[test]
    fn provider_error_keeps_code_and_message() {
        let err = error_response("insufficient funds for gas * price + value", None);
        let provider_error = ProviderError::from(&err);
        assert_eq!(provider_error.code, Some(3));
        assert_eq!(
            provider_error.message,
            "insufficient funds for gas * price + value"
        );

        let wrapped = anyhow::Error::from(provider_error).context("ShouldRevert::on_failed_send");
        assert!(wrapped.is_provider_error());
        assert!(wrapped.downcast_ref::<ProviderError>().is_some());
        assert_eq!(wrapped.revert_kind(), None);
    }

    #[test]
    fn alloy_errors_without_rpc_payload_are_provider_errors() {
        let err = ContractError::UnknownFunction("missing".to_string());
        assert!(err.rpc_error().is_none());
        assert!(err.is_provider_error());
        assert!(PendingTransactionError::FailedToRegister.is_provider_error());
        assert!(anyhow::Error::from(err).is_provider_error());
        assert!(!anyhow::anyhow!("not an RPC error").is_provider_error());
    }
}
