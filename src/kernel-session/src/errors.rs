use std::time::Duration;

use alloy_primitives::B256;
use thiserror::Error;

/// Failures talking JSON-RPC (chain node, bundler, paymaster) or the passkey server.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Connection, TLS or timeout failure before a response was read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx status with the body passed through.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `eth_call` returned data that does not decode as the expected ABI type.
    #[error("ABI decode error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    /// JSON-RPC error object returned by the remote.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },
}

impl RpcError {
    /// Transport-level failures: the request may not have reached the service.
    pub fn is_transport(&self) -> bool {
        match self {
            RpcError::Http(_) => true,
            RpcError::Status { status, .. } => *status >= 500 || *status == 429,
            RpcError::Json(_) | RpcError::Abi(_) | RpcError::Rpc { .. } => false,
        }
    }

    /// `eth_call` reverts surface as JSON-RPC errors (code 3 or an "execution reverted" message).
    pub fn is_revert(&self) -> bool {
        match self {
            RpcError::Rpc { code, message, .. } => {
                *code == 3 || message.to_ascii_lowercase().contains("revert")
            }
            _ => false,
        }
    }
}

/// Which on-chain verification entrypoint produced a verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VerifierKind {
    /// `verifySignature(owner, hash, sig)` on a requestor that forwards to `isValidSignature`.
    Erc1271,
    /// `isValidSig(owner, hash, sig)` on the universal ERC-6492 validator.
    Universal,
    /// `verifyOrderSignature(SignedOrder)` on an order gateway.
    TypedOrder,
}

impl std::fmt::Display for VerifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VerifierKind::Erc1271 => "erc1271",
            VerifierKind::Universal => "universal",
            VerifierKind::TypedOrder => "typed-order",
        };
        f.write_str(name)
    }
}

/// Error taxonomy of the session client.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid permission entry #{index}: {reason}")]
    InvalidPermissionEntry { index: usize, reason: String },

    #[error("authority composition failed: {0}")]
    AuthorityComposition(String),

    #[error("session deserialization failed: {0}")]
    Deserialization(String),

    #[error("call encoding failed: {0}")]
    Encoding(String),

    #[error("paymaster sponsorship failed: {0}")]
    SponsorshipFailure(#[source] RpcError),

    #[error("bundler rejected user operation: {0}")]
    SubmissionFailure(#[source] RpcError),

    /// No receipt within the bound. The operation may still be included later.
    #[error("no receipt for user operation {hash} after {waited:?}")]
    ReceiptTimeout { hash: B256, waited: Duration },

    /// Included on-chain but execution reverted; `reason` is the bundler's text verbatim.
    #[error("user operation {hash} reverted: {}", .reason.as_deref().unwrap_or("<no reason>"))]
    OnChainRevert { hash: B256, reason: Option<String> },

    #[error("order hash mismatch: local {local} != on-chain {onchain}")]
    HashMismatch { local: B256, onchain: B256 },

    #[error("signature rejected by {verifier} verifier")]
    VerificationFailure { verifier: VerifierKind },

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("passkey ceremony failed: {0}")]
    Passkey(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl SessionError {
    /// True when repeating the same call unchanged may succeed (service unavailable, transport).
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::SponsorshipFailure(e)
            | SessionError::SubmissionFailure(e)
            | SessionError::Rpc(e) => e.is_transport(),
            _ => false,
        }
    }

    /// Outcome unknown: the caller must re-query before retrying.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, SessionError::ReceiptTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_ambiguous_and_revert_is_not() {
        let timeout = SessionError::ReceiptTimeout {
            hash: B256::ZERO,
            waited: Duration::from_secs(1),
        };
        let revert = SessionError::OnChainRevert {
            hash: B256::ZERO,
            reason: Some("AA23 reverted".into()),
        };
        assert!(timeout.is_ambiguous());
        assert!(!revert.is_ambiguous());
        assert!(!timeout.is_retryable());
        assert!(revert.to_string().contains("AA23 reverted"));
    }

    #[test]
    fn only_unavailability_is_retryable() {
        let rejected = RpcError::Rpc {
            code: -32500,
            message: "AA25 invalid account nonce".into(),
            data: None,
        };
        assert!(!SessionError::SubmissionFailure(rejected).is_retryable());

        let unavailable = RpcError::Status {
            status: 503,
            body: String::new(),
        };
        assert!(SessionError::SponsorshipFailure(unavailable).is_retryable());
    }

    #[test]
    fn revert_detection() {
        let revert = RpcError::Rpc {
            code: -32000,
            message: "execution reverted".into(),
            data: None,
        };
        assert!(revert.is_revert());
        let other = RpcError::Rpc {
            code: -32601,
            message: "method not found".into(),
            data: None,
        };
        assert!(!other.is_revert());
    }
}
