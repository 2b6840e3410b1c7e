//! Error definitions for the local chain and the bridging SDK.
//!
//! Public functions return `anyhow::Result`; these enums are the typed
//! failures wrapped inside, so callers can `downcast_ref` when they need to
//! tell a revert apart from an SDK sequencing error.

use ethereum_types::{Address, H256};
use thiserror::Error;

/// Failures raised by the local chain while deploying or calling contracts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("execution reverted: {0}")]
    Revert(String),

    #[error("no contract deployed at {0:#x}")]
    NoContract(Address),

    #[error("contract at {address:#x} has no method `{method}`")]
    UnknownMethod { address: Address, method: String },

    #[error("invalid arguments for `{method}`: {reason}")]
    InvalidArguments { method: String, reason: String },

    #[error("unknown transaction {0:#x}")]
    UnknownTransaction(H256),

    #[error("unknown signer index {0}")]
    UnknownSigner(usize),
}

impl ChainError {
    /// Shorthand for a contract revert with a reason string.
    pub fn revert(reason: impl Into<String>) -> Self {
        ChainError::Revert(reason.into())
    }
}

/// Failures raised by the bridging SDK and the mock verification network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    #[error("chain `{0}` has not been registered")]
    UnknownChain(String),

    #[error("asset `{asset}` is not supported on `{chain}`")]
    UnsupportedAsset { asset: String, chain: String },

    #[error("unsupported transfer route: {0}")]
    UnsupportedRoute(String),

    #[error("stage `{stage}` called before `{requires}` completed")]
    StageOutOfOrder {
        stage: &'static str,
        requires: &'static str,
    },

    #[error("stage `{0}` has already been processed")]
    AlreadyProcessed(&'static str),

    #[error("source transaction has not been submitted")]
    NotSubmitted,

    #[error("expected log not found in transaction {0:#x}")]
    MissingLog(H256),

    #[error("verification network rejected request: {0}")]
    Rejected(String),
}
