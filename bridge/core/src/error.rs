// Copyright (c) 2024 The Botho Foundation

//! Bridge error taxonomy.

use alloy_primitives::B256;

use crate::networks::Network;

/// Where in the bridge flow an error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    /// Local input problem. Nothing was sent; fix the input.
    Validation,
    /// External call failed before any transaction was broadcast.
    PreSubmission,
    /// A transaction was broadcast; gas may already be spent.
    PostSubmission,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Token {token} has no listing on {network}")]
    NoListing { token: String, network: Network },

    #[error("Invalid route: source and destination are both {0}")]
    InvalidRoute(Network),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Fee quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("Quote does not cover the message being submitted")]
    StaleQuote,

    #[error("Signature request rejected by user")]
    UserRejected,

    #[error("Submission failed: {reason}")]
    SubmissionError {
        reason: String,
        /// Set when the transaction was broadcast before the failure.
        tx_hash: Option<B256>,
    },

    #[error("Transaction {tx_hash} reverted on-chain")]
    ExecutionReverted { tx_hash: B256 },

    #[error("A bridge execution is already in flight ({0})")]
    ExecutionInFlight(uuid::Uuid),

    #[error("Execution {0} was reset; result discarded")]
    Discarded(uuid::Uuid),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    pub fn submission(reason: impl Into<String>) -> Self {
        BridgeError::SubmissionError {
            reason: reason.into(),
            tx_hash: None,
        }
    }

    pub fn phase(&self) -> ErrorPhase {
        match self {
            BridgeError::UnknownNetwork(_)
            | BridgeError::NoListing { .. }
            | BridgeError::InvalidRoute(_)
            | BridgeError::InvalidInput(_)
            | BridgeError::NotConnected
            | BridgeError::ExecutionInFlight(_)
            | BridgeError::Config(_) => ErrorPhase::Validation,
            BridgeError::SubmissionError {
                tx_hash: Some(_), ..
            }
            | BridgeError::ExecutionReverted { .. } => ErrorPhase::PostSubmission,
            BridgeError::Wallet(_)
            | BridgeError::QuoteUnavailable(_)
            | BridgeError::StaleQuote
            | BridgeError::UserRejected
            | BridgeError::SubmissionError { tx_hash: None, .. }
            | BridgeError::Discarded(_) => ErrorPhase::PreSubmission,
        }
    }

    /// Whether a new explicit attempt can reasonably succeed without
    /// changing any input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::QuoteUnavailable(_)
                | BridgeError::SubmissionError { .. }
                | BridgeError::StaleQuote
                | BridgeError::Wallet(_)
        )
    }
}
