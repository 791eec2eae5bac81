// Copyright (c) 2024 The Botho Foundation

//! Bridge execution state machine.

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BridgeError;
use crate::networks::Network;
use crate::request::{BridgeRequest, BridgeRoute, Quote};

/// Identifier used to discard results of executions that were reset.
pub type ExecutionId = Uuid;

/// Why an execution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Request could not be built (bad input, no listing, unknown network)
    Build,
    /// Fee quote unavailable
    Quote,
    /// Signer declined
    UserRejected,
    /// Transaction could not be submitted or confirmed
    Submission,
    /// Transaction was included but reverted
    ExecutionReverted,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Build => write!(f, "build"),
            FailureKind::Quote => write!(f, "quote"),
            FailureKind::UserRejected => write!(f, "user_rejected"),
            FailureKind::Submission => write!(f, "submission"),
            FailureKind::ExecutionReverted => write!(f, "execution_reverted"),
        }
    }
}

/// Terminal failure detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
    /// Hash of the broadcast transaction, if one was sent.
    pub tx_hash: Option<B256>,
}

impl Failure {
    /// Classify an error raised while in `stage`.
    pub fn from_error(stage: &ExecutionStatus, error: &BridgeError) -> Self {
        let kind = match (stage, error) {
            (_, BridgeError::UserRejected) => FailureKind::UserRejected,
            (_, BridgeError::ExecutionReverted { .. }) => FailureKind::ExecutionReverted,
            (_, BridgeError::QuoteUnavailable(_)) => FailureKind::Quote,
            (ExecutionStatus::Building, _) => FailureKind::Build,
            (ExecutionStatus::Quoting, _) => FailureKind::Quote,
            _ => FailureKind::Submission,
        };
        let tx_hash = match (stage, error) {
            (_, BridgeError::ExecutionReverted { tx_hash }) => Some(*tx_hash),
            (_, BridgeError::SubmissionError { tx_hash, .. }) if tx_hash.is_some() => *tx_hash,
            (ExecutionStatus::Submitted { tx_hash }, _) => Some(*tx_hash),
            _ => None,
        };
        Self {
            kind,
            reason: error.to_string(),
            tx_hash,
        }
    }

    /// Whether a transaction was broadcast before the failure.
    pub fn transaction_sent(&self) -> bool {
        self.tx_hash.is_some()
    }
}

/// Lifecycle of a bridge execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// No execution
    Idle,
    /// Resolving the route and encoding the payload
    Building,
    /// Waiting for the fee quote
    Quoting,
    /// Waiting for the signer
    AwaitingSignature,
    /// Transaction broadcast, waiting for inclusion
    Submitted { tx_hash: B256 },
    /// Included with success status
    Confirmed { tx_hash: B256 },
    /// Failed; see the failure kind
    Failed(Failure),
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Confirmed { .. } | ExecutionStatus::Failed(_)
        )
    }

    /// Non-idle and non-terminal.
    pub fn is_in_flight(&self) -> bool {
        !self.is_terminal() && *self != ExecutionStatus::Idle
    }

    /// Whether `next` is a legal successor of this status.
    pub fn can_advance_to(&self, next: &ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        match (self, next) {
            (Idle, Building) => true,
            (Building, Quoting) => true,
            (Quoting, AwaitingSignature) => true,
            (AwaitingSignature, Submitted { .. }) => true,
            (Submitted { .. }, Confirmed { .. }) => true,
            (Building | Quoting | AwaitingSignature | Submitted { .. }, Failed(_)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Idle => write!(f, "idle"),
            ExecutionStatus::Building => write!(f, "building"),
            ExecutionStatus::Quoting => write!(f, "quoting"),
            ExecutionStatus::AwaitingSignature => write!(f, "awaiting_signature"),
            ExecutionStatus::Submitted { tx_hash } => write!(f, "submitted: {}", tx_hash),
            ExecutionStatus::Confirmed { tx_hash } => write!(f, "confirmed: {}", tx_hash),
            ExecutionStatus::Failed(failure) => {
                write!(f, "failed ({}): {}", failure.kind, failure.reason)
            }
        }
    }
}

/// One attempt to bridge a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeExecution {
    /// Unique execution identifier
    pub id: ExecutionId,

    /// Form revision the execution was started from
    pub form_revision: u64,

    /// Request being executed, once built
    pub request: Option<BridgeRequest>,

    /// Resolved route, once built
    pub route: Option<BridgeRoute>,

    /// Quote the submission is paying, once quoted
    pub quote: Option<Quote>,

    /// Current status
    pub status: ExecutionStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl BridgeExecution {
    /// Start a new execution in `Building`.
    pub fn start(form_revision: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            form_revision,
            request: None,
            route: None,
            quote: None,
            status: ExecutionStatus::Building,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`. Returns false and leaves the status untouched when
    /// the transition is not legal.
    pub fn advance(&mut self, next: ExecutionStatus) -> bool {
        if !self.status.can_advance_to(&next) {
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        true
    }

    /// Mark the execution failed with an error raised in its current stage.
    pub fn fail(&mut self, error: &BridgeError) -> bool {
        let failure = Failure::from_error(&self.status, error);
        self.advance(ExecutionStatus::Failed(failure))
    }

    pub fn tx_hash(&self) -> Option<B256> {
        match &self.status {
            ExecutionStatus::Submitted { tx_hash } | ExecutionStatus::Confirmed { tx_hash } => {
                Some(*tx_hash)
            }
            ExecutionStatus::Failed(failure) => failure.tx_hash,
            _ => None,
        }
    }

    /// History record, once the request is known.
    pub fn history_entry(&self) -> Option<HistoryEntry> {
        let request = self.request.as_ref()?;
        let status = match &self.status {
            ExecutionStatus::Confirmed { .. } => HistoryStatus::Completed,
            ExecutionStatus::Failed(_) => HistoryStatus::Failed,
            _ => HistoryStatus::Pending,
        };
        Some(HistoryEntry {
            id: self.id,
            source: request.source,
            destination: request.destination,
            token: request.token.clone(),
            token_id: request.token_id.to_string(),
            status,
            tx_hash: self.tx_hash(),
            updated_at: self.updated_at,
        })
    }
}

/// Coarse status shown in the transaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryStatus::Pending => write!(f, "pending"),
            HistoryStatus::Completed => write!(f, "completed"),
            HistoryStatus::Failed => write!(f, "failed"),
        }
    }
}

/// In-session record of a bridge attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: ExecutionId,
    pub source: Network,
    pub destination: Network,
    pub token: String,
    pub token_id: String,
    pub status: HistoryStatus,
    pub tx_hash: Option<B256>,
    pub updated_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Settle a pending entry once the outcome of its transaction is known.
    /// Settled entries are left alone.
    pub fn resolve(&mut self, status: HistoryStatus) -> bool {
        if self.status != HistoryStatus::Pending || status == HistoryStatus::Pending {
            return false;
        }
        self.status = status;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};

    fn request() -> BridgeRequest {
        BridgeRequest {
            source: Network::Sepolia,
            destination: Network::BitlayerTestnet,
            token: "DTNS".to_string(),
            token_id: U256::from(7),
            recipient: Address::repeat_byte(0xaa),
            gas_limit: 200_000,
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let tx_hash = B256::repeat_byte(0x11);
        let mut execution = BridgeExecution::start(3);
        assert_eq!(execution.status, ExecutionStatus::Building);
        assert_eq!(execution.form_revision, 3);

        assert!(execution.advance(ExecutionStatus::Quoting));
        assert!(execution.advance(ExecutionStatus::AwaitingSignature));
        assert!(execution.advance(ExecutionStatus::Submitted { tx_hash }));
        assert!(execution.status.is_in_flight());
        assert!(execution.advance(ExecutionStatus::Confirmed { tx_hash }));
        assert!(execution.status.is_terminal());
        assert_eq!(execution.tx_hash(), Some(tx_hash));
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut execution = BridgeExecution::start(0);
        assert!(!execution.advance(ExecutionStatus::AwaitingSignature));
        assert!(!execution.advance(ExecutionStatus::Confirmed {
            tx_hash: B256::ZERO
        }));
        assert_eq!(execution.status, ExecutionStatus::Building);

        assert!(execution.fail(&BridgeError::InvalidRoute(Network::Sepolia)));
        // Terminal states have no successors.
        assert!(!execution.advance(ExecutionStatus::Quoting));
        assert!(!execution.fail(&BridgeError::UserRejected));
    }

    #[test]
    fn test_failure_classification() {
        let building = Failure::from_error(
            &ExecutionStatus::Building,
            &BridgeError::UnknownNetwork("arbitrum".into()),
        );
        assert_eq!(building.kind, FailureKind::Build);
        assert!(!building.transaction_sent());

        let quoting = Failure::from_error(
            &ExecutionStatus::Quoting,
            &BridgeError::QuoteUnavailable("timeout".into()),
        );
        assert_eq!(quoting.kind, FailureKind::Quote);

        let rejected =
            Failure::from_error(&ExecutionStatus::AwaitingSignature, &BridgeError::UserRejected);
        assert_eq!(rejected.kind, FailureKind::UserRejected);
        assert!(!rejected.transaction_sent());

        let tx_hash = B256::repeat_byte(0x22);
        let reverted = Failure::from_error(
            &ExecutionStatus::Submitted { tx_hash },
            &BridgeError::ExecutionReverted { tx_hash },
        );
        assert_eq!(reverted.kind, FailureKind::ExecutionReverted);
        assert!(reverted.transaction_sent());

        let lost = Failure::from_error(
            &ExecutionStatus::Submitted { tx_hash },
            &BridgeError::submission("receipt timeout"),
        );
        assert_eq!(lost.kind, FailureKind::Submission);
        assert_eq!(lost.tx_hash, Some(tx_hash));
    }

    #[test]
    fn test_history_entry() {
        let mut execution = BridgeExecution::start(0);
        assert!(execution.history_entry().is_none());

        execution.request = Some(request());
        let entry = execution.history_entry().unwrap();
        assert_eq!(entry.status, HistoryStatus::Pending);
        assert_eq!(entry.token_id, "7");

        execution.fail(&BridgeError::UserRejected);
        assert_eq!(
            execution.history_entry().unwrap().status,
            HistoryStatus::Failed
        );
    }

    #[test]
    fn test_resolve_pending_entry() {
        let tx_hash = B256::repeat_byte(0x11);
        let mut execution = BridgeExecution::start(0);
        execution.request = Some(request());
        execution.advance(ExecutionStatus::Quoting);
        execution.advance(ExecutionStatus::AwaitingSignature);
        execution.advance(ExecutionStatus::Submitted { tx_hash });

        let mut entry = execution.history_entry().unwrap();
        assert_eq!(entry.status, HistoryStatus::Pending);
        assert!(!entry.resolve(HistoryStatus::Pending));

        assert!(entry.resolve(HistoryStatus::Completed));
        assert_eq!(entry.status, HistoryStatus::Completed);
        assert_eq!(entry.tx_hash, Some(tx_hash));

        assert!(!entry.resolve(HistoryStatus::Failed));
        assert_eq!(entry.status, HistoryStatus::Completed);
    }
}
