use crate::{
    amount::{
        Amount,
        AmountError,
    },
    dispatcher::ActionKind,
    phase::PresalePhase,
};
use thiserror::Error;

/// A request rejected before anything was sent to the chain. The message is
/// user facing.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Connect your wallet first.")]
    WalletNotConnected,
    #[error("Minimum {minimum} AVAX required.")]
    BelowMinimum { requested: Amount, minimum: Amount },
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
    #[error("{action} is not available during {phase}.")]
    NotAvailable {
        action: ActionKind,
        phase: PresalePhase,
    },
    #[error("Tokens already claimed.")]
    AlreadyClaimed,
    #[error("All tokens have been airdropped!")]
    AirdropCompleted,
}

/// A synchronization pass that could not produce a complete snapshot.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("failed to read {field}: {reason}")]
    Read { field: &'static str, reason: String },
    #[error("invalid {field} value: {source}")]
    Parse {
        field: &'static str,
        #[source]
        source: AmountError,
    },
    #[error("contract reported unknown phase {0}")]
    UnknownPhase(u64),
}

impl SyncError {
    pub fn read(field: &'static str, err: color_eyre::eyre::Report) -> Self {
        Self::Read {
            field,
            reason: err.to_string(),
        }
    }
}

/// A contract call that failed or could not be submitted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{operation} failed: {reason}")]
pub struct TransactionError {
    pub operation: &'static str,
    pub reason: String,
}

/// Session storage failure. Always swallowed by the session store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access session storage: {0}")]
    Storage(String),
    #[error("stored session record is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
