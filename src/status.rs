use crate::chain::TxReceipt;
use serde::Serialize;
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
};

/// Outcome of the most recent user action, as shown by the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub in_progress: bool,
    pub message: String,
}

impl ActionOutcome {
    pub fn in_progress(message: impl Into<String>) -> Self {
        Self {
            success: false,
            in_progress: true,
            message: message.into(),
        }
    }

    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            in_progress: false,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            in_progress: false,
            message: message.into(),
        }
    }
}

impl From<TxReceipt> for ActionOutcome {
    fn from(receipt: TxReceipt) -> Self {
        Self {
            success: receipt.success,
            in_progress: false,
            message: receipt.message,
        }
    }
}

/// Single-slot holder for the latest [`ActionOutcome`]. Clones share the slot.
///
/// Every write bumps a version so a synchronization pass can clear only what
/// was already showing when it started.
#[derive(Clone, Debug, Default)]
pub struct StatusReporter {
    slot: Arc<Mutex<Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    version: u64,
    outcome: Option<ActionOutcome>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, outcome: ActionOutcome) {
        let mut slot = self.lock();
        slot.version += 1;
        slot.outcome = Some(outcome);
    }

    pub fn clear(&self) {
        let mut slot = self.lock();
        slot.version += 1;
        slot.outcome = None;
    }

    pub fn current(&self) -> Option<ActionOutcome> {
        self.lock().outcome.clone()
    }

    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Clears the slot unless it was written after `version` was observed.
    pub fn clear_if_unchanged(&self, version: u64) -> bool {
        let mut slot = self.lock();
        if slot.version != version {
            return false;
        }
        if slot.outcome.take().is_some() {
            slot.version += 1;
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn set__overwrites_previous_outcome() {
        // given
        let status = StatusReporter::new();
        status.set(ActionOutcome::in_progress("Sending transaction..."));

        // when
        status.set(ActionOutcome::succeeded("Deposited 2 AVAX"));

        // then
        assert_eq!(
            status.current(),
            Some(ActionOutcome::succeeded("Deposited 2 AVAX"))
        );
    }

    #[test]
    fn clear__is_visible_through_every_clone() {
        // given
        let status = StatusReporter::new();
        let view = status.clone();
        status.set(ActionOutcome::failed("Claim failed: rejected"));

        // when
        status.clear();

        // then
        assert_eq!(view.current(), None);
    }

    #[test]
    fn clear_if_unchanged__newer_outcome_survives() {
        // given
        let status = StatusReporter::new();
        status.set(ActionOutcome::in_progress("Refreshing..."));
        let seen = status.version();
        status.set(ActionOutcome::succeeded("Tokens claimed"));

        // when
        let cleared = status.clear_if_unchanged(seen);

        // then
        assert!(!cleared);
        assert_eq!(status.current(), Some(ActionOutcome::succeeded("Tokens claimed")));
    }

    #[test]
    fn clear_if_unchanged__same_version__clears() {
        // given
        let status = StatusReporter::new();
        status.set(ActionOutcome::in_progress("Refreshing..."));
        let seen = status.version();

        // when
        let cleared = status.clear_if_unchanged(seen);

        // then
        assert!(cleared);
        assert_eq!(status.current(), None);
    }

    #[test]
    fn from_receipt__carries_success_flag_and_message() {
        let outcome = ActionOutcome::from(TxReceipt::failure("reverted"));
        assert!(!outcome.success);
        assert!(!outcome.in_progress);
        assert_eq!(outcome.message, "reverted");
    }
}
