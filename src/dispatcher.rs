//! Phase-gated user actions.
//!
//! The dispatcher never moves the presale between phases. It decides which
//! actions the current snapshot allows, rejects anything else before touching
//! the chain, and reports each transaction through the [`StatusReporter`].

use crate::{
    amount::Amount,
    chain::TransactionExecutor,
    error::{
        TransactionError,
        ValidationError,
    },
    phase::PresalePhase,
    snapshot::Snapshot,
    status::{
        ActionOutcome,
        StatusReporter,
    },
    sync::{
        SyncHandle,
        SyncTrigger,
    },
    wallet_session::WalletSession,
};
use std::{
    fmt,
    sync::Arc,
};
use tracing::{
    info,
    warn,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Deposit,
    WithdrawAll,
    SeedLiquidity,
    ClaimTokens,
    AirdropAll,
    Refresh,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Deposit,
        ActionKind::WithdrawAll,
        ActionKind::SeedLiquidity,
        ActionKind::ClaimTokens,
        ActionKind::AirdropAll,
        ActionKind::Refresh,
    ];

    /// Phase table. Public sale offers nothing; buying happens on an external
    /// marketplace.
    pub fn enabled_in(self, phase: PresalePhase) -> bool {
        use ActionKind::*;
        match phase {
            PresalePhase::Presale => matches!(self, Deposit | WithdrawAll | Refresh),
            PresalePhase::SeedLiquidity => matches!(self, WithdrawAll | SeedLiquidity),
            PresalePhase::Airdrop => matches!(self, ClaimTokens | AirdropAll),
            PresalePhase::WhitelistIdo => matches!(self, Refresh),
            PresalePhase::PublicSale => false,
        }
    }

    fn requires_wallet(self) -> bool {
        !matches!(self, ActionKind::Refresh)
    }

    /// Snapshot-dependent conditions on top of the phase table.
    fn check_state(self, snapshot: &Snapshot) -> Result<(), ValidationError> {
        match self {
            ActionKind::ClaimTokens if snapshot.airdrop_completed => {
                Err(ValidationError::AirdropCompleted)
            }
            ActionKind::ClaimTokens if snapshot.user_claimed => {
                Err(ValidationError::AlreadyClaimed)
            }
            ActionKind::AirdropAll if snapshot.airdrop_completed => {
                Err(ValidationError::AirdropCompleted)
            }
            _ => Ok(()),
        }
    }

    fn pending_message(self) -> &'static str {
        match self {
            ActionKind::Deposit | ActionKind::WithdrawAll => "Sending transaction...",
            ActionKind::SeedLiquidity => "Seeding LP...",
            ActionKind::ClaimTokens => "Claiming tokens...",
            ActionKind::AirdropAll => "Airdropping to all...",
            ActionKind::Refresh => "Refreshing...",
        }
    }

    /// Prefix of the failure message shown when the call itself errors.
    fn operation(self) -> &'static str {
        match self {
            ActionKind::Deposit => "Transaction",
            ActionKind::WithdrawAll => "Withdraw",
            ActionKind::SeedLiquidity => "Seed LP",
            ActionKind::ClaimTokens => "Claim",
            ActionKind::AirdropAll => "AirdropAll",
            ActionKind::Refresh => "Refresh",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Deposit => "Deposit",
            ActionKind::WithdrawAll => "Withdraw",
            ActionKind::SeedLiquidity => "Seed LP",
            ActionKind::ClaimTokens => "Claim",
            ActionKind::AirdropAll => "Airdrop all",
            ActionKind::Refresh => "Refresh",
        };
        f.write_str(name)
    }
}

/// Actions the presentation layer should offer for `snapshot`.
pub fn available_actions(snapshot: &Snapshot) -> Vec<ActionKind> {
    ActionKind::ALL
        .into_iter()
        .filter(|kind| kind.enabled_in(snapshot.phase))
        .filter(|kind| kind.check_state(snapshot).is_ok())
        .collect()
}

/// A state-changing request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Deposit(Amount),
    WithdrawAll,
    SeedLiquidity,
    ClaimTokens,
    AirdropAll,
}

impl Action {
    pub fn kind(self) -> ActionKind {
        match self {
            Action::Deposit(_) => ActionKind::Deposit,
            Action::WithdrawAll => ActionKind::WithdrawAll,
            Action::SeedLiquidity => ActionKind::SeedLiquidity,
            Action::ClaimTokens => ActionKind::ClaimTokens,
            Action::AirdropAll => ActionKind::AirdropAll,
        }
    }
}

/// Checks `kind` against the snapshot and wallet without side effects.
pub fn validate<'a>(
    kind: ActionKind,
    snapshot: &Snapshot,
    wallet: Option<&'a WalletSession>,
) -> Result<Option<&'a WalletSession>, ValidationError> {
    if !kind.enabled_in(snapshot.phase) {
        return Err(ValidationError::NotAvailable {
            action: kind,
            phase: snapshot.phase,
        });
    }
    if kind.requires_wallet() && wallet.is_none() {
        return Err(ValidationError::WalletNotConnected);
    }
    kind.check_state(snapshot)?;
    Ok(wallet)
}

pub struct ActionDispatcher<E> {
    executor: Arc<E>,
    sync: SyncHandle,
    status: StatusReporter,
    min_deposit: Amount,
}

impl<E: TransactionExecutor> ActionDispatcher<E> {
    pub fn new(
        executor: Arc<E>,
        sync: SyncHandle,
        status: StatusReporter,
        min_deposit: Amount,
    ) -> Self {
        Self {
            executor,
            sync,
            status,
            min_deposit,
        }
    }

    /// Deposit using the raw text of an amount field.
    pub async fn deposit_text(&self, raw: &str) -> Result<ActionOutcome, ValidationError> {
        match raw.parse::<Amount>() {
            Ok(amount) => self.dispatch(Action::Deposit(amount)).await,
            Err(err) => Err(self.reject(ActionKind::Deposit, err.into())),
        }
    }

    /// Runs one action: validate, mark in progress, call the executor, record
    /// the outcome, then request a follow-up synchronization.
    pub async fn dispatch(&self, action: Action) -> Result<ActionOutcome, ValidationError> {
        let kind = action.kind();
        let snapshot = self.sync.snapshot();
        let wallet = self.sync.wallet();

        let address = match self.check(action, &snapshot, wallet.as_ref()) {
            Ok(address) => address,
            Err(err) => return Err(self.reject(kind, err)),
        };

        self.status.set(ActionOutcome::in_progress(kind.pending_message()));
        info!(%kind, %address, "submitting transaction");

        let result = match action {
            Action::Deposit(amount) => self.executor.deposit(amount, &address).await,
            Action::WithdrawAll => self.executor.withdraw_all(&address).await,
            Action::SeedLiquidity => self.executor.seed_liquidity(&address).await,
            Action::ClaimTokens => self.executor.claim_tokens(&address).await,
            Action::AirdropAll => self.executor.airdrop_all().await,
        };

        let outcome = match result {
            Ok(receipt) => {
                if !receipt.success {
                    warn!(%kind, message = %receipt.message, "transaction rejected");
                }
                ActionOutcome::from(receipt)
            }
            Err(err) => {
                let error = TransactionError {
                    operation: kind.operation(),
                    reason: err.to_string(),
                };
                warn!(%error, "transaction failed");
                ActionOutcome::failed(error.to_string())
            }
        };

        self.status.set(outcome.clone());
        self.sync.refresh(SyncTrigger::Action);
        Ok(outcome)
    }

    /// Manual refresh. The resulting pass clears the status on success.
    pub fn refresh(&self) -> Result<(), ValidationError> {
        let snapshot = self.sync.snapshot();
        if let Err(err) = validate(ActionKind::Refresh, &snapshot, None) {
            return Err(self.reject(ActionKind::Refresh, err));
        }
        self.status
            .set(ActionOutcome::in_progress(ActionKind::Refresh.pending_message()));
        self.sync.refresh(SyncTrigger::Manual);
        Ok(())
    }

    fn check(
        &self,
        action: Action,
        snapshot: &Snapshot,
        wallet: Option<&WalletSession>,
    ) -> Result<String, ValidationError> {
        let wallet = validate(action.kind(), snapshot, wallet)?
            .ok_or(ValidationError::WalletNotConnected)?;
        if let Action::Deposit(requested) = action
            && requested < self.min_deposit
        {
            return Err(ValidationError::BelowMinimum {
                requested,
                minimum: self.min_deposit,
            });
        }
        Ok(wallet.address.clone())
    }

    fn reject(&self, kind: ActionKind, err: ValidationError) -> ValidationError {
        info!(%kind, %err, "action rejected");
        self.status.set(ActionOutcome::failed(err.to_string()));
        err
    }
}
