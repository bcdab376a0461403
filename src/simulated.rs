//! In-memory presale contract and wallet provider.
//!
//! Drives the `presale-sim` binary and the tests. Reads can be failed per
//! field or held back until released, which is how the tests observe what a
//! half-finished pass does.

use crate::{
    amount::Amount,
    chain::{
        ChainReader,
        TransactionExecutor,
        TxReceipt,
    },
    phase::PresalePhase,
    wallet_session::{
        WalletConnector,
        WalletSession,
    },
};
use color_eyre::eyre::{
    self,
    bail,
    eyre,
};
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
};
use tokio::sync::watch;
use tracing::debug;

/// Tokens credited per whole unit deposited.
pub const TOKENS_PER_UNIT: u128 = 1_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReadField {
    Phase,
    TotalDeposited,
    UserDeposited,
    UserTokenBalance,
    AirdropCompleted,
    Claimed,
    Countdown,
    NativeBalance,
}

/// A state-changing call seen by the simulated executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxCall {
    Deposit { address: String, amount: Amount },
    WithdrawAll { address: String },
    SeedLiquidity { address: String },
    ClaimTokens { address: String },
    AirdropAll,
}

#[derive(Debug, Default)]
struct Ledger {
    raw_phase: u64,
    countdown: u64,
    airdrop_completed: bool,
    total_deposited: Amount,
    balances: HashMap<String, Amount>,
    deposits: HashMap<String, Amount>,
    tokens: HashMap<String, Amount>,
    claimed: HashSet<String>,
    failing_reads: HashSet<ReadField>,
    fail_all_reads: bool,
    transport_error: Option<String>,
    calls: Vec<TxCall>,
    phase_reads: usize,
    providers: HashMap<String, String>,
    declines_silent: bool,
    connected: Vec<String>,
}

impl Ledger {
    fn phase(&self) -> Option<PresalePhase> {
        PresalePhase::from_raw(self.raw_phase)
    }

    fn balance(&self, address: &str) -> Amount {
        self.balances.get(address).copied().unwrap_or_default()
    }

    fn deposited(&self, address: &str) -> Amount {
        self.deposits.get(address).copied().unwrap_or_default()
    }

    fn tokens_for(deposit: Amount) -> Amount {
        Amount::from_base_units(deposit.base_units().saturating_mul(TOKENS_PER_UNIT))
    }

    fn credit(&mut self, address: &str) -> Amount {
        let tokens = Self::tokens_for(self.deposited(address));
        self.tokens.insert(address.to_string(), tokens);
        self.claimed.insert(address.to_string());
        tokens
    }
}

#[derive(Clone)]
pub struct SimulatedPresale {
    ledger: Arc<Mutex<Ledger>>,
    reads_open: Arc<watch::Sender<bool>>,
}

impl Default for SimulatedPresale {
    fn default() -> Self {
        Self {
            ledger: Arc::default(),
            reads_open: Arc::new(watch::Sender::new(true)),
        }
    }
}

impl SimulatedPresale {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_phase(&self, phase: PresalePhase) {
        self.lock().raw_phase = phase.as_raw();
    }

    /// Stores a phase index without checking that it is known.
    pub fn set_raw_phase(&self, raw: u64) {
        self.lock().raw_phase = raw;
    }

    pub fn set_countdown(&self, seconds: u64) {
        self.lock().countdown = seconds;
    }

    pub fn fund(&self, address: &str, amount: Amount) {
        let mut ledger = self.lock();
        let balance = ledger.balance(address).checked_add(amount).unwrap_or(amount);
        ledger.balances.insert(address.to_string(), balance);
    }

    /// Moves `amount` from the wallet into the contract, bypassing the
    /// executor and its phase checks.
    pub fn deposit_directly(&self, address: &str, amount: Amount) {
        let mut ledger = self.lock();
        Self::apply_deposit(&mut *ledger, address, amount);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_all_reads = fail;
    }

    pub fn fail_field(&self, field: ReadField, fail: bool) {
        let mut ledger = self.lock();
        if fail {
            ledger.failing_reads.insert(field);
        } else {
            ledger.failing_reads.remove(&field);
        }
    }

    /// Makes every executor call error out as if the transport was down.
    pub fn fail_transactions(&self, reason: Option<&str>) {
        self.lock().transport_error = reason.map(str::to_string);
    }

    /// Holds every read until [`SimulatedPresale::release_reads`].
    pub fn hold_reads(&self) {
        self.reads_open.send_replace(false);
    }

    pub fn release_reads(&self) {
        self.reads_open.send_replace(true);
    }

    /// Executor calls so far, oldest first.
    pub fn calls(&self) -> Vec<TxCall> {
        self.lock().calls.clone()
    }

    /// Number of phase reads served, one per synchronization pass.
    pub fn phase_reads(&self) -> usize {
        self.lock().phase_reads
    }

    pub fn deposited(&self, address: &str) -> Amount {
        self.lock().deposited(address)
    }

    /// Makes `label` connectable and resolve to `address`.
    pub fn register_provider(&self, label: &str, address: &str) {
        self.lock()
            .providers
            .insert(label.to_string(), address.to_string());
    }

    /// When set, silent connection requests are answered with `None`.
    pub fn decline_silent(&self, decline: bool) {
        self.lock().declines_silent = decline;
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_deposit(ledger: &mut Ledger, address: &str, amount: Amount) {
        let balance = ledger.balance(address).saturating_sub(amount);
        ledger.balances.insert(address.to_string(), balance);
        let deposited = ledger.deposited(address).checked_add(amount).unwrap_or(amount);
        ledger.deposits.insert(address.to_string(), deposited);
        ledger.total_deposited = ledger
            .total_deposited
            .checked_add(amount)
            .unwrap_or(ledger.total_deposited);
    }

    async fn read<T>(
        &self,
        field: ReadField,
        value: impl FnOnce(&mut Ledger) -> T,
    ) -> eyre::Result<T> {
        let mut open = self.reads_open.subscribe();
        if open.wait_for(|open| *open).await.is_err() {
            bail!("simulated node went away");
        }
        let mut ledger = self.lock();
        if ledger.fail_all_reads || ledger.failing_reads.contains(&field) {
            bail!("simulated read of {field:?} failed");
        }
        Ok(value(&mut *ledger))
    }

    /// Records the call and returns the guard, or the injected transport error.
    fn submit(&self, call: TxCall) -> eyre::Result<MutexGuard<'_, Ledger>> {
        let mut ledger = self.lock();
        debug!(?call, "simulated transaction");
        ledger.calls.push(call);
        if let Some(reason) = ledger.transport_error.clone() {
            return Err(eyre!(reason));
        }
        Ok(ledger)
    }
}

impl ChainReader for SimulatedPresale {
    async fn phase(&self) -> eyre::Result<u64> {
        self.read(ReadField::Phase, |ledger| {
            ledger.phase_reads += 1;
            ledger.raw_phase
        })
        .await
    }

    async fn total_deposited(&self) -> eyre::Result<String> {
        self.read(ReadField::TotalDeposited, |ledger| {
            ledger.total_deposited.to_string()
        })
        .await
    }

    async fn user_deposited(&self, address: &str) -> eyre::Result<String> {
        self.read(ReadField::UserDeposited, |ledger| {
            ledger.deposited(address).to_string()
        })
        .await
    }

    async fn user_token_balance(&self, address: &str) -> eyre::Result<String> {
        self.read(ReadField::UserTokenBalance, |ledger| {
            ledger
                .tokens
                .get(address)
                .copied()
                .unwrap_or_default()
                .to_string()
        })
        .await
    }

    async fn airdrop_completed(&self) -> eyre::Result<bool> {
        self.read(ReadField::AirdropCompleted, |ledger| ledger.airdrop_completed)
            .await
    }

    async fn claimed(&self, address: &str) -> eyre::Result<bool> {
        self.read(ReadField::Claimed, |ledger| ledger.claimed.contains(address))
            .await
    }

    async fn countdown(&self) -> eyre::Result<u64> {
        self.read(ReadField::Countdown, |ledger| ledger.countdown).await
    }

    async fn native_balance(&self, address: &str) -> eyre::Result<String> {
        self.read(ReadField::NativeBalance, |ledger| {
            format!("0x{:x}", ledger.balance(address).base_units())
        })
        .await
    }
}

impl TransactionExecutor for SimulatedPresale {
    async fn deposit(&self, amount: Amount, address: &str) -> eyre::Result<TxReceipt> {
        let mut ledger = self.submit(TxCall::Deposit {
            address: address.to_string(),
            amount,
        })?;
        if ledger.phase() != Some(PresalePhase::Presale) {
            return Ok(TxReceipt::failure("Presale is not active"));
        }
        if ledger.balance(address) < amount {
            return Ok(TxReceipt::failure("Insufficient AVAX balance"));
        }
        Self::apply_deposit(&mut *ledger, address, amount);
        Ok(TxReceipt::success(format!("Deposited {amount} AVAX")))
    }

    async fn withdraw_all(&self, address: &str) -> eyre::Result<TxReceipt> {
        let mut ledger = self.submit(TxCall::WithdrawAll {
            address: address.to_string(),
        })?;
        if !matches!(
            ledger.phase(),
            Some(PresalePhase::Presale | PresalePhase::SeedLiquidity)
        ) {
            return Ok(TxReceipt::failure("Withdrawals are closed"));
        }
        let deposited = ledger.deposited(address);
        if deposited.is_zero() {
            return Ok(TxReceipt::failure("Nothing to withdraw"));
        }
        ledger.deposits.remove(address);
        ledger.total_deposited = ledger.total_deposited.saturating_sub(deposited);
        let balance = ledger.balance(address).checked_add(deposited).unwrap_or(deposited);
        ledger.balances.insert(address.to_string(), balance);
        Ok(TxReceipt::success(format!("Withdrew {deposited} AVAX")))
    }

    async fn seed_liquidity(&self, address: &str) -> eyre::Result<TxReceipt> {
        let mut ledger = self.submit(TxCall::SeedLiquidity {
            address: address.to_string(),
        })?;
        if ledger.phase() != Some(PresalePhase::SeedLiquidity) {
            return Ok(TxReceipt::failure("Liquidity cannot be seeded now"));
        }
        ledger.raw_phase = PresalePhase::Airdrop.as_raw();
        Ok(TxReceipt::success("Liquidity seeded"))
    }

    async fn claim_tokens(&self, address: &str) -> eyre::Result<TxReceipt> {
        let mut ledger = self.submit(TxCall::ClaimTokens {
            address: address.to_string(),
        })?;
        if ledger.phase() != Some(PresalePhase::Airdrop) || ledger.airdrop_completed {
            return Ok(TxReceipt::failure("Claiming is closed"));
        }
        if ledger.claimed.contains(address) {
            return Ok(TxReceipt::failure("Already claimed"));
        }
        let tokens = ledger.credit(address);
        Ok(TxReceipt::success(format!("Claimed {tokens} BRO")))
    }

    async fn airdrop_all(&self) -> eyre::Result<TxReceipt> {
        let mut ledger = self.submit(TxCall::AirdropAll)?;
        if ledger.phase() != Some(PresalePhase::Airdrop) || ledger.airdrop_completed {
            return Ok(TxReceipt::failure("Airdrop is closed"));
        }
        let pending: Vec<String> = ledger
            .deposits
            .keys()
            .filter(|address| !ledger.claimed.contains(*address))
            .cloned()
            .collect();
        for address in &pending {
            ledger.credit(address);
        }
        ledger.airdrop_completed = true;
        Ok(TxReceipt::success(format!(
            "Airdropped to {} wallets",
            pending.len()
        )))
    }
}

impl WalletConnector for SimulatedPresale {
    async fn connect(&self, label: &str, silent: bool) -> eyre::Result<Option<WalletSession>> {
        let mut ledger = self.lock();
        let Some(address) = ledger.providers.get(label).cloned() else {
            bail!("wallet provider {label} is not available");
        };
        if silent && ledger.declines_silent {
            return Ok(None);
        }
        ledger.connected.retain(|existing| existing != label);
        ledger.connected.insert(0, label.to_string());
        Ok(Some(WalletSession::new(label, address)))
    }

    async fn disconnect(&self, label: &str) -> eyre::Result<()> {
        self.lock().connected.retain(|existing| existing != label);
        Ok(())
    }

    fn connected_labels(&self) -> Vec<String> {
        self.lock().connected.clone()
    }
}
