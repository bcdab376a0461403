//! Snapshot synchronization.
//!
//! A single worker task owns the canonical [`Snapshot`]. It runs one pass at
//! startup, one per poll interval and one per wallet change or explicit
//! request. Only one pass is in flight at a time; requests arriving meanwhile
//! are folded into one queued pass. A pass either replaces the snapshot as a
//! whole or leaves it untouched.

use crate::{
    amount::Amount,
    chain::ChainReader,
    error::SyncError,
    phase::PresalePhase,
    snapshot::Snapshot,
    status::StatusReporter,
    wallet_session::WalletSession,
};
use color_eyre::eyre;
use futures::future::BoxFuture;
use std::{
    future::Future,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{
        broadcast,
        mpsc,
        watch,
    },
    task::JoinHandle,
    time::{
        self,
        MissedTickBehavior,
    },
};
use tracing::{
    debug,
    info,
    warn,
};

const EVENT_CAPACITY: usize = 64;

/// Why a pass was started. Ordered by precedence when requests are merged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyncTrigger {
    /// Follow-up to a dispatched action.
    Action,
    Periodic,
    Manual,
    Startup,
    WalletChanged,
}

impl SyncTrigger {
    /// Whether a successful pass with this trigger clears the status slot.
    /// Action follow-ups leave the action's outcome visible.
    pub fn clears_status(self) -> bool {
        !matches!(self, SyncTrigger::Action)
    }

    fn merge(self, other: SyncTrigger) -> SyncTrigger {
        self.max(other)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    Synced {
        trigger: SyncTrigger,
    },
    Failed {
        trigger: SyncTrigger,
        error: SyncError,
    },
    /// The wallet changed while the pass was running; its result was dropped.
    Discarded {
        trigger: SyncTrigger,
    },
}

/// Reads a full snapshot for `wallet`.
///
/// Without a wallet this never fails: quantitative fields are zero and the
/// global fields are read best-effort, falling back to `previous`.
pub async fn synchronize<R: ChainReader + ?Sized>(
    reader: &R,
    wallet: Option<&str>,
    previous: &Snapshot,
) -> Result<Snapshot, SyncError> {
    let Some(address) = wallet else {
        return Ok(disconnected_snapshot(reader, previous).await);
    };

    let (
        phase,
        contract_total_deposited,
        user_deposited,
        user_token_balance,
        wallet_balance,
        airdrop_completed,
        user_claimed,
        countdown_seconds,
    ) = futures::try_join!(
        read_phase(reader),
        read_amount("total deposited", reader.total_deposited()),
        read_amount("user deposit", reader.user_deposited(address)),
        read_amount("user token balance", reader.user_token_balance(address)),
        read_native_balance(reader, address),
        read("airdrop completed flag", reader.airdrop_completed()),
        read("claimed flag", reader.claimed(address)),
        read("countdown", reader.countdown()),
    )?;

    Ok(Snapshot {
        phase,
        wallet_balance,
        contract_total_deposited,
        user_deposited,
        user_token_balance,
        airdrop_completed,
        user_claimed,
        countdown_seconds,
    })
}

async fn read<T>(
    field: &'static str,
    request: impl Future<Output = eyre::Result<T>>,
) -> Result<T, SyncError> {
    request.await.map_err(|err| SyncError::read(field, err))
}

async fn read_amount(
    field: &'static str,
    request: impl Future<Output = eyre::Result<String>>,
) -> Result<Amount, SyncError> {
    let raw = read(field, request).await?;
    raw.parse()
        .map_err(|source| SyncError::Parse { field, source })
}

async fn read_phase<R: ChainReader + ?Sized>(reader: &R) -> Result<PresalePhase, SyncError> {
    let raw = read("phase", reader.phase()).await?;
    PresalePhase::from_raw(raw).ok_or(SyncError::UnknownPhase(raw))
}

async fn read_native_balance<R: ChainReader + ?Sized>(
    reader: &R,
    address: &str,
) -> Result<Amount, SyncError> {
    let field = "wallet balance";
    let raw = read(field, reader.native_balance(address)).await?;
    Amount::from_hex(&raw).map_err(|source| SyncError::Parse { field, source })
}

async fn disconnected_snapshot<R: ChainReader + ?Sized>(
    reader: &R,
    previous: &Snapshot,
) -> Snapshot {
    let (phase, countdown, airdrop_completed) = futures::join!(
        read_phase(reader),
        read("countdown", reader.countdown()),
        read("airdrop completed flag", reader.airdrop_completed()),
    );
    let phase = phase.unwrap_or_else(|err| {
        debug!(%err, "keeping last known phase");
        previous.phase
    });
    let countdown = countdown.unwrap_or_else(|err| {
        debug!(%err, "keeping last known countdown");
        previous.countdown_seconds
    });
    let airdrop_completed = airdrop_completed.unwrap_or(previous.airdrop_completed);
    Snapshot::disconnected(phase, countdown, airdrop_completed)
}

enum SyncCommand {
    Refresh(SyncTrigger),
    Shutdown,
}

struct PassResult {
    trigger: SyncTrigger,
    address: Option<String>,
    status_version: u64,
    result: Result<Snapshot, SyncError>,
}

/// Cheap, cloneable access to the synchronizer.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<SyncCommand>,
    snapshots: watch::Receiver<Snapshot>,
    wallet: Arc<watch::Sender<Option<WalletSession>>>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncHandle {
    /// Current snapshot. Always a value produced by one complete pass.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn wallet(&self) -> Option<WalletSession> {
        self.wallet.borrow().clone()
    }

    /// Asks for a pass. Folded into the queued pass if one is running.
    pub fn refresh(&self, trigger: SyncTrigger) {
        if self.commands.send(SyncCommand::Refresh(trigger)).is_err() {
            debug!(?trigger, "synchronizer stopped; refresh ignored");
        }
    }

    /// Replaces the live wallet session. Returns `true` and schedules a
    /// wallet-change pass when the identity actually changed.
    pub fn set_wallet(&self, session: Option<WalletSession>) -> bool {
        let changed = self.wallet.send_if_modified(|current| {
            if *current == session {
                return false;
            }
            *current = session;
            true
        });
        if changed {
            match self.wallet.borrow().as_ref() {
                Some(session) => {
                    info!(label = %session.label, address = %session.address, "wallet changed")
                }
                None => info!("wallet disconnected"),
            }
            self.refresh(SyncTrigger::WalletChanged);
        }
        changed
    }
}

/// Owner of the synchronizer task. Dropping it stops the poll timer.
pub struct SyncEngine {
    handle: SyncHandle,
    task: Option<JoinHandle<()>>,
}

impl SyncEngine {
    pub fn spawn<R: ChainReader>(
        reader: Arc<R>,
        status: StatusReporter,
        poll_interval: Duration,
        wallet: Option<WalletSession>,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(Snapshot::default());
        let (wallet_tx, wallet_rx) = watch::channel(wallet);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let worker = Worker {
            reader,
            status,
            snapshot_tx,
            wallet: wallet_rx,
            events: events.clone(),
        };
        let task = tokio::spawn(worker.run(poll_interval, command_rx));

        Self {
            handle: SyncHandle {
                commands,
                snapshots,
                wallet: Arc::new(wallet_tx),
                events,
            },
            task: Some(task),
        }
    }

    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }

    /// Stops the timer and waits for the worker to exit. A pass still in
    /// flight is left to finish in the background and its result dropped.
    pub async fn shutdown(mut self) {
        let _ = self.handle.commands.send(SyncCommand::Shutdown);
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            warn!(%err, "synchronizer task ended abnormally");
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.handle.commands.send(SyncCommand::Shutdown);
        }
    }
}

struct Worker<R> {
    reader: Arc<R>,
    status: StatusReporter,
    snapshot_tx: watch::Sender<Snapshot>,
    wallet: watch::Receiver<Option<WalletSession>>,
    events: broadcast::Sender<SyncEvent>,
}

impl<R: ChainReader> Worker<R> {
    async fn run(
        self,
        poll_interval: Duration,
        mut commands: mpsc::UnboundedReceiver<SyncCommand>,
    ) {
        info!(?poll_interval, "synchronizer started");
        let mut ticker = time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately and is covered by the startup pass
        ticker.tick().await;

        let mut in_flight = Some(self.start_pass(SyncTrigger::Startup));
        let mut queued: Option<SyncTrigger> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.request(SyncTrigger::Periodic, &mut in_flight, &mut queued);
                }
                command = commands.recv() => {
                    match command {
                        Some(SyncCommand::Refresh(trigger)) => {
                            self.request(trigger, &mut in_flight, &mut queued);
                        }
                        Some(SyncCommand::Shutdown) | None => break,
                    }
                }
                pass = next_pass(&mut in_flight) => {
                    self.finish_pass(pass);
                    in_flight = queued.take().map(|trigger| self.start_pass(trigger));
                }
            }
        }

        if let Some(pass) = in_flight.take() {
            // let the read finish on its own; nobody consumes the result
            tokio::spawn(pass);
        }
        info!("synchronizer stopped");
    }

    fn request(
        &self,
        trigger: SyncTrigger,
        in_flight: &mut Option<BoxFuture<'static, PassResult>>,
        queued: &mut Option<SyncTrigger>,
    ) {
        if in_flight.is_none() {
            *in_flight = Some(self.start_pass(trigger));
            return;
        }
        let merged = match queued.take() {
            Some(pending) => pending.merge(trigger),
            None => trigger,
        };
        debug!(?trigger, queued = ?merged, "pass in flight; queueing");
        *queued = Some(merged);
    }

    fn start_pass(&self, trigger: SyncTrigger) -> BoxFuture<'static, PassResult> {
        let reader = Arc::clone(&self.reader);
        let address = self.current_address();
        let previous = self.snapshot_tx.borrow().clone();
        let status_version = self.status.version();
        debug!(?trigger, ?address, "starting synchronization pass");
        Box::pin(async move {
            let result = synchronize(reader.as_ref(), address.as_deref(), &previous).await;
            PassResult {
                trigger,
                address,
                status_version,
                result,
            }
        })
    }

    fn finish_pass(&self, pass: PassResult) {
        let PassResult {
            trigger,
            address,
            status_version,
            result,
        } = pass;

        if address != self.current_address() {
            debug!(?trigger, "wallet changed during pass; dropping result");
            let _ = self.events.send(SyncEvent::Discarded { trigger });
            return;
        }

        match result {
            Ok(snapshot) => {
                if trigger.clears_status() {
                    self.status.clear_if_unchanged(status_version);
                }
                self.snapshot_tx.send_replace(snapshot);
                debug!(?trigger, "snapshot replaced");
                let _ = self.events.send(SyncEvent::Synced { trigger });
            }
            Err(error) => {
                warn!(%error, ?trigger, "synchronization failed; keeping previous snapshot");
                let _ = self.events.send(SyncEvent::Failed { trigger, error });
            }
        }
    }

    fn current_address(&self) -> Option<String> {
        self.wallet
            .borrow()
            .as_ref()
            .map(|session| session.address.clone())
    }
}

async fn next_pass(in_flight: &mut Option<BoxFuture<'static, PassResult>>) -> PassResult {
    match in_flight.as_mut() {
        Some(pass) => pass.await,
        None => std::future::pending().await,
    }
}
