//! Entry point for a presentation layer.
//!
//! [`PresaleClient`] owns the synchronizer and dispatcher and keeps the
//! remembered wallet list in step with connects and disconnects.

use crate::{
    chain::{
        ChainReader,
        TransactionExecutor,
    },
    config::SyncConfig,
    dispatcher::{
        self,
        Action,
        ActionDispatcher,
        ActionKind,
    },
    error::ValidationError,
    snapshot::Snapshot,
    status::{
        ActionOutcome,
        StatusReporter,
    },
    sync::{
        SyncEngine,
        SyncEvent,
        SyncHandle,
    },
    wallet_session::{
        KeyValueStore,
        ReconnectAttempt,
        WalletConnector,
        WalletSession,
        WalletSessionStore,
    },
};
use color_eyre::eyre;
use std::sync::Arc;
use tokio::sync::{
    broadcast,
    watch,
};
use tracing::{
    info,
    warn,
};

pub struct PresaleClient<E, W, S> {
    config: SyncConfig,
    engine: SyncEngine,
    sync: SyncHandle,
    dispatcher: ActionDispatcher<E>,
    status: StatusReporter,
    connector: Arc<W>,
    sessions: WalletSessionStore<S>,
    reconnect: Option<ReconnectAttempt>,
}

impl<E, W, S> PresaleClient<E, W, S>
where
    E: TransactionExecutor,
    W: WalletConnector,
    S: KeyValueStore,
{
    /// Tries a silent reconnect to the most recently used provider, then
    /// starts synchronizing with whatever wallet that produced.
    pub async fn start<R: ChainReader>(
        config: SyncConfig,
        reader: Arc<R>,
        executor: Arc<E>,
        connector: Arc<W>,
        store: S,
    ) -> Self {
        let sessions = WalletSessionStore::new(store, config.session_key.clone());
        let reconnect = sessions.attempt_silent_reconnect(connector.as_ref()).await;
        let wallet = reconnect
            .as_ref()
            .and_then(|attempt| attempt.session.clone());
        if wallet.is_some() {
            sessions
                .record_connected_labels(&connector.connected_labels())
                .await;
        }

        let status = StatusReporter::new();
        let engine = SyncEngine::spawn(reader, status.clone(), config.poll_interval, wallet);
        let sync = engine.handle();
        let dispatcher =
            ActionDispatcher::new(executor, sync.clone(), status.clone(), config.min_deposit);

        Self {
            config,
            engine,
            sync,
            dispatcher,
            status,
            connector,
            sessions,
            reconnect,
        }
    }

    /// What the startup reconnect did, if anything was remembered.
    pub fn reconnect_attempt(&self) -> Option<&ReconnectAttempt> {
        self.reconnect.as_ref()
    }

    /// Interactive connect. `Ok(None)` when the user dismissed the prompt.
    pub async fn connect(&self, label: &str) -> eyre::Result<Option<WalletSession>> {
        let Some(session) = self.connector.connect(label, false).await? else {
            info!(%label, "wallet connection dismissed");
            return Ok(None);
        };
        self.wallet_changed(Some(session.clone())).await;
        Ok(Some(session))
    }

    pub async fn disconnect(&self) {
        let Some(session) = self.sync.wallet() else {
            return;
        };
        if let Err(err) = self.connector.disconnect(&session.label).await {
            warn!(label = %session.label, %err, "provider disconnect failed");
        }
        self.wallet_changed(None).await;
    }

    /// Applies a wallet change reported by the provider, e.g. an account
    /// switch.
    pub async fn wallet_changed(&self, session: Option<WalletSession>) {
        let connected = session.is_some();
        if !self.sync.set_wallet(session) {
            return;
        }
        let labels = self.connector.connected_labels();
        if connected && labels.is_empty() {
            if let Some(session) = self.sync.wallet() {
                self.sessions.record_connection(&session.label).await;
            }
            return;
        }
        self.sessions.record_connected_labels(&labels).await;
    }

    pub async fn deposit(&self, raw_amount: &str) -> Result<ActionOutcome, ValidationError> {
        self.dispatcher.deposit_text(raw_amount).await
    }

    pub async fn withdraw_all(&self) -> Result<ActionOutcome, ValidationError> {
        self.dispatcher.dispatch(Action::WithdrawAll).await
    }

    pub async fn seed_liquidity(&self) -> Result<ActionOutcome, ValidationError> {
        self.dispatcher.dispatch(Action::SeedLiquidity).await
    }

    pub async fn claim_tokens(&self) -> Result<ActionOutcome, ValidationError> {
        self.dispatcher.dispatch(Action::ClaimTokens).await
    }

    pub async fn airdrop_all(&self) -> Result<ActionOutcome, ValidationError> {
        self.dispatcher.dispatch(Action::AirdropAll).await
    }

    pub fn refresh(&self) -> Result<(), ValidationError> {
        self.dispatcher.refresh()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.sync.snapshot()
    }

    pub fn status(&self) -> Option<ActionOutcome> {
        self.status.current()
    }

    pub fn wallet(&self) -> Option<WalletSession> {
        self.sync.wallet()
    }

    pub fn phase_label(&self) -> &'static str {
        self.sync.snapshot().phase.label()
    }

    /// External marketplace link, shown during the public sale.
    pub fn marketplace_url(&self) -> Option<&'static str> {
        self.sync.snapshot().phase.marketplace_url()
    }

    pub fn available_actions(&self) -> Vec<ActionKind> {
        dispatcher::available_actions(&self.sync.snapshot())
    }

    /// Wallet balance rounded to the configured display precision.
    pub fn wallet_balance_display(&self) -> String {
        self.sync
            .snapshot()
            .wallet_balance_display(self.config.display_decimals)
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<Snapshot> {
        self.sync.watch_snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sync.subscribe()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub async fn shutdown(self) {
        self.engine.shutdown().await;
    }
}
