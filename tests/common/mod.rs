#![allow(dead_code)]

use presale_sync::{
    Amount,
    MemoryStore,
    PresaleClient,
    SyncConfig,
    SyncEvent,
    SyncTrigger,
    simulated::SimulatedPresale,
};
use std::{
    future::Future,
    sync::Arc,
    time::Duration,
};
use tokio::{
    runtime::Builder,
    sync::broadcast,
};

pub const ALICE: &str = "0x00000000000000000000000000000000000a11ce";
pub const BOB: &str = "0x0000000000000000000000000000000000000b0b";
pub const PROVIDER: &str = "ProviderX";
pub const POLL: Duration = Duration::from_secs(5);

pub type Client = PresaleClient<SimulatedPresale, SimulatedPresale, MemoryStore>;
pub type Events = broadcast::Receiver<SyncEvent>;

pub struct TestContext {
    pub chain: Arc<SimulatedPresale>,
    pub store: MemoryStore,
    pub config: SyncConfig,
}

impl TestContext {
    pub fn new() -> Self {
        let chain = Arc::new(SimulatedPresale::new());
        chain.register_provider(PROVIDER, ALICE);
        chain.fund(ALICE, Amount::from_whole(100));
        chain.set_countdown(600);
        let config = SyncConfig {
            poll_interval: POLL,
            ..SyncConfig::default()
        };
        Self {
            chain,
            store: MemoryStore::new(),
            config,
        }
    }

    /// Starts a client and subscribes before its worker gets to run.
    pub async fn start(&self) -> (Client, Events) {
        let client = PresaleClient::start(
            self.config.clone(),
            Arc::clone(&self.chain),
            Arc::clone(&self.chain),
            Arc::clone(&self.chain),
            self.store.clone(),
        )
        .await;
        let events = client.subscribe();
        (client, events)
    }

    /// Starts, waits for the startup pass, then connects [`PROVIDER`].
    pub async fn start_connected(&self) -> (Client, Events) {
        let (client, mut events) = self.start().await;
        wait_for_sync(&mut events, SyncTrigger::Startup).await;
        client.connect(PROVIDER).await.unwrap().unwrap();
        wait_for_sync(&mut events, SyncTrigger::WalletChanged).await;
        (client, events)
    }
}

pub async fn next_event(events: &mut Events) -> SyncEvent {
    events.recv().await.expect("synchronizer event")
}

/// Skips events until a successful pass with `trigger` is reported.
pub async fn wait_for_sync(events: &mut Events, trigger: SyncTrigger) {
    loop {
        if let SyncEvent::Synced { trigger: seen } = next_event(events).await
            && seen == trigger
        {
            return;
        }
    }
}

pub async fn wait_for_failure(events: &mut Events, trigger: SyncTrigger) {
    loop {
        if let SyncEvent::Failed { trigger: seen, .. } = next_event(events).await
            && seen == trigger
        {
            return;
        }
    }
}

/// Runs `test` on a fresh paused-clock runtime, for use inside proptest cases.
pub fn block_on_paused<F: Future>(test: F) -> F::Output {
    let rt = Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap();
    rt.block_on(test)
}
