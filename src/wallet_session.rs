//! Wallet session persistence and silent reconnect.

use crate::error::PersistenceError;
use color_eyre::eyre;
use serde::{
    Deserialize,
    Serialize,
};
use session_store::SessionFileStore;
use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc,
        Mutex,
        PoisonError,
    },
};
use tracing::{
    debug,
    info,
    warn,
};

/// The live connection. Only held while a wallet is connected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub label: String,
    pub address: String,
}

impl WalletSession {
    pub fn new(label: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            address: address.into(),
        }
    }

    /// `0x1234...abcd` form used in headers.
    pub fn short_address(&self) -> String {
        let address = &self.address;
        if address.len() <= 10 || !address.is_ascii() {
            return address.clone();
        }
        format!("{}...{}", &address[..6], &address[address.len() - 4..])
    }
}

/// Wallet connection subsystem (provider selection, signing, transport).
pub trait WalletConnector: Send + Sync + 'static {
    /// Connects to the provider named `label`. When `silent` is set the
    /// provider must not prompt the user; `Ok(None)` means it declined.
    fn connect(
        &self,
        label: &str,
        silent: bool,
    ) -> impl Future<Output = eyre::Result<Option<WalletSession>>> + Send;

    fn disconnect(&self, label: &str) -> impl Future<Output = eyre::Result<()>> + Send;

    /// Labels of every provider currently connected, most recent first.
    fn connected_labels(&self) -> Vec<String>;
}

/// Durable string store that survives process restarts.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, PersistenceError>> + Send;

    fn set(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

impl KeyValueStore for SessionFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let store = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.get(&key))
            .await
            .map_err(|e| PersistenceError::Storage(e.to_string()))?
            .map_err(|e| PersistenceError::Storage(format!("{e:#}")))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        let store = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.set(&key, value))
            .await
            .map_err(|e| PersistenceError::Storage(e.to_string()))?
            .map_err(|e| PersistenceError::Storage(format!("{e:#}")))
    }
}

/// In-process store. Clones share the same entries, which lets two clients
/// stand in for two runs of the same program.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// A silent reconnect that was attempted at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectAttempt {
    pub label: String,
    /// `None` when the provider declined or was unavailable.
    pub session: Option<WalletSession>,
}

/// Remembers which providers were connected so the next run can reconnect
/// without prompting. Storage failures degrade to "nothing remembered".
pub struct WalletSessionStore<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> WalletSessionStore<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Remembered labels, most recent first.
    pub async fn remembered_labels(&self) -> Vec<String> {
        match self.load_labels().await {
            Ok(labels) => labels,
            Err(err) => {
                debug!(%err, "no usable session record; assuming no prior session");
                Vec::new()
            }
        }
    }

    /// Moves `label` to the front of the remembered list.
    pub async fn record_connection(&self, label: &str) {
        let mut labels = self.remembered_labels().await;
        labels.retain(|existing| existing != label);
        labels.insert(0, label.to_string());
        self.save_labels(&labels).await;
    }

    /// Replaces the remembered list with the currently connected labels. An
    /// empty set is ignored so that disconnecting keeps the history.
    pub async fn record_connected_labels(&self, labels: &[String]) {
        if labels.is_empty() {
            return;
        }
        self.save_labels(labels).await;
    }

    pub async fn attempt_silent_reconnect<C: WalletConnector>(
        &self,
        connector: &C,
    ) -> Option<ReconnectAttempt> {
        let label = self.remembered_labels().await.into_iter().next()?;
        info!(%label, "attempting silent wallet reconnect");
        let session = match connector.connect(&label, true).await {
            Ok(Some(session)) => {
                info!(%label, address = %session.address, "wallet reconnected");
                Some(session)
            }
            Ok(None) => {
                info!(%label, "provider declined silent reconnect");
                None
            }
            Err(err) => {
                info!(%label, %err, "silent reconnect unavailable");
                None
            }
        };
        Some(ReconnectAttempt { label, session })
    }

    async fn load_labels(&self) -> Result<Vec<String>, PersistenceError> {
        match self.store.get(&self.key).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    async fn save_labels(&self, labels: &[String]) {
        let encoded = match serde_json::to_string(labels) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(%err, "failed to encode session record");
                return;
            }
        };
        if let Err(err) = self.store.set(&self.key, encoded).await {
            warn!(%err, "failed to persist session record");
        }
    }
}
