//! Client-side synchronization for a phased token presale.

pub mod amount;
pub mod chain;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod phase;
pub mod presale;
pub mod simulated;
pub mod snapshot;
pub mod status;
pub mod sync;
pub mod wallet_session;

pub use amount::Amount;
pub use chain::{
    ChainReader,
    TransactionExecutor,
    TxReceipt,
};
pub use config::SyncConfig;
pub use dispatcher::{
    Action,
    ActionDispatcher,
    ActionKind,
};
pub use error::{
    SyncError,
    ValidationError,
};
pub use phase::PresalePhase;
pub use presale::PresaleClient;
pub use snapshot::Snapshot;
pub use status::{
    ActionOutcome,
    StatusReporter,
};
pub use sync::{
    SyncEngine,
    SyncEvent,
    SyncHandle,
    SyncTrigger,
};
pub use wallet_session::{
    KeyValueStore,
    MemoryStore,
    WalletConnector,
    WalletSession,
    WalletSessionStore,
};
