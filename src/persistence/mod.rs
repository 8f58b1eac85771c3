//! Save/load of game state against a key-value store
//!
//! Features:
//! - One JSON value per key (`score`, `coins`, `helpers`, `slimes`, `progress`)
//! - Per-key corruption fallback
//! - Trailing write throttle with an unthrottled flush for shutdown
//! - Memory, file (native) and LocalStorage (wasm32) backends

pub mod gateway;
pub mod snapshot;
pub mod store;

pub use gateway::PersistenceGateway;
pub use snapshot::{CoinRecord, HelperRecord, ProgressRecord, SlimeRecord, Snapshot};
#[cfg(not(target_arch = "wasm32"))]
pub use store::FileStore;
#[cfg(target_arch = "wasm32")]
pub use store::LocalStorageStore;
pub use store::{MemoryStore, PersistenceStore};

use thiserror::Error;

/// Backend failure while reading or writing a key
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
    #[error("storage backend rejected the request: {0}")]
    Backend(String),
}

/// Failure at the persistence seam
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("corrupt value for `{key}`: {source}")]
    Decode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode `{key}`: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Storage keys, one per snapshot section
pub mod keys {
    pub const SCORE: &str = "score";
    pub const COINS: &str = "coins";
    pub const HELPERS: &str = "helpers";
    pub const SLIMES: &str = "slimes";
    pub const PROGRESS: &str = "progress";

    pub const ALL: [&str; 5] = [SCORE, COINS, HELPERS, SLIMES, PROGRESS];
}
