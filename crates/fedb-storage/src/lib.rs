//! # fedb Storage
//!
//! Storage contracts for fedb providing:
//! - The `Driver` / `Storage` / `Transaction` capability traits
//! - A strictly monotonic timestamp oracle
//! - A registry resolving storage backends from `scheme://path` URIs
//! - The `local` backend

pub mod local;
pub mod oracle;
pub mod registry;

// Re-export key types for convenience
pub use local::{LocalDriver, LocalStore, LocalTxn};
pub use oracle::{
    compose_ts, extract_logical, extract_physical, LocalOracle, Oracle, PhysicalClock,
    SystemClock, TimestampFuture,
};
pub use registry::{RetryPolicy, StorageRegistry, MAX_OPEN_RETRIES};

use std::sync::Arc;

use fedb_common::prelude::*;

/// A storage backend factory, selected by URI scheme.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a storage backend from a full `scheme://path` URI.
    async fn open(&self, uri: &str) -> Result<Arc<dyn Storage>>;
}

/// An opened storage backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Timestamp oracle used to order transactions against this store.
    fn oracle(&self) -> Arc<dyn Oracle>;

    /// Materialize a transaction whose snapshot starts at `start_ts`.
    async fn begin_with_start_ts(&self, start_ts: u64) -> Result<Box<dyn Transaction>>;

    /// Release the backend and its oracle.
    async fn close(&self) -> Result<()>;
}

/// A transaction handle produced by a `Storage`.
pub trait Transaction: Send + Sync {
    /// Start timestamp assigned by the oracle
    fn start_ts(&self) -> u64;

    /// Whether the transaction can still be used
    fn valid(&self) -> bool;
}
