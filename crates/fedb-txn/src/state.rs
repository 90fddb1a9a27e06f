//! Transaction state machine
//!
//! `Invalid -> Pending(future) -> Valid(txn) -> Invalid`

use std::fmt;
use std::sync::Arc;

use fedb_common::prelude::*;
use fedb_storage::{Storage, TimestampFuture, Transaction};

/// Promise of a transaction: a start timestamp still being fetched, plus the
/// store that will open the transaction once the timestamp arrives.
pub struct TxnFuture {
    future: TimestampFuture,
    store: Arc<dyn Storage>,
}

impl TxnFuture {
    pub fn new(future: TimestampFuture, store: Arc<dyn Storage>) -> Self {
        Self { future, store }
    }

    /// Request a start timestamp from `store`'s oracle without waiting for it.
    pub fn from_storage(store: Arc<dyn Storage>) -> Self {
        let future = store.oracle().get_timestamp_async();
        Self::new(future, store)
    }

    /// Wait for the start timestamp and begin the transaction.
    pub async fn wait(self) -> Result<Box<dyn Transaction>> {
        let start_ts = self.future.wait().await?;
        self.store.begin_with_start_ts(start_ts).await
    }
}

impl fmt::Debug for TxnFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxnFuture")
            .field("future", &self.future)
            .finish_non_exhaustive()
    }
}

/// Lazy transaction held by a session.
#[derive(Default)]
pub enum TxnState {
    #[default]
    Invalid,
    Pending(TxnFuture),
    Valid(Box<dyn Transaction>),
}

impl TxnState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &'static str {
        match self {
            TxnState::Invalid => "invalid",
            TxnState::Pending(_) => "pending",
            TxnState::Valid(_) => "valid",
        }
    }

    /// A start timestamp has been requested but not yet resolved.
    pub fn pending(&self) -> bool {
        matches!(self, TxnState::Pending(_))
    }

    /// A transaction is materialized and still usable.
    pub fn valid(&self) -> bool {
        matches!(self, TxnState::Valid(txn) if txn.valid())
    }

    pub fn valid_or_pending(&self) -> bool {
        self.pending() || self.valid()
    }

    /// The materialized transaction, if any.
    pub fn transaction(&self) -> Option<&dyn Transaction> {
        match self {
            TxnState::Valid(txn) => Some(txn.as_ref()),
            _ => None,
        }
    }

    /// Park a transaction future. Does not block.
    pub fn change_invalid_to_pending(&mut self, future: TxnFuture) -> Result<()> {
        if self.valid_or_pending() {
            return Err(TransactionError::NotInvalid(self.name()).into());
        }
        *self = TxnState::Pending(future);
        Ok(())
    }

    /// Resolve a pending transaction, or return the valid one.
    ///
    /// Fails if there is nothing to resolve. If resolving fails the state
    /// drops back to `Invalid`.
    pub async fn activate(&mut self) -> Result<&dyn Transaction> {
        *self = match std::mem::take(self) {
            TxnState::Pending(future) => {
                let txn = future.wait().await?;
                debug!(start_ts = txn.start_ts(), "transaction activated");
                TxnState::Valid(txn)
            }
            TxnState::Valid(txn) if txn.valid() => TxnState::Valid(txn),
            TxnState::Valid(_) => return Err(TransactionError::Invalidated.into()),
            TxnState::Invalid => return Err(TransactionError::NotPending("invalid").into()),
        };
        self.transaction()
            .ok_or_else(|| Error::internal("transaction vanished during activation"))
    }

    /// Drop whatever is held and return to `Invalid`.
    pub fn reset(&mut self) {
        if !matches!(self, TxnState::Invalid) {
            debug!(state = self.name(), "transaction state reset");
        }
        *self = TxnState::Invalid;
    }
}

impl fmt::Debug for TxnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxnState::Valid(txn) => f
                .debug_struct("Valid")
                .field("start_ts", &txn.start_ts())
                .field("valid", &txn.valid())
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}
