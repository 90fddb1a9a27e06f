//! Per-connection session
//!
//! A [`FedbSession`] owns the session variables and the lazy transaction of
//! one client connection. Statement execution itself is not part of this
//! crate: `execute` validates and logs the statement and reports no result
//! sets.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use fedb_common::prelude::*;
use fedb_common::utils::query_for_log;
use fedb_protocol::{QueryCtx, QueryResult};
use fedb_storage::Storage;
use fedb_txn::{TxnFuture, TxnState};

use crate::vars::SessionVars;

pub struct FedbSession {
    vars: RwLock<SessionVars>,
    store: Arc<dyn Storage>,
    txn: Mutex<TxnState>,
}

impl FedbSession {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self {
            vars: RwLock::new(SessionVars::new()),
            store,
            txn: Mutex::new(TxnState::new()),
        }
    }

    pub fn set_connection_id(&self, id: u64) -> &Self {
        self.vars.write().connection_id = id;
        self
    }

    pub fn set_client_capability(&self, capability: u32) -> &Self {
        self.vars.write().client_capability = capability;
        self
    }

    pub fn set_collation(&self, id: u8) -> Result<()> {
        self.vars.write().set_collation(id)
    }

    pub fn connection_id(&self) -> u64 {
        self.vars.read().connection_id
    }

    /// Copy of the current session variables.
    pub fn vars(&self) -> SessionVars {
        self.vars.read().clone()
    }

    /// Request a start timestamp for the next transaction without waiting
    /// for it. Does nothing if a transaction is already pending or active.
    pub async fn prepare_txn(&self) -> Result<()> {
        let mut txn = self.txn.lock().await;
        if txn.valid_or_pending() {
            return Ok(());
        }
        txn.change_invalid_to_pending(TxnFuture::from_storage(self.store.clone()))?;
        trace!(conn_id = self.connection_id(), "transaction pending");
        Ok(())
    }

    /// Materialize the prepared transaction and return its start timestamp.
    pub async fn activate_txn(&self) -> Result<u64> {
        let mut txn = self.txn.lock().await;
        let start_ts = txn.activate().await?.start_ts();
        debug!(conn_id = self.connection_id(), start_ts, "transaction active");
        Ok(start_ts)
    }

    pub async fn txn_state(&self) -> &'static str {
        self.txn.lock().await.name()
    }
}

#[async_trait]
impl QueryCtx for FedbSession {
    async fn execute(&self, sql: &str, cancel: CancellationToken) -> Result<Vec<QueryResult>> {
        let conn_id = self.connection_id();
        info!(conn_id, sql = %query_for_log(sql), "execute");

        if cancel.is_cancelled() {
            return Err(Error::Cancelled("Query execution was interrupted".to_string()));
        }

        let stmt = sql.trim().trim_end_matches(';').trim_end();
        if stmt.is_empty() {
            return Err(StatementError::empty_query().into());
        }
        Ok(Vec::new())
    }

    fn set_current_db(&self, db: &str) {
        self.vars.write().current_db = db.to_string();
    }

    fn current_db(&self) -> String {
        self.vars.read().current_db.clone()
    }

    fn close(&self) {
        // A statement still holding the lock has been cancelled; its
        // transaction goes away with the session.
        if let Ok(mut txn) = self.txn.try_lock() {
            txn.reset();
        }
        debug!(conn_id = self.connection_id(), "session closed");
    }
}

impl std::fmt::Debug for FedbSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FedbSession")
            .field("vars", &*self.vars.read())
            .finish()
    }
}
