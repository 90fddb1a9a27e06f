//! Contracts between the protocol layer and the SQL layer
//!
//! The protocol layer never interprets statements. After a successful
//! handshake it asks a [`SessionDriver`] for a [`QueryCtx`] and hands it every
//! query the client sends.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use fedb_common::prelude::*;

/// Outcome of one executed statement, reported in an OK packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub warnings: u16,
}

/// Per-connection session.
#[async_trait]
pub trait QueryCtx: Send + Sync {
    /// Execute `sql`. Long-running work should watch `cancel`, which fires
    /// when the connection is closed underneath the statement.
    async fn execute(&self, sql: &str, cancel: CancellationToken) -> Result<Vec<QueryResult>>;

    /// Database selected by COM_INIT_DB.
    fn set_current_db(&self, db: &str);

    fn current_db(&self) -> String;

    /// Release session resources. Called once when the connection closes.
    fn close(&self);
}

/// Opens sessions for newly authenticated connections.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    async fn open_ctx(
        &self,
        conn_id: u64,
        capability: u32,
        collation: u8,
        db_name: &str,
    ) -> Result<Arc<dyn QueryCtx>>;
}
