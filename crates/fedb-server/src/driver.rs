//! Session driver backed by a storage handle

use std::sync::Arc;

use fedb_common::prelude::*;
use fedb_protocol::{QueryCtx, SessionDriver};
use fedb_storage::Storage;

use crate::session::FedbSession;

/// Opens a [`FedbSession`] for every connection that completes the
/// handshake. All sessions share one storage handle.
pub struct FedbDriver {
    store: Arc<dyn Storage>,
}

impl FedbDriver {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn Storage> {
        &self.store
    }

    /// Build a session without erasing its type.
    pub fn open_session(
        &self,
        conn_id: u64,
        capability: u32,
        collation: u8,
        db_name: &str,
    ) -> Result<Arc<FedbSession>> {
        let session = FedbSession::new(self.store.clone());
        session
            .set_connection_id(conn_id)
            .set_client_capability(capability);
        session.set_collation(collation)?;
        if !db_name.is_empty() {
            session.set_current_db(db_name);
        }
        Ok(Arc::new(session))
    }
}

#[async_trait]
impl SessionDriver for FedbDriver {
    async fn open_ctx(
        &self,
        conn_id: u64,
        capability: u32,
        collation: u8,
        db_name: &str,
    ) -> Result<Arc<dyn QueryCtx>> {
        let session = self.open_session(conn_id, capability, collation, db_name)?;
        debug!(conn_id, collation, db = db_name, "session opened");
        Ok(session)
    }
}

impl std::fmt::Debug for FedbDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FedbDriver").finish_non_exhaustive()
    }
}
